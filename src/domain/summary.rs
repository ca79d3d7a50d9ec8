//! Headline figures for a single symbol's bar series.

use crate::domain::ohlcv::OhlcvBar;

#[derive(Debug, Clone, PartialEq)]
pub struct StockSummary {
    pub current_price: f64,
    pub previous_close: f64,
    pub change: f64,
    pub change_pct: f64,
    pub period_high: f64,
    pub period_low: f64,
}

impl StockSummary {
    /// `None` for an empty series. With a single bar the previous close is the
    /// current price and the change is zero.
    pub fn from_bars(bars: &[OhlcvBar]) -> Option<Self> {
        let latest = bars.last()?;
        let previous_close = if bars.len() > 1 {
            bars[bars.len() - 2].close
        } else {
            latest.close
        };
        let change = latest.close - previous_close;
        let change_pct = if previous_close != 0.0 {
            change / previous_close * 100.0
        } else {
            0.0
        };

        let period_high = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let period_low = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);

        Some(Self {
            current_price: latest.close,
            previous_close,
            change,
            change_pct,
            period_high,
            period_low,
        })
    }

    /// (label, value) pairs rounded to two decimals, in display order.
    pub fn rows(&self) -> Vec<(&'static str, f64)> {
        let round2 = |v: f64| (v * 100.0).round() / 100.0;
        vec![
            ("Current Price", round2(self.current_price)),
            ("Previous Close", round2(self.previous_close)),
            ("Change", round2(self.change)),
            ("Change %", round2(self.change_pct)),
            ("Period High", round2(self.period_high)),
            ("Period Low", round2(self.period_low)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn make_bar(i: i64, high: f64, low: f64, close: f64) -> OhlcvBar {
        OhlcvBar {
            symbol: "TEST".into(),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
                + Duration::days(i),
            open: close,
            high,
            low,
            close,
            volume: 1.0,
        }
    }

    #[test]
    fn summary_of_empty_is_none() {
        assert!(StockSummary::from_bars(&[]).is_none());
    }

    #[test]
    fn summary_change_and_extremes() {
        let bars = vec![
            make_bar(0, 105.0, 95.0, 100.0),
            make_bar(1, 120.0, 99.0, 110.0),
            make_bar(2, 115.0, 90.0, 99.0),
        ];
        let s = StockSummary::from_bars(&bars).unwrap();
        assert_eq!(s.current_price, 99.0);
        assert_eq!(s.previous_close, 110.0);
        assert!((s.change - -11.0).abs() < 1e-12);
        assert!((s.change_pct - -10.0).abs() < 1e-12);
        assert_eq!(s.period_high, 120.0);
        assert_eq!(s.period_low, 90.0);
    }

    #[test]
    fn single_bar_has_zero_change() {
        let s = StockSummary::from_bars(&[make_bar(0, 11.0, 9.0, 10.0)]).unwrap();
        assert_eq!(s.previous_close, 10.0);
        assert_eq!(s.change, 0.0);
        assert_eq!(s.change_pct, 0.0);
    }

    #[test]
    fn rows_are_rounded() {
        let bars = vec![make_bar(0, 4.0, 2.0, 3.0), make_bar(1, 4.0, 2.0, 3.3333)];
        let rows = StockSummary::from_bars(&bars).unwrap().rows();
        assert_eq!(rows[0], ("Current Price", 3.33));
        assert_eq!(rows.len(), 6);
    }
}
