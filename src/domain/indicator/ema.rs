//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_ema(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries::empty(IndicatorType::Ema(period));
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let values = ema_over(&closes, period)
        .into_iter()
        .zip(bars)
        .map(|(ema, bar)| match ema {
            Some(v) => IndicatorPoint::simple(bar.timestamp, true, v),
            None => IndicatorPoint::simple(bar.timestamp, false, 0.0),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values,
    }
}

/// EMA over a plain slice, `None` for the warm-up prefix.
///
/// Shared with MACD, which smooths its own line with the same recurrence.
pub(crate) fn ema_over(input: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(input.len());
    if period == 0 {
        out.resize(input.len(), None);
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = 0.0;
    let mut sum = 0.0;

    for (i, &x) in input.iter().enumerate() {
        if i < period - 1 {
            sum += x;
            out.push(None);
        } else if i == period - 1 {
            sum += x;
            ema = sum / period as f64;
            out.push(Some(ema));
        } else {
            ema = x * k + ema * (1.0 - k);
            out.push(Some(ema));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::IndicatorValue;
    use chrono::{Duration, NaiveDate};

    fn make_bars(prices: &[f64]) -> Vec<OhlcvBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                symbol: "TEST".into(),
                timestamp: start + Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn ema_warmup() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_ema(&bars, 3);

        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[3].valid);
        assert!(series.values[4].valid);
    }

    #[test]
    fn ema_seed_is_sma() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let series = calculate_ema(&bars, 3);

        if let IndicatorValue::Simple(v) = series.values[2].value {
            assert!((v - 20.0).abs() < f64::EPSILON);
        } else {
            panic!("Expected Simple value");
        }
    }

    #[test]
    fn ema_recursive_calculation() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_ema(&bars, 3);

        let k = 2.0 / 4.0;
        let ema_3 = 40.0 * k + 20.0 * (1.0 - k);
        let ema_4 = 50.0 * k + ema_3 * (1.0 - k);

        assert_eq!(series.values[3].value.as_simple(), Some(ema_3));
        assert_eq!(series.values[4].value.as_simple(), Some(ema_4));
    }

    #[test]
    fn ema_shorter_than_window_is_entirely_undefined() {
        let bars = make_bars(&[1.0; 19]);
        let series = calculate_ema(&bars, 20);
        assert_eq!(series.values.len(), 19);
        assert_eq!(series.defined_count(), 0);
    }

    #[test]
    fn ema_constant_series_converges_to_constant() {
        let bars = make_bars(&[42.5; 60]);
        let series = calculate_ema(&bars, 20);

        for point in series.values.iter().skip(19) {
            let v = point.value.as_simple().unwrap();
            assert!((v - 42.5).abs() < 1e-9);
        }
    }

    #[test]
    fn ema_period_1_tracks_close() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let series = calculate_ema(&bars, 1);

        for (point, bar) in series.values.iter().zip(&bars) {
            assert!(point.valid);
            assert_eq!(point.value.as_simple(), Some(bar.close));
        }
    }

    #[test]
    fn ema_empty_and_zero_period() {
        assert!(calculate_ema(&[], 3).values.is_empty());
        assert!(calculate_ema(&make_bars(&[10.0, 20.0]), 0).values.is_empty());
    }

    #[test]
    fn ema_over_matches_series() {
        let prices = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0];
        let raw = ema_over(&prices, 4);
        let series = calculate_ema(&make_bars(&prices), 4);

        for (r, p) in raw.iter().zip(&series.values) {
            assert_eq!(r.is_some(), p.valid);
            if let Some(v) = r {
                assert_eq!(p.value.as_simple(), Some(*v));
            }
        }
    }
}
