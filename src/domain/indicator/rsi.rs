//! RSI (Relative Strength Index) indicator implementation.
//!
//! Two smoothing modes for the average gain/loss:
//! - `Wilder`: first average is the simple mean of the first n gains/losses,
//!   then avg = (prev_avg * (n-1) + current) / n
//! - `Simple`: plain rolling mean of the last n gains/losses
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: first n bars are invalid (need n price changes to compute initial average).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RsiSmoothing {
    #[default]
    Wilder,
    Simple,
}

impl FromStr for RsiSmoothing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "wilder" => Ok(RsiSmoothing::Wilder),
            "simple" | "sma" => Ok(RsiSmoothing::Simple),
            other => Err(format!("unknown RSI smoothing {other:?} (expected wilder or simple)")),
        }
    }
}

impl fmt::Display for RsiSmoothing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RsiSmoothing::Wilder => write!(f, "wilder"),
            RsiSmoothing::Simple => write!(f, "simple"),
        }
    }
}

pub fn calculate_rsi(bars: &[OhlcvBar], period: usize, smoothing: RsiSmoothing) -> IndicatorSeries {
    if period == 0 || bars.len() < 2 {
        let values = bars
            .iter()
            .map(|b| IndicatorPoint::simple(b.timestamp, false, 0.0))
            .collect();
        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            values,
        };
    }

    let mut gains: Vec<f64> = Vec::with_capacity(bars.len() - 1);
    let mut losses: Vec<f64> = Vec::with_capacity(bars.len() - 1);
    for pair in bars.windows(2) {
        let change = pair[1].close - pair[0].close;
        gains.push(if change > 0.0 { change } else { 0.0 });
        losses.push(if change < 0.0 { -change } else { 0.0 });
    }

    let mut values = Vec::with_capacity(bars.len());
    values.push(IndicatorPoint::simple(bars[0].timestamp, false, 0.0));

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for (i, bar) in bars.iter().enumerate().skip(1) {
        let idx = i - 1;

        if idx + 1 < period {
            values.push(IndicatorPoint::simple(bar.timestamp, false, 0.0));
            continue;
        }

        let window = idx + 1 - period..=idx;
        match smoothing {
            RsiSmoothing::Wilder if idx + 1 > period => {
                avg_gain = (avg_gain * (period - 1) as f64 + gains[idx]) / period as f64;
                avg_loss = (avg_loss * (period - 1) as f64 + losses[idx]) / period as f64;
            }
            _ => {
                avg_gain = gains[window.clone()].iter().sum::<f64>() / period as f64;
                avg_loss = losses[window].iter().sum::<f64>() / period as f64;
            }
        }

        values.push(IndicatorPoint::simple(
            bar.timestamp,
            true,
            rsi_from_averages(avg_gain, avg_loss),
        ));
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rsi = 100.0 - (100.0 / (1.0 + avg_gain / avg_loss));
    rsi.clamp(0.0, 100.0)
}
