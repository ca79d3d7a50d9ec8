//! Indicator engine: bars in, merged indicator table out.
//!
//! The engine computes every configured indicator over the close series and
//! joins them with the bars into an [`IndicatorTable`]. Rows where any
//! requested indicator is still warming up (or numerically unusable) are
//! dropped, never zero-filled, so every row handed to the classifier is
//! complete.

use crate::domain::bar_series::BarSeries;
use crate::domain::error::TrendError;
use crate::domain::indicator::{
    calculate_bollinger, calculate_ema, calculate_macd, calculate_rsi, calculate_sma,
    IndicatorSeries, IndicatorType, IndicatorValue, RsiSmoothing,
};
use crate::domain::ohlcv::OhlcvBar;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub ema_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub rsi_period: usize,
    pub rsi_smoothing: RsiSmoothing,
    pub bollinger_period: usize,
    pub bollinger_stddev_mult_x100: u32,
    /// Optional trend SMA (e.g. 50); when set it is a requested indicator and
    /// participates in warm-up row dropping.
    pub sma_period: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ema_period: 20,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            rsi_period: 14,
            rsi_smoothing: RsiSmoothing::Wilder,
            bollinger_period: 20,
            bollinger_stddev_mult_x100: 200,
            sma_period: None,
        }
    }
}

impl EngineConfig {
    pub fn ema_type(&self) -> IndicatorType {
        IndicatorType::Ema(self.ema_period)
    }

    pub fn macd_type(&self) -> IndicatorType {
        IndicatorType::Macd {
            fast: self.macd_fast,
            slow: self.macd_slow,
            signal: self.macd_signal,
        }
    }

    pub fn rsi_type(&self) -> IndicatorType {
        IndicatorType::Rsi(self.rsi_period)
    }

    pub fn bollinger_type(&self) -> IndicatorType {
        IndicatorType::Bollinger {
            period: self.bollinger_period,
            stddev_mult_x100: self.bollinger_stddev_mult_x100,
        }
    }

    pub fn sma_type(&self) -> Option<IndicatorType> {
        self.sma_period.map(IndicatorType::Sma)
    }

    pub fn indicator_types(&self) -> Vec<IndicatorType> {
        let mut types = vec![
            self.ema_type(),
            self.macd_type(),
            self.rsi_type(),
            self.bollinger_type(),
        ];
        types.extend(self.sma_type());
        types
    }

    /// Bars needed before the first complete row can exist.
    pub fn min_bars(&self) -> usize {
        self.indicator_types()
            .iter()
            .map(IndicatorType::min_bars)
            .max()
            .unwrap_or(0)
    }

    fn check_periods(&self) -> Result<(), TrendError> {
        let periods = [
            ("ema_period", self.ema_period),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("rsi_period", self.rsi_period),
            ("bollinger_period", self.bollinger_period),
            ("sma_period", self.sma_period.unwrap_or(1)),
        ];
        for (name, value) in periods {
            if value == 0 {
                return Err(TrendError::malformed(format!("{name} must be positive")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdReading {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandReading {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// One complete row of the merged bar + indicator table.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRow {
    pub bar: OhlcvBar,
    pub ema: f64,
    pub macd: MacdReading,
    pub rsi: f64,
    pub bollinger: BandReading,
    pub sma: Option<f64>,
}

impl IndicatorRow {
    pub fn close(&self) -> f64 {
        self.bar.close
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorTable {
    pub symbol: String,
    pub config: EngineConfig,
    pub rows: Vec<IndicatorRow>,
    /// Bars fed into the engine, including the dropped warm-up prefix.
    pub source_bars: usize,
}

impl IndicatorTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn latest(&self) -> Option<&IndicatorRow> {
        self.rows.last()
    }

    pub fn dropped_rows(&self) -> usize {
        self.source_bars - self.rows.len()
    }

    /// Column headers matching [`IndicatorTable::records`].
    pub fn column_names(&self) -> Vec<String> {
        let mut names: Vec<String> = ["timestamp", "open", "high", "low", "close", "volume"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        names.push(format!("EMA{}", self.config.ema_period));
        names.extend(["MACD", "MACD_signal", "MACD_diff"].map(String::from));
        names.push("RSI".to_string());
        names.extend(["BB_upper", "BB_middle", "BB_lower"].map(String::from));
        if let Some(period) = self.config.sma_period {
            names.push(format!("SMA_{}", period));
        }
        names
    }

    /// Rows rendered as strings, one field per [`IndicatorTable::column_names`] entry.
    pub fn records(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.rows.iter().map(|row| {
            let bar = &row.bar;
            let mut fields = vec![bar.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()];
            let mut numbers = vec![
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.volume,
                row.ema,
                row.macd.line,
                row.macd.signal,
                row.macd.histogram,
                row.rsi,
                row.bollinger.upper,
                row.bollinger.middle,
                row.bollinger.lower,
            ];
            numbers.extend(row.sma);
            fields.extend(numbers.iter().map(|v| v.to_string()));
            fields
        })
    }
}

/// Check the precondition every indicator relies on: a one-dimensional,
/// finite, strictly time-ordered close series.
pub fn validate_bars(bars: &[OhlcvBar]) -> Result<(), TrendError> {
    if let Some(bad) = bars.iter().position(|b| !b.close.is_finite()) {
        return Err(TrendError::malformed(format!(
            "close at row {bad} is not a finite number"
        )));
    }
    if let Some(i) = bars
        .windows(2)
        .position(|pair| pair[0].timestamp >= pair[1].timestamp)
    {
        return Err(TrendError::malformed(format!(
            "timestamps not strictly ascending at row {}",
            i + 1
        )));
    }
    Ok(())
}

pub fn compute_indicators(
    bars: &[OhlcvBar],
    config: &EngineConfig,
) -> HashMap<IndicatorType, IndicatorSeries> {
    let mut result = HashMap::new();
    for indicator_type in config.indicator_types() {
        let series = match indicator_type {
            IndicatorType::Ema(n) => calculate_ema(bars, n),
            IndicatorType::Sma(n) => calculate_sma(bars, n),
            IndicatorType::Rsi(n) => calculate_rsi(bars, n, config.rsi_smoothing),
            IndicatorType::Macd { fast, slow, signal } => calculate_macd(bars, fast, slow, signal),
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => calculate_bollinger(bars, period, stddev_mult_x100),
        };
        result.insert(indicator_type, series);
    }
    result
}

/// Run the engine over raw bars for `symbol`.
///
/// Empty input short-circuits with [`TrendError::NoData`]. Input that is
/// present but too short for any complete row yields an empty table.
pub fn compute_table(
    symbol: &str,
    bars: &[OhlcvBar],
    config: &EngineConfig,
) -> Result<IndicatorTable, TrendError> {
    if bars.is_empty() {
        return Err(TrendError::NoData {
            symbol: symbol.to_string(),
        });
    }
    config.check_periods()?;
    validate_bars(bars)?;

    let indicators = compute_indicators(bars, config);
    let rows: Vec<IndicatorRow> = (0..bars.len())
        .filter_map(|i| merge_row(&bars[i], i, &indicators, config))
        .collect();

    debug!(
        symbol,
        bars = bars.len(),
        rows = rows.len(),
        "indicator table computed"
    );

    Ok(IndicatorTable {
        symbol: symbol.to_string(),
        config: config.clone(),
        rows,
        source_bars: bars.len(),
    })
}

pub fn run_engine(series: &BarSeries, config: &EngineConfig) -> Result<IndicatorTable, TrendError> {
    compute_table(series.symbol(), series.bars(), config)
}

fn merge_row(
    bar: &OhlcvBar,
    i: usize,
    indicators: &HashMap<IndicatorType, IndicatorSeries>,
    config: &EngineConfig,
) -> Option<IndicatorRow> {
    let at = |t: IndicatorType| indicators.get(&t).and_then(|s| s.defined_at(i));

    let ema = at(config.ema_type())?.as_simple()?;
    let rsi = at(config.rsi_type())?.as_simple()?;
    let macd = match at(config.macd_type())? {
        IndicatorValue::Macd {
            line,
            signal,
            histogram,
        } => MacdReading {
            line,
            signal,
            histogram,
        },
        _ => return None,
    };
    let bollinger = match at(config.bollinger_type())? {
        IndicatorValue::Bollinger {
            upper,
            middle,
            lower,
        } => BandReading {
            upper,
            middle,
            lower,
        },
        _ => return None,
    };
    let sma = match config.sma_type() {
        Some(t) => Some(at(t)?.as_simple()?),
        None => None,
    };

    Some(IndicatorRow {
        bar: bar.clone(),
        ema,
        macd,
        rsi,
        bollinger,
        sma,
    })
}
