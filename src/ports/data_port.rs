//! Market data acquisition port.

use crate::domain::error::TrendError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::timeframe::FetchRequest;

pub trait DataPort {
    /// Bars for `symbol` covering `request`. A symbol the source knows nothing
    /// about yields `Ok(vec![])`; errors are reserved for source failures.
    fn fetch_bars(&self, symbol: &str, request: &FetchRequest)
    -> Result<Vec<OhlcvBar>, TrendError>;

    fn list_symbols(&self) -> Result<Vec<String>, TrendError>;
}

impl<T: DataPort + ?Sized> DataPort for Box<T> {
    fn fetch_bars(
        &self,
        symbol: &str,
        request: &FetchRequest,
    ) -> Result<Vec<OhlcvBar>, TrendError> {
        (**self).fetch_bars(symbol, request)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TrendError> {
        (**self).list_symbols()
    }
}
