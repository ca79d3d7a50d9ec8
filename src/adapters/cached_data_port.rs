//! Memoizing wrapper around any [`DataPort`].

use crate::domain::cache::{Clock, TtlCache};
use crate::domain::error::TrendError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::timeframe::FetchRequest;
use crate::ports::data_port::DataPort;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// One hour, matching the dashboards' refresh cadence.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

type CacheKey = (String, FetchRequest);

/// Caches successful fetches keyed by (symbol, range, interval). Failures go
/// straight through and are retried on the next call.
pub struct CachedDataPort<P> {
    inner: P,
    cache: TtlCache<CacheKey, Vec<OhlcvBar>>,
}

impl<P: DataPort> CachedDataPort<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            cache: TtlCache::new(ttl),
        }
    }

    pub fn with_clock(inner: P, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            cache: TtlCache::with_clock(ttl, clock),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}

impl<P: DataPort> DataPort for CachedDataPort<P> {
    fn fetch_bars(
        &self,
        symbol: &str,
        request: &FetchRequest,
    ) -> Result<Vec<OhlcvBar>, TrendError> {
        self.cache
            .get_or_try_insert_with((symbol.to_string(), *request), || {
                debug!(symbol, %request, "cache miss");
                self.inner.fetch_bars(symbol, request)
            })
    }

    fn list_symbols(&self) -> Result<Vec<String>, TrendError> {
        self.inner.list_symbols()
    }
}
