use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::market_data_errors::MarketDataError;
use super::market_data_model::Quote;
use super::market_data_traits::PriceOracle;
use crate::errors::Result;

type HistoryKey = (String, NaiveDate, NaiveDate);
type FxKey = (String, String, NaiveDate);

/// Process-wide memoizing wrapper around a [`PriceOracle`].
///
/// Historical series and FX rates are cached under their own mutexes and never
/// participate in portfolio locking. Latest quotes are always forwarded.
pub struct CachedPriceOracle {
    inner: Arc<dyn PriceOracle>,
    history: Mutex<HashMap<HistoryKey, Vec<Quote>>>,
    rates: Mutex<HashMap<FxKey, Decimal>>,
}

impl CachedPriceOracle {
    pub fn new(inner: Arc<dyn PriceOracle>) -> Self {
        Self {
            inner,
            history: Mutex::new(HashMap::new()),
            rates: Mutex::new(HashMap::new()),
        }
    }

    /// Drops every cached series and rate.
    pub fn clear(&self) {
        if let Ok(mut history) = self.history.lock() {
            history.clear();
        }
        if let Ok(mut rates) = self.rates.lock() {
            rates.clear();
        }
    }

    pub fn cached_series_count(&self) -> usize {
        self.history.lock().map(|h| h.len()).unwrap_or(0)
    }
}

impl PriceOracle for CachedPriceOracle {
    fn quote(&self, symbol: &str) -> Result<Quote> {
        self.inner.quote(symbol)
    }

    fn historical(&self, symbol: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<Quote>> {
        let key = (symbol.to_string(), from, to);
        {
            let history = self
                .history
                .lock()
                .map_err(|e| MarketDataError::ProviderError(format!("price cache poisoned: {}", e)))?;
            if let Some(hit) = history.get(&key) {
                return Ok(hit.clone());
            }
        }

        // Fetch outside the lock so a slow provider does not block other symbols.
        let quotes = self.inner.historical(symbol, from, to)?;
        let mut history = self
            .history
            .lock()
            .map_err(|e| MarketDataError::ProviderError(format!("price cache poisoned: {}", e)))?;
        history.insert(key, quotes.clone());
        Ok(quotes)
    }

    fn fx(&self, from: &str, to: &str, date: NaiveDate) -> Result<Decimal> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        let key = (from.to_string(), to.to_string(), date);
        {
            let rates = self
                .rates
                .lock()
                .map_err(|e| MarketDataError::ProviderError(format!("fx cache poisoned: {}", e)))?;
            if let Some(rate) = rates.get(&key) {
                return Ok(*rate);
            }
        }

        let rate = self.inner.fx(from, to, date)?;
        let mut rates = self
            .rates
            .lock()
            .map_err(|e| MarketDataError::ProviderError(format!("fx cache poisoned: {}", e)))?;
        rates.insert(key, rate);
        Ok(rate)
    }
}
