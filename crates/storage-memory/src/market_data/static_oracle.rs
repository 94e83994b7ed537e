//! Price oracle over a fixed table of closes and exchange rates, loaded
//! from a JSON price file or filled in by hand.

use chrono::NaiveDate;
use log::info;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use crate::errors::{IntoCore, StorageError};
use foliotrack_core::errors::Result;
use foliotrack_core::market_data::{MarketDataError, PriceOracle, Quote};

/// One dated exchange rate: one unit of `from` is worth `rate` units of `to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FxRate {
    pub from: String,
    pub to: String,
    pub date: NaiveDate,
    pub rate: Decimal,
}

/// On-disk shape of a price file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriceFile {
    pub quotes: Vec<Quote>,
    pub fx_rates: Vec<FxRate>,
}

type Closes = HashMap<String, BTreeMap<NaiveDate, Quote>>;
type Rates = HashMap<(String, String), BTreeMap<NaiveDate, Decimal>>;

#[derive(Debug, Default)]
pub struct StaticPriceOracle {
    closes: RwLock<Closes>,
    rates: RwLock<Rates>,
}

fn poisoned(e: impl std::fmt::Display) -> StorageError {
    StorageError::Poisoned(format!("price table: {}", e))
}

impl StaticPriceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_price_file(file: PriceFile) -> Result<Self> {
        let oracle = Self::new();
        oracle.load(file)?;
        Ok(oracle)
    }

    /// Reads a JSON [`PriceFile`].
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .map_err(|source| StorageError::Io {
                path: path.to_path_buf(),
                source,
            })
            .into_core()?;
        let file: PriceFile = serde_json::from_slice(&bytes)
            .map_err(StorageError::from)
            .into_core()?;
        info!(
            "Loaded {} quote(s) and {} FX rate(s) from {}",
            file.quotes.len(),
            file.fx_rates.len(),
            path.display()
        );
        Self::from_price_file(file)
    }

    pub fn load(&self, file: PriceFile) -> Result<()> {
        for quote in file.quotes {
            self.insert_quote(quote)?;
        }
        for rate in file.fx_rates {
            self.insert_rate(&rate.from, &rate.to, rate.date, rate.rate)?;
        }
        Ok(())
    }

    pub fn insert_quote(&self, quote: Quote) -> Result<()> {
        let mut closes = self.closes.write().map_err(poisoned).into_core()?;
        closes
            .entry(quote.symbol.clone())
            .or_default()
            .insert(quote.date, quote);
        Ok(())
    }

    /// Shorthand for a close quoted in `currency`.
    pub fn insert_close(
        &self,
        symbol: &str,
        date: NaiveDate,
        close: Decimal,
        currency: &str,
    ) -> Result<()> {
        self.insert_quote(Quote {
            symbol: symbol.to_string(),
            date,
            close,
            currency: currency.to_string(),
        })
    }

    pub fn insert_rate(&self, from: &str, to: &str, date: NaiveDate, rate: Decimal) -> Result<()> {
        let mut rates = self.rates.write().map_err(poisoned).into_core()?;
        rates
            .entry((from.to_string(), to.to_string()))
            .or_default()
            .insert(date, rate);
        Ok(())
    }

    fn rate_on_or_before(rates: &Rates, from: &str, to: &str, date: NaiveDate) -> Option<Decimal> {
        rates
            .get(&(from.to_string(), to.to_string()))
            .and_then(|series| series.range(..=date).next_back())
            .map(|(_, rate)| *rate)
    }
}

impl PriceOracle for StaticPriceOracle {
    fn quote(&self, symbol: &str) -> Result<Quote> {
        let closes = self.closes.read().map_err(poisoned).into_core()?;
        closes
            .get(symbol)
            .and_then(|series| series.values().next_back())
            .cloned()
            .ok_or_else(|| MarketDataError::QuoteNotFound(symbol.to_string()).into())
    }

    fn historical(&self, symbol: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<Quote>> {
        if from > to {
            return Ok(Vec::new());
        }
        let closes = self.closes.read().map_err(poisoned).into_core()?;
        Ok(closes
            .get(symbol)
            .map(|series| series.range(from..=to).map(|(_, q)| q.clone()).collect())
            .unwrap_or_default())
    }

    /// Carries the latest rate on or before `date` forward; falls back to
    /// the inverse pair.
    fn fx(&self, from: &str, to: &str, date: NaiveDate) -> Result<Decimal> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        let rates = self.rates.read().map_err(poisoned).into_core()?;
        if let Some(rate) = Self::rate_on_or_before(&rates, from, to, date) {
            return Ok(rate);
        }
        Self::rate_on_or_before(&rates, to, from, date)
            .filter(|inverse| !inverse.is_zero())
            .and_then(|inverse| Decimal::ONE.checked_div(inverse))
            .ok_or_else(|| {
                MarketDataError::FxRateNotFound {
                    from: from.to_string(),
                    to: to.to_string(),
                    date,
                }
                .into()
            })
    }
}
