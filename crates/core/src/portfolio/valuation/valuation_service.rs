use chrono::NaiveDate;
use log::warn;
use std::collections::HashMap;
use std::sync::Arc;

use super::valuation_calculator::{calculate_value_series, priced_symbols};
use super::valuation_model::DailyValuation;
use crate::errors::{Error, Result};
use crate::event_store::EventLog;
use crate::market_data::{PriceOracle, PriceSeries};
use crate::portfolios::Portfolio;
use crate::utils::Deadline;

/// Builds daily value series from an event log and the price oracle.
///
/// Callers load the log under the portfolio's read lock; valuation itself
/// runs outside it.
pub struct ValuationService {
    price_oracle: Arc<dyn PriceOracle>,
}

impl ValuationService {
    pub fn new(price_oracle: Arc<dyn PriceOracle>) -> Self {
        Self { price_oracle }
    }

    pub fn price_oracle(&self) -> &Arc<dyn PriceOracle> {
        &self.price_oracle
    }

    /// Closes for every priced symbol from the first event (or `start`) to `end`.
    /// A failed fetch leaves the symbol without prices.
    fn load_prices(
        &self,
        log: &EventLog,
        start: NaiveDate,
        end: NaiveDate,
    ) -> HashMap<String, PriceSeries> {
        let from = log
            .events()
            .first()
            .map(|event| event.date().min(start))
            .unwrap_or(start);
        priced_symbols(log)
            .into_iter()
            .map(|symbol| {
                let series = match self.price_oracle.historical(&symbol, from, end) {
                    Ok(quotes) => PriceSeries::from_quotes(&quotes),
                    Err(e) => {
                        warn!("Failed to load history for {}: {}", symbol, e);
                        PriceSeries::default()
                    }
                };
                (symbol, series)
            })
            .collect()
    }

    /// One valuation per day in `[start, end]`.
    pub fn value_series(
        &self,
        portfolio: &Portfolio,
        log: &EventLog,
        start: NaiveDate,
        end: NaiveDate,
        deadline: &Deadline,
    ) -> Result<Vec<DailyValuation>> {
        let prices = self.load_prices(log, start, end);
        calculate_value_series(
            portfolio,
            log,
            start,
            end,
            &prices,
            self.price_oracle.as_ref(),
            deadline,
        )
    }

    /// The portfolio's value at the end of `date`.
    pub fn value_on(
        &self,
        portfolio: &Portfolio,
        log: &EventLog,
        date: NaiveDate,
        deadline: &Deadline,
    ) -> Result<DailyValuation> {
        let mut series = self.value_series(portfolio, log, date, date, deadline)?;
        series.pop().ok_or_else(|| {
            Error::Unexpected(format!(
                "empty valuation of portfolio {} on {}",
                portfolio.id, date
            ))
        })
    }
}
