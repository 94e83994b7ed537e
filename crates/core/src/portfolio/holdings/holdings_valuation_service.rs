use log::{debug, warn};
use rust_decimal::Decimal;
use std::sync::Arc;

use super::holdings_model::{Holding, HoldingsSummary, MonetaryValue, ValuedHolding};
use crate::market_data::{PriceOracle, Quote};
use crate::utils::decimal_utils::{percent_of, round_metric};

/// Prices holdings with the oracle's latest quotes and converts them to the
/// portfolio's base currency.
#[derive(Clone)]
pub struct HoldingsValuationService {
    price_oracle: Arc<dyn PriceOracle>,
}

impl HoldingsValuationService {
    pub fn new(price_oracle: Arc<dyn PriceOracle>) -> Self {
        Self { price_oracle }
    }

    fn latest_quote(&self, symbol: &str) -> Option<Quote> {
        match self.price_oracle.quote(symbol) {
            Ok(quote) => Some(quote),
            Err(e) => {
                warn!("No quote for {}: {}. Leaving it unpriced.", symbol, e);
                None
            }
        }
    }

    fn fx_rate(&self, quote: &Quote, base_currency: &str) -> Option<Decimal> {
        if quote.currency == base_currency {
            return Some(Decimal::ONE);
        }
        match self
            .price_oracle
            .fx(&quote.currency, base_currency, quote.date)
        {
            Ok(rate) => Some(rate),
            Err(e) => {
                warn!(
                    "No FX rate {}->{} on {}: {}. Leaving {} unpriced.",
                    quote.currency, base_currency, quote.date, e, quote.symbol
                );
                None
            }
        }
    }

    /// Values one holding. Oracle failures leave the price-derived fields null.
    pub fn value_holding(&self, holding: Holding, base_currency: &str) -> ValuedHolding {
        let priced = self.latest_quote(&holding.symbol).and_then(|quote| {
            let rate = self.fx_rate(&quote, base_currency)?;
            Some((quote, rate))
        });

        let Some((quote, rate)) = priced else {
            let cost = holding.total_cost_basis;
            return ValuedHolding {
                base_currency: base_currency.to_string(),
                price: None,
                price_date: None,
                fx_rate_to_base: None,
                market_value: None,
                cost_basis: MonetaryValue {
                    local: cost,
                    base: cost,
                },
                unrealized_gain: None,
                unrealized_gain_pct: None,
                holding,
            };
        };

        let market_local = holding.quantity * quote.close;
        let cost_local = holding.total_cost_basis;
        let market_value = MonetaryValue {
            local: market_local,
            base: market_local * rate,
        };
        let cost_basis = MonetaryValue {
            local: cost_local,
            base: cost_local * rate,
        };
        let gain = MonetaryValue {
            local: market_value.local - cost_basis.local,
            base: market_value.base - cost_basis.base,
        };
        let gain_pct = percent_of(gain.local, cost_local).map(round_metric);

        debug!(
            "Valued {} {} @ {} ({}): {} {}",
            holding.quantity,
            holding.symbol,
            quote.close,
            quote.date,
            market_value.base,
            base_currency
        );

        ValuedHolding {
            base_currency: base_currency.to_string(),
            price: Some(quote.close),
            price_date: Some(quote.date),
            fx_rate_to_base: Some(rate),
            market_value: Some(market_value),
            cost_basis,
            unrealized_gain: Some(gain),
            unrealized_gain_pct: gain_pct,
            holding,
        }
    }

    /// Values every holding and totals them in base currency. Unpriced
    /// holdings count at cost in the market-value total.
    pub fn summarize(
        &self,
        portfolio_id: &str,
        holdings: Vec<Holding>,
        base_currency: &str,
    ) -> HoldingsSummary {
        let valued: Vec<ValuedHolding> = holdings
            .into_iter()
            .map(|holding| self.value_holding(holding, base_currency))
            .collect();

        let mut total_market_value = Decimal::ZERO;
        let mut total_cost_basis = Decimal::ZERO;
        let mut total_unrealized_gain = Decimal::ZERO;
        let mut unpriced_symbols = Vec::new();
        for holding in &valued {
            total_cost_basis += holding.cost_basis.base;
            match (&holding.market_value, &holding.unrealized_gain) {
                (Some(value), Some(gain)) => {
                    total_market_value += value.base;
                    total_unrealized_gain += gain.base;
                }
                _ => {
                    total_market_value += holding.cost_basis.base;
                    unpriced_symbols.push(holding.holding.symbol.clone());
                }
            }
        }

        HoldingsSummary {
            portfolio_id: portfolio_id.to_string(),
            base_currency: base_currency.to_string(),
            holdings: valued,
            total_market_value,
            total_cost_basis,
            total_unrealized_gain,
            unpriced_symbols,
        }
    }
}
