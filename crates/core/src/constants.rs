use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Decimal precision for reported analytics (returns, percentages).
pub const DECIMAL_PRECISION: u32 = 6;

/// Decimal precision for display
pub const DISPLAY_DECIMAL_PRECISION: u32 = 2;

/// A position held at least this many calendar days at sale is long-term.
pub const LONG_TERM_HOLDING_DAYS: i64 = 365;

/// Day-count basis used by annualization and the IRR exponents.
pub const DAYS_PER_YEAR: Decimal = dec!(365);

/// Newton-Raphson starting guess for the money-weighted return.
pub const IRR_INITIAL_GUESS: Decimal = dec!(0.1);

/// Bisection bracket for the money-weighted return.
pub const IRR_LOWER_BOUND: Decimal = dec!(-0.9999);
pub const IRR_UPPER_BOUND: Decimal = dec!(10.0);

/// Convergence threshold on the normalized NPV.
pub const IRR_TOLERANCE: Decimal = dec!(0.0000000001);

/// Derivatives smaller than this hand over to bisection.
pub const IRR_MIN_DERIVATIVE: Decimal = dec!(0.000000000001);

pub const IRR_MAX_ITERATIONS: u32 = 100;

/// Default signed percent for tax-loss harvesting candidates.
pub const DEFAULT_HARVEST_THRESHOLD_PCT: Decimal = dec!(-3);

pub const DEFAULT_SNAPSHOT_PAGE_LIMIT: usize = 30;
pub const MAX_SNAPSHOT_PAGE_LIMIT: usize = 365;

pub const DEFAULT_BENCHMARK_SYMBOL: &str = "SPY";

/// Trading days used to annualize daily volatility.
pub const TRADING_DAYS_PER_YEAR: u32 = 252;

/// Prefix for transactions synthesized from corporate-action dividends.
pub const SYNTHETIC_DIVIDEND_PREFIX: &str = "CA-DIV";
