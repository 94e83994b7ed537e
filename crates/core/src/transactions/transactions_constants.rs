/// Purchase of a security. Opens a tax lot and decreases cash.
pub const TRANSACTION_TYPE_BUY: &str = "BUY";

/// Disposal of a security. Consumes tax lots, realizes gains and increases cash.
pub const TRANSACTION_TYPE_SELL: &str = "SELL";

/// Cash dividend paid into the portfolio. Increases cash.
pub const TRANSACTION_TYPE_DIVIDEND: &str = "DIVIDEND";

/// Incoming funds from outside the portfolio. External flow.
pub const TRANSACTION_TYPE_DEPOSIT: &str = "DEPOSIT";

/// Outgoing funds to outside the portfolio. External flow.
pub const TRANSACTION_TYPE_WITHDRAWAL: &str = "WITHDRAWAL";

/// Stand-alone fee not tied to a trade. Decreases cash.
pub const TRANSACTION_TYPE_FEE: &str = "FEE";

/// Trading transaction types (these touch tax lots).
pub const TRADING_TRANSACTION_TYPES: [&str; 2] = [TRANSACTION_TYPE_BUY, TRANSACTION_TYPE_SELL];

/// Cash-only transaction types (recorded for performance only).
pub const CASH_TRANSACTION_TYPES: [&str; 4] = [
    TRANSACTION_TYPE_DIVIDEND,
    TRANSACTION_TYPE_DEPOSIT,
    TRANSACTION_TYPE_WITHDRAWAL,
    TRANSACTION_TYPE_FEE,
];
