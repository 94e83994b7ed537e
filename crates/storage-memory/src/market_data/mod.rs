mod static_oracle;

pub use static_oracle::{FxRate, PriceFile, StaticPriceOracle};
