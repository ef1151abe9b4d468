//! Per-chain spot prices from pool reserves

pub mod price_oracle;
pub mod pricing;

pub use price_oracle::*;
pub use pricing::*;
