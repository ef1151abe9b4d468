//! Pre-commit checks on opportunities and pool depth

pub mod liquidity;
pub mod opportunity;

pub use liquidity::*;
pub use opportunity::*;
