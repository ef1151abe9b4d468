//! Cross-chain opportunity evaluation

pub mod cost;
pub mod evaluator;

pub use cost::*;
pub use evaluator::*;
