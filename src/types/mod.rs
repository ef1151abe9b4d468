//! Core data types and structures

pub mod chain;
pub mod pools;
pub mod price;
pub mod arbitrage;
pub mod execution;
pub mod validation;
pub mod health;

pub use chain::*;
pub use pools::*;
pub use price::*;
pub use arbitrage::*;
pub use execution::*;
pub use validation::*;
pub use health::*;
