//! Cross-Chain AMM Arbitrage Bot
//!
//! Watches an equivalent constant-product pool on two independent chains,
//! prices both from reserves, and when the gap clears costs executes a
//! buy on the cheaper chain followed by a sell on the pricier one. The two
//! legs are not atomic: a failed second leg is unwound, and a failed unwind
//! halts execution until an operator clears the incident.

pub mod config;
pub mod types;
pub mod errors;
pub mod network;
pub mod pools;
pub mod oracle;
pub mod arbitrage;
pub mod health;
pub mod validation;
pub mod execution;
pub mod engine;
pub mod utils;
pub mod storage;

// Re-export commonly used items
pub use config::{Config, CONFIG};
pub use engine::{ArbitrageEngine, EngineConfig, StatusSnapshot};
pub use errors::{BotError, BotResult};
pub use network::{ChainConnection, ChainRegistry};
pub use types::*;
