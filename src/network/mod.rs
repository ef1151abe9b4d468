//! Chain connections, provider setup and retry policy

pub mod alloy_connection;
pub mod connection;
pub mod providers;
pub mod retry;

pub use alloy_connection::*;
pub use connection::*;
pub use providers::*;
pub use retry::*;
