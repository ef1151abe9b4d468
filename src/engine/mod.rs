//! Evaluation loop and status surface

pub mod runner;
pub mod status;

pub use runner::*;
pub use status::*;
