//! Pool reads and startup validation

pub mod info;
pub mod reserves;
pub mod validation;

pub use info::*;
pub use reserves::*;
pub use validation::*;
