//! Data persistence and file operations

pub mod opportunities;
pub mod executions;

pub use opportunities::*;
pub use executions::*;
