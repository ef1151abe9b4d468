//! Trade execution: coordination, router calldata and dry-run fills

pub mod coordinator;
pub mod simulation;
pub mod swap;

pub use coordinator::*;
pub use simulation::*;
pub use swap::*;
