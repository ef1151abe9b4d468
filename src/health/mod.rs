//! Connection liveness tracking

pub mod tracker;

pub use tracker::*;
