//! Application layer: Use cases and services.
//!
//! This module orchestrates the risk engine with the storage and insight
//! ports to implement the screening workflow.

mod screening;

pub use screening::{ScreeningOutcome, ScreeningService};
