//! Metric aggregation service
//!
//! Composes the pure category formulas from `citysense-core` with a storage
//! gateway: every `update_*` computes one record and writes it once.

pub mod aggregator;
pub mod memory;

pub use aggregator::*;
pub use memory::*;
