//! Core data types, aggregation formulas and statistics for CitySense
//!
//! Everything here is synchronous and side-effect free except the storage
//! gateway traits, which other crates implement.

pub mod formulas;
pub mod metrics;
pub mod rollups;
pub mod stats;
pub mod store;
pub mod types;

pub use formulas::*;
pub use metrics::*;
pub use rollups::*;
pub use stats::*;
pub use store::*;
pub use types::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricError {
    #[error("Insufficient data for {category}: no {sensor_type} readings")]
    InsufficientData {
        category: MetricCategory,
        sensor_type: SensorType,
    },

    #[error("Storage failure for {category} record: {source:#}")]
    Storage {
        category: MetricCategory,
        #[source]
        source: anyhow::Error,
    },
}

pub type MetricResult<T> = Result<T, MetricError>;
