//! Storage gateway traits
//!
//! Persistence is passed into every operation that needs it; nothing in this
//! crate holds a connection.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::{MetricCategory, MetricRecord, NewSensor, Reading, Sensor};

/// Where derived metric records are written and read back
#[async_trait::async_trait]
pub trait MetricStore: Send + Sync {
    /// Persist one record as a single atomic write
    async fn store(&self, record: &MetricRecord) -> Result<()>;

    /// Most recent record for a location and category, by timestamp
    async fn latest(
        &self,
        location: &str,
        category: MetricCategory,
    ) -> Result<Option<MetricRecord>>;
}

/// Sensor registry and raw reading storage
#[async_trait::async_trait]
pub trait ReadingStore: Send + Sync {
    async fn register_sensor(&self, sensor: &NewSensor) -> Result<Sensor>;

    async fn get_sensor(&self, id: i64) -> Result<Option<Sensor>>;

    async fn record_reading(
        &self,
        sensor_id: i64,
        value: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<()>;

    /// Readings from every sensor at `location`, optionally only those at or after `since`
    async fn readings_for_location(
        &self,
        location: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Reading>>;
}
