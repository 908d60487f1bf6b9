//! Gateway trait implementations backed by PostgreSQL

use crate::DbClient;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use citysense_core::{
    MetricCategory, MetricRecord, MetricStore, NewSensor, Reading, ReadingStore, Sensor,
};

#[async_trait]
impl MetricStore for DbClient {
    async fn store(&self, record: &MetricRecord) -> Result<()> {
        self.insert_record(record).await?;
        Ok(())
    }

    async fn latest(
        &self,
        location: &str,
        category: MetricCategory,
    ) -> Result<Option<MetricRecord>> {
        Ok(self.get_latest_record(location, category).await?)
    }
}

#[async_trait]
impl ReadingStore for DbClient {
    async fn register_sensor(&self, sensor: &NewSensor) -> Result<Sensor> {
        Ok(self.insert_sensor(sensor).await?)
    }

    async fn get_sensor(&self, id: i64) -> Result<Option<Sensor>> {
        Ok(self.get_sensor_by_id(id).await?)
    }

    async fn record_reading(
        &self,
        sensor_id: i64,
        value: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        self.insert_reading(sensor_id, value, timestamp).await?;
        Ok(())
    }

    async fn readings_for_location(
        &self,
        location: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Reading>> {
        Ok(self.get_readings_for_location(location, since).await?)
    }
}
