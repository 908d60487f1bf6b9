//! In-process storage gateway

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use citysense_core::{
    MetricCategory, MetricRecord, MetricStore, NewSensor, Reading, ReadingStore, Sensor,
};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy)]
struct StoredReading {
    sensor_id: i64,
    value: f64,
    timestamp: DateTime<Utc>,
}

/// Gateway keeping records, sensors and readings in memory.
///
/// Used when no database is configured and by tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<MetricRecord>>,
    sensors: RwLock<Vec<Sensor>>,
    readings: RwLock<Vec<StoredReading>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl MetricStore for MemoryStore {
    async fn store(&self, record: &MetricRecord) -> Result<()> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn latest(
        &self,
        location: &str,
        category: MetricCategory,
    ) -> Result<Option<MetricRecord>> {
        let records = self.records.read().await;
        // max_by_key keeps the last of equal timestamps, i.e. the newest write
        Ok(records
            .iter()
            .filter(|r| r.location() == location && r.category() == category)
            .max_by_key(|r| r.timestamp())
            .cloned())
    }
}

#[async_trait::async_trait]
impl ReadingStore for MemoryStore {
    async fn register_sensor(&self, sensor: &NewSensor) -> Result<Sensor> {
        let mut sensors = self.sensors.write().await;
        let registered = Sensor {
            id: sensors.len() as i64 + 1,
            name: sensor.name.clone(),
            location: sensor.location.clone(),
            sensor_type: sensor.sensor_type,
        };
        sensors.push(registered.clone());
        Ok(registered)
    }

    async fn get_sensor(&self, id: i64) -> Result<Option<Sensor>> {
        let sensors = self.sensors.read().await;
        Ok(sensors.iter().find(|s| s.id == id).cloned())
    }

    async fn record_reading(
        &self,
        sensor_id: i64,
        value: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        if self.get_sensor(sensor_id).await?.is_none() {
            return Err(anyhow!("unknown sensor id {}", sensor_id));
        }
        self.readings.write().await.push(StoredReading {
            sensor_id,
            value,
            timestamp,
        });
        Ok(())
    }

    async fn readings_for_location(
        &self,
        location: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Reading>> {
        let sensors = self.sensors.read().await;
        let readings = self.readings.read().await;

        let mut joined: Vec<Reading> = readings
            .iter()
            .filter(|r| since.map_or(true, |since| r.timestamp >= since))
            .filter_map(|r| {
                sensors
                    .iter()
                    .find(|s| s.id == r.sensor_id && s.location == location)
                    .map(|s| Reading::new(s.sensor_type, r.value, r.timestamp))
            })
            .collect();
        joined.sort_by_key(|r| r.timestamp);
        Ok(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use citysense_core::{SensorType, TrafficSignal, WeatherSignal};

    fn new_sensor(name: &str, location: &str, sensor_type: impl Into<SensorType>) -> NewSensor {
        NewSensor {
            name: name.to_string(),
            location: location.to_string(),
            sensor_type: sensor_type.into(),
        }
    }

    #[tokio::test]
    async fn test_register_assigns_sequential_ids() {
        let store = MemoryStore::new();
        let a = store
            .register_sensor(&new_sensor("a", "park", WeatherSignal::Humidity))
            .await
            .unwrap();
        let b = store
            .register_sensor(&new_sensor("b", "park", WeatherSignal::Temperature))
            .await
            .unwrap();

        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(store.get_sensor(2).await.unwrap(), Some(b));
        assert_eq!(store.get_sensor(3).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_readings_joined_by_location_and_since() {
        let store = MemoryStore::new();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let park = store
            .register_sensor(&new_sensor("t", "park", WeatherSignal::Temperature))
            .await
            .unwrap();
        let road = store
            .register_sensor(&new_sensor("c", "road", TrafficSignal::VehicleCounter))
            .await
            .unwrap();

        store
            .record_reading(park.id, 12.0, t0 + Duration::hours(2))
            .await
            .unwrap();
        store.record_reading(park.id, 10.0, t0).await.unwrap();
        store
            .record_reading(road.id, 300.0, t0 + Duration::hours(1))
            .await
            .unwrap();

        let all = store.readings_for_location("park", None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].value, 10.0);
        assert_eq!(all[0].sensor_type, SensorType::Weather(WeatherSignal::Temperature));

        let recent = store
            .readings_for_location("park", Some(t0 + Duration::hours(1)))
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].value, 12.0);

        assert!(store
            .readings_for_location("nowhere", None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_reading_for_unknown_sensor_is_rejected() {
        let store = MemoryStore::new();
        assert!(store.record_reading(9, 1.0, Utc::now()).await.is_err());
    }
}
