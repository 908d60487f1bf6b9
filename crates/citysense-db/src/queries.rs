//! Query operations for sensors, readings and derived metric tables

use crate::schema::{
    AirQualityRow, EnergyRow, NoiseRow, ReadingRow, SensorRow, TrafficRow, WaterQualityRow,
    WeatherRow,
};
use crate::{DbClient, DbError, DbResult};
use chrono::{DateTime, Utc};
use citysense_core::{MetricCategory, MetricRecord, NewSensor, Reading, Sensor};
use sqlx::Row;
use tracing::{debug, instrument, warn};

impl DbClient {
    /// Insert one derived metric record into its category table
    #[instrument(skip(self, record), fields(category = %record.category(), location = %record.location()))]
    pub async fn insert_record(&self, record: &MetricRecord) -> DbResult<()> {
        let query = match record {
            MetricRecord::AirQuality(r) => sqlx::query(
                r#"
                INSERT INTO air_quality_index (location, timestamp, aqi, pm25, pm10, o3, co, no2, so2)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(&r.location)
            .bind(r.timestamp)
            .bind(r.metrics.aqi)
            .bind(r.metrics.pm25)
            .bind(r.metrics.pm10)
            .bind(r.metrics.o3)
            .bind(r.metrics.co)
            .bind(r.metrics.no2)
            .bind(r.metrics.so2),
            MetricRecord::Traffic(r) => sqlx::query(
                r#"
                INSERT INTO traffic_data (location, timestamp, density, vehicle_count, average_speed, congestion_level)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(&r.location)
            .bind(r.timestamp)
            .bind(r.metrics.density)
            .bind(r.metrics.vehicle_count)
            .bind(r.metrics.average_speed)
            .bind(r.metrics.congestion_level),
            MetricRecord::Noise(r) => sqlx::query(
                r#"
                INSERT INTO noise_level (location, timestamp, decibel, frequency)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(&r.location)
            .bind(r.timestamp)
            .bind(r.metrics.decibel)
            .bind(r.metrics.frequency),
            MetricRecord::Water(r) => sqlx::query(
                r#"
                INSERT INTO water_quality (location, timestamp, ph, turbidity, dissolved_oxygen, conductivity, temperature)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(&r.location)
            .bind(r.timestamp)
            .bind(r.metrics.ph)
            .bind(r.metrics.turbidity)
            .bind(r.metrics.dissolved_oxygen)
            .bind(r.metrics.conductivity)
            .bind(r.metrics.temperature),
            MetricRecord::Energy(r) => sqlx::query(
                r#"
                INSERT INTO energy_consumption (location, timestamp, consumption, renewable_percentage, peak_demand, grid_frequency)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(&r.location)
            .bind(r.timestamp)
            .bind(r.metrics.consumption)
            .bind(r.metrics.renewable_percentage)
            .bind(r.metrics.peak_demand)
            .bind(r.metrics.grid_frequency),
            MetricRecord::Weather(r) => sqlx::query(
                r#"
                INSERT INTO weather_data (location, timestamp, temperature, humidity, wind_speed, wind_direction, precipitation)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(&r.location)
            .bind(r.timestamp)
            .bind(r.metrics.temperature)
            .bind(r.metrics.humidity)
            .bind(r.metrics.wind_speed)
            .bind(r.metrics.wind_direction)
            .bind(r.metrics.precipitation),
        };

        query.execute(self.pool()).await?;

        debug!("Inserted derived metric record");
        Ok(())
    }

    /// Get the most recent record of a category for a location
    #[instrument(skip(self))]
    pub async fn get_latest_record(
        &self,
        location: &str,
        category: MetricCategory,
    ) -> DbResult<Option<MetricRecord>> {
        let record = match category {
            MetricCategory::AirQuality => sqlx::query_as::<_, AirQualityRow>(
                r#"
                SELECT location, timestamp, aqi, pm25, pm10, o3, co, no2, so2
                FROM air_quality_index
                WHERE location = $1
                ORDER BY timestamp DESC, id DESC
                LIMIT 1
                "#,
            )
            .bind(location)
            .fetch_optional(self.pool())
            .await?
            .map(MetricRecord::from),
            MetricCategory::Traffic => sqlx::query_as::<_, TrafficRow>(
                r#"
                SELECT location, timestamp, density, vehicle_count, average_speed, congestion_level
                FROM traffic_data
                WHERE location = $1
                ORDER BY timestamp DESC, id DESC
                LIMIT 1
                "#,
            )
            .bind(location)
            .fetch_optional(self.pool())
            .await?
            .map(MetricRecord::from),
            MetricCategory::Noise => sqlx::query_as::<_, NoiseRow>(
                r#"
                SELECT location, timestamp, decibel, frequency
                FROM noise_level
                WHERE location = $1
                ORDER BY timestamp DESC, id DESC
                LIMIT 1
                "#,
            )
            .bind(location)
            .fetch_optional(self.pool())
            .await?
            .map(MetricRecord::from),
            MetricCategory::Water => sqlx::query_as::<_, WaterQualityRow>(
                r#"
                SELECT location, timestamp, ph, turbidity, dissolved_oxygen, conductivity, temperature
                FROM water_quality
                WHERE location = $1
                ORDER BY timestamp DESC, id DESC
                LIMIT 1
                "#,
            )
            .bind(location)
            .fetch_optional(self.pool())
            .await?
            .map(MetricRecord::from),
            MetricCategory::Energy => sqlx::query_as::<_, EnergyRow>(
                r#"
                SELECT location, timestamp, consumption, renewable_percentage, peak_demand, grid_frequency
                FROM energy_consumption
                WHERE location = $1
                ORDER BY timestamp DESC, id DESC
                LIMIT 1
                "#,
            )
            .bind(location)
            .fetch_optional(self.pool())
            .await?
            .map(MetricRecord::from),
            MetricCategory::Weather => sqlx::query_as::<_, WeatherRow>(
                r#"
                SELECT location, timestamp, temperature, humidity, wind_speed, wind_direction, precipitation
                FROM weather_data
                WHERE location = $1
                ORDER BY timestamp DESC, id DESC
                LIMIT 1
                "#,
            )
            .bind(location)
            .fetch_optional(self.pool())
            .await?
            .map(MetricRecord::from),
        };

        Ok(record)
    }

    /// Register a sensor and return it with its assigned id
    #[instrument(skip(self, sensor), fields(location = %sensor.location, sensor_type = %sensor.sensor_type))]
    pub async fn insert_sensor(&self, sensor: &NewSensor) -> DbResult<Sensor> {
        let row = sqlx::query(
            r#"
            INSERT INTO sensor (name, location, sensor_type)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&sensor.name)
        .bind(&sensor.location)
        .bind(sensor.sensor_type.as_str())
        .fetch_one(self.pool())
        .await?;

        let id: i64 = row.get("id");
        debug!("Registered sensor {}", id);
        Ok(Sensor {
            id,
            name: sensor.name.clone(),
            location: sensor.location.clone(),
            sensor_type: sensor.sensor_type,
        })
    }

    /// Get a sensor by id
    #[instrument(skip(self))]
    pub async fn get_sensor_by_id(&self, id: i64) -> DbResult<Option<Sensor>> {
        let row = sqlx::query_as::<_, SensorRow>(
            r#"
            SELECT id, name, location, sensor_type FROM sensor WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(Sensor::try_from).transpose()
    }

    /// Insert one raw reading
    #[instrument(skip(self))]
    pub async fn insert_reading(
        &self,
        sensor_id: i64,
        value: f64,
        timestamp: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sensor_reading (sensor_id, value, timestamp)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(sensor_id)
        .bind(value)
        .bind(timestamp)
        .execute(self.pool())
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_foreign_key_violation() => {
                DbError::ConstraintViolation(format!("unknown sensor id {}", sensor_id))
            }
            _ => DbError::Sqlx(e),
        })?;

        Ok(())
    }

    /// Readings from every sensor at a location, oldest first
    ///
    /// Rows whose sensor type is not recognized are skipped.
    #[instrument(skip(self))]
    pub async fn get_readings_for_location(
        &self,
        location: &str,
        since: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<Reading>> {
        let rows = sqlx::query_as::<_, ReadingRow>(
            r#"
            SELECT s.sensor_type, r.value, r.timestamp
            FROM sensor_reading r
            JOIN sensor s ON s.id = r.sensor_id
            WHERE s.location = $1
              AND ($2::timestamptz IS NULL OR r.timestamp >= $2)
            ORDER BY r.timestamp ASC, r.id ASC
            "#,
        )
        .bind(location)
        .bind(since)
        .fetch_all(self.pool())
        .await?;

        let total = rows.len();
        let readings: Vec<Reading> = rows.into_iter().filter_map(ReadingRow::into_reading).collect();
        if readings.len() < total {
            warn!(
                "Skipped {} readings with unrecognized sensor types at {}",
                total - readings.len(),
                location
            );
        }

        debug!("Retrieved {} readings for {}", readings.len(), location);
        Ok(readings)
    }
}
