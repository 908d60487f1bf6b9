//! Table layout and row types
//!
//! One table per derived metric category. Optional metrics are nullable
//! columns; every metric table is indexed on `(location, timestamp DESC)` so
//! the latest record per location is a single index lookup.

use crate::{DbClient, DbError, DbResult};
use chrono::{DateTime, Utc};
use citysense_core::{
    AirQualityMetrics, DerivedRecord, EnergyMetrics, MetricRecord, NoiseMetrics, Reading, Sensor,
    SensorType, TrafficMetrics, WaterQualityMetrics, WeatherMetrics,
};
use sqlx::FromRow;
use tracing::info;

/// Table names
pub mod tables {
    pub const SENSOR: &str = "sensor";
    pub const SENSOR_READING: &str = "sensor_reading";
    pub const AIR_QUALITY: &str = "air_quality_index";
    pub const TRAFFIC: &str = "traffic_data";
    pub const NOISE: &str = "noise_level";
    pub const WATER: &str = "water_quality";
    pub const ENERGY: &str = "energy_consumption";
    pub const WEATHER: &str = "weather_data";
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS sensor (
        id          BIGSERIAL PRIMARY KEY,
        name        VARCHAR(100) NOT NULL,
        location    TEXT NOT NULL,
        sensor_type VARCHAR(50)  NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sensor_reading (
        id        BIGSERIAL PRIMARY KEY,
        sensor_id BIGINT NOT NULL REFERENCES sensor (id),
        value     DOUBLE PRECISION NOT NULL,
        timestamp TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS air_quality_index (
        id        BIGSERIAL PRIMARY KEY,
        location  TEXT NOT NULL,
        timestamp TIMESTAMPTZ NOT NULL DEFAULT now(),
        aqi       DOUBLE PRECISION NOT NULL,
        pm25      DOUBLE PRECISION NOT NULL,
        pm10      DOUBLE PRECISION,
        o3        DOUBLE PRECISION NOT NULL,
        co        DOUBLE PRECISION NOT NULL,
        no2       DOUBLE PRECISION NOT NULL,
        so2       DOUBLE PRECISION NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS traffic_data (
        id               BIGSERIAL PRIMARY KEY,
        location         TEXT NOT NULL,
        timestamp        TIMESTAMPTZ NOT NULL DEFAULT now(),
        density          DOUBLE PRECISION NOT NULL,
        vehicle_count    DOUBLE PRECISION NOT NULL,
        average_speed    DOUBLE PRECISION,
        congestion_level DOUBLE PRECISION
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS noise_level (
        id        BIGSERIAL PRIMARY KEY,
        location  TEXT NOT NULL,
        timestamp TIMESTAMPTZ NOT NULL DEFAULT now(),
        decibel   DOUBLE PRECISION NOT NULL,
        frequency DOUBLE PRECISION
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS water_quality (
        id               BIGSERIAL PRIMARY KEY,
        location         TEXT NOT NULL,
        timestamp        TIMESTAMPTZ NOT NULL DEFAULT now(),
        ph               DOUBLE PRECISION NOT NULL,
        turbidity        DOUBLE PRECISION NOT NULL,
        dissolved_oxygen DOUBLE PRECISION NOT NULL,
        conductivity     DOUBLE PRECISION,
        temperature      DOUBLE PRECISION
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS energy_consumption (
        id                   BIGSERIAL PRIMARY KEY,
        location             TEXT NOT NULL,
        timestamp            TIMESTAMPTZ NOT NULL DEFAULT now(),
        consumption          DOUBLE PRECISION NOT NULL,
        renewable_percentage DOUBLE PRECISION NOT NULL,
        peak_demand          DOUBLE PRECISION,
        grid_frequency       DOUBLE PRECISION
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS weather_data (
        id             BIGSERIAL PRIMARY KEY,
        location       TEXT NOT NULL,
        timestamp      TIMESTAMPTZ NOT NULL DEFAULT now(),
        temperature    DOUBLE PRECISION NOT NULL,
        humidity       DOUBLE PRECISION NOT NULL,
        wind_speed     DOUBLE PRECISION NOT NULL,
        wind_direction DOUBLE PRECISION NOT NULL,
        precipitation  DOUBLE PRECISION NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_sensor_location ON sensor (location)",
    "CREATE INDEX IF NOT EXISTS idx_sensor_reading_sensor_ts ON sensor_reading (sensor_id, timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_air_quality_index_loc_ts ON air_quality_index (location, timestamp DESC)",
    "CREATE INDEX IF NOT EXISTS idx_traffic_data_loc_ts ON traffic_data (location, timestamp DESC)",
    "CREATE INDEX IF NOT EXISTS idx_noise_level_loc_ts ON noise_level (location, timestamp DESC)",
    "CREATE INDEX IF NOT EXISTS idx_water_quality_loc_ts ON water_quality (location, timestamp DESC)",
    "CREATE INDEX IF NOT EXISTS idx_energy_consumption_loc_ts ON energy_consumption (location, timestamp DESC)",
    "CREATE INDEX IF NOT EXISTS idx_weather_data_loc_ts ON weather_data (location, timestamp DESC)",
];

impl DbClient {
    /// Create missing tables and indexes (idempotent)
    pub async fn ensure_schema(&self) -> DbResult<()> {
        let mut tx = self.pool().begin().await?;
        for statement in SCHEMA {
            sqlx::query(*statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        info!("Database schema ensured ({} statements)", SCHEMA.len());
        Ok(())
    }
}

/// Sensor table record
#[derive(Debug, Clone, FromRow)]
pub struct SensorRow {
    pub id: i64,
    pub name: String,
    pub location: String,
    pub sensor_type: String,
}

impl TryFrom<SensorRow> for Sensor {
    type Error = DbError;

    fn try_from(row: SensorRow) -> Result<Self, Self::Error> {
        let sensor_type = row
            .sensor_type
            .parse::<SensorType>()
            .map_err(|e| DbError::InvalidRow(format!("sensor {}: {}", row.id, e)))?;
        Ok(Sensor {
            id: row.id,
            name: row.name,
            location: row.location,
            sensor_type,
        })
    }
}

/// A reading joined with its sensor's type tag
#[derive(Debug, Clone, FromRow)]
pub struct ReadingRow {
    pub sensor_type: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl ReadingRow {
    /// `None` when the sensor type tag is not one the aggregator knows
    pub fn into_reading(self) -> Option<Reading> {
        let sensor_type = self.sensor_type.parse::<SensorType>().ok()?;
        Some(Reading::new(sensor_type, self.value, self.timestamp))
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AirQualityRow {
    pub location: String,
    pub timestamp: DateTime<Utc>,
    pub aqi: f64,
    pub pm25: f64,
    pub pm10: Option<f64>,
    pub o3: f64,
    pub co: f64,
    pub no2: f64,
    pub so2: f64,
}

impl From<AirQualityRow> for MetricRecord {
    fn from(row: AirQualityRow) -> Self {
        MetricRecord::AirQuality(DerivedRecord {
            location: row.location,
            timestamp: row.timestamp,
            metrics: AirQualityMetrics {
                aqi: row.aqi,
                pm25: row.pm25,
                pm10: row.pm10,
                o3: row.o3,
                co: row.co,
                no2: row.no2,
                so2: row.so2,
            },
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TrafficRow {
    pub location: String,
    pub timestamp: DateTime<Utc>,
    pub density: f64,
    pub vehicle_count: f64,
    pub average_speed: Option<f64>,
    pub congestion_level: Option<f64>,
}

impl From<TrafficRow> for MetricRecord {
    fn from(row: TrafficRow) -> Self {
        MetricRecord::Traffic(DerivedRecord {
            location: row.location,
            timestamp: row.timestamp,
            metrics: TrafficMetrics {
                density: row.density,
                vehicle_count: row.vehicle_count,
                average_speed: row.average_speed,
                congestion_level: row.congestion_level,
            },
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct NoiseRow {
    pub location: String,
    pub timestamp: DateTime<Utc>,
    pub decibel: f64,
    pub frequency: Option<f64>,
}

impl From<NoiseRow> for MetricRecord {
    fn from(row: NoiseRow) -> Self {
        MetricRecord::Noise(DerivedRecord {
            location: row.location,
            timestamp: row.timestamp,
            metrics: NoiseMetrics {
                decibel: row.decibel,
                frequency: row.frequency,
            },
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct WaterQualityRow {
    pub location: String,
    pub timestamp: DateTime<Utc>,
    pub ph: f64,
    pub turbidity: f64,
    pub dissolved_oxygen: f64,
    pub conductivity: Option<f64>,
    pub temperature: Option<f64>,
}

impl From<WaterQualityRow> for MetricRecord {
    fn from(row: WaterQualityRow) -> Self {
        MetricRecord::Water(DerivedRecord {
            location: row.location,
            timestamp: row.timestamp,
            metrics: WaterQualityMetrics {
                ph: row.ph,
                turbidity: row.turbidity,
                dissolved_oxygen: row.dissolved_oxygen,
                conductivity: row.conductivity,
                temperature: row.temperature,
            },
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct EnergyRow {
    pub location: String,
    pub timestamp: DateTime<Utc>,
    pub consumption: f64,
    pub renewable_percentage: f64,
    pub peak_demand: Option<f64>,
    pub grid_frequency: Option<f64>,
}

impl From<EnergyRow> for MetricRecord {
    fn from(row: EnergyRow) -> Self {
        MetricRecord::Energy(DerivedRecord {
            location: row.location,
            timestamp: row.timestamp,
            metrics: EnergyMetrics {
                consumption: row.consumption,
                renewable_percentage: row.renewable_percentage,
                peak_demand: row.peak_demand,
                grid_frequency: row.grid_frequency,
            },
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct WeatherRow {
    pub location: String,
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub precipitation: f64,
}

impl From<WeatherRow> for MetricRecord {
    fn from(row: WeatherRow) -> Self {
        MetricRecord::Weather(DerivedRecord {
            location: row.location,
            timestamp: row.timestamp,
            metrics: WeatherMetrics {
                temperature: row.temperature,
                humidity: row.humidity,
                wind_speed: row.wind_speed,
                wind_direction: row.wind_direction,
                precipitation: row.precipitation,
            },
        })
    }
}
