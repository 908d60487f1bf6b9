//! Derived metric records, one type per category

use crate::types::MetricCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Air quality index and the pollutant means it was blended from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AirQualityMetrics {
    /// Composite index, always within [0, 500]
    pub aqi: f64,
    pub pm25: f64,
    pub pm10: Option<f64>,
    pub o3: f64,
    pub co: f64,
    pub no2: f64,
    pub so2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrafficMetrics {
    /// Share of road capacity in use, within [0, 1]
    pub density: f64,
    pub vehicle_count: f64,
    /// Mean vehicle speed (km/h)
    pub average_speed: Option<f64>,
    /// 0 at free-flow speed, 1 at standstill
    pub congestion_level: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseMetrics {
    pub decibel: f64,
    pub frequency: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterQualityMetrics {
    pub ph: f64,
    pub turbidity: f64,
    pub dissolved_oxygen: f64,
    pub conductivity: Option<f64>,
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyMetrics {
    /// Total consumption (kWh)
    pub consumption: f64,
    /// Renewable share of consumption plus generation, within [0, 100]
    pub renewable_percentage: f64,
    /// Largest single consumption reading (kW)
    pub peak_demand: Option<f64>,
    pub grid_frequency: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherMetrics {
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub wind_direction: f64,
    /// Total precipitation (mm)
    pub precipitation: f64,
}

/// Category-specific metrics that can be stamped into a record
pub trait CategoryMetrics: Copy + Send + Sync + 'static {
    const CATEGORY: MetricCategory;

    fn into_record(self, location: String, timestamp: DateTime<Utc>) -> MetricRecord;
}

macro_rules! category_metrics {
    ($metrics:ty, $category:ident) => {
        impl CategoryMetrics for $metrics {
            const CATEGORY: MetricCategory = MetricCategory::$category;

            fn into_record(self, location: String, timestamp: DateTime<Utc>) -> MetricRecord {
                MetricRecord::$category(DerivedRecord {
                    location,
                    timestamp,
                    metrics: self,
                })
            }
        }
    };
}

category_metrics!(AirQualityMetrics, AirQuality);
category_metrics!(TrafficMetrics, Traffic);
category_metrics!(NoiseMetrics, Noise);
category_metrics!(WaterQualityMetrics, Water);
category_metrics!(EnergyMetrics, Energy);
category_metrics!(WeatherMetrics, Weather);

/// A persisted aggregate for one location at one computation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedRecord<M> {
    pub location: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub metrics: M,
}

pub type AirQualityRecord = DerivedRecord<AirQualityMetrics>;
pub type TrafficRecord = DerivedRecord<TrafficMetrics>;
pub type NoiseRecord = DerivedRecord<NoiseMetrics>;
pub type WaterQualityRecord = DerivedRecord<WaterQualityMetrics>;
pub type EnergyRecord = DerivedRecord<EnergyMetrics>;
pub type WeatherRecord = DerivedRecord<WeatherMetrics>;

/// Any derived metric record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum MetricRecord {
    AirQuality(AirQualityRecord),
    Traffic(TrafficRecord),
    Noise(NoiseRecord),
    Water(WaterQualityRecord),
    Energy(EnergyRecord),
    Weather(WeatherRecord),
}

impl MetricRecord {
    pub fn category(&self) -> MetricCategory {
        match self {
            MetricRecord::AirQuality(_) => MetricCategory::AirQuality,
            MetricRecord::Traffic(_) => MetricCategory::Traffic,
            MetricRecord::Noise(_) => MetricCategory::Noise,
            MetricRecord::Water(_) => MetricCategory::Water,
            MetricRecord::Energy(_) => MetricCategory::Energy,
            MetricRecord::Weather(_) => MetricCategory::Weather,
        }
    }

    pub fn location(&self) -> &str {
        match self {
            MetricRecord::AirQuality(r) => &r.location,
            MetricRecord::Traffic(r) => &r.location,
            MetricRecord::Noise(r) => &r.location,
            MetricRecord::Water(r) => &r.location,
            MetricRecord::Energy(r) => &r.location,
            MetricRecord::Weather(r) => &r.location,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            MetricRecord::AirQuality(r) => r.timestamp,
            MetricRecord::Traffic(r) => r.timestamp,
            MetricRecord::Noise(r) => r.timestamp,
            MetricRecord::Water(r) => r.timestamp,
            MetricRecord::Energy(r) => r.timestamp,
            MetricRecord::Weather(r) => r.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_into_record_carries_category() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let record = NoiseMetrics {
            decibel: 61.0,
            frequency: None,
        }
        .into_record("harbor".to_string(), ts);

        assert_eq!(record.category(), MetricCategory::Noise);
        assert_eq!(record.location(), "harbor");
        assert_eq!(record.timestamp(), ts);
    }

    #[test]
    fn test_record_serializes_flat_with_category_tag() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let record = TrafficMetrics {
            density: 0.5,
            vehicle_count: 500.0,
            average_speed: Some(30.0),
            congestion_level: Some(0.5),
        }
        .into_record("main-st".to_string(), ts);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["category"], "traffic");
        assert_eq!(json["location"], "main-st");
        assert_eq!(json["density"], 0.5);
        assert_eq!(json["congestion_level"], 0.5);
    }
}
