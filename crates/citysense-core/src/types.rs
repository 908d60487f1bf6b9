//! Core data types for sensors and their readings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sensor type parsing error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SensorTypeError {
    #[error("Unknown sensor type: {0}")]
    Unknown(String),

    #[error("Unknown metric category: {0}")]
    UnknownCategory(String),
}

/// Declares a closed set of sensor tags for one category.
///
/// Tags are matched case-sensitively; anything else is not a member.
macro_rules! sensor_tags {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $tag:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Wire tag for this sensor type
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $tag),+
                }
            }

            fn from_tag(tag: &str) -> Option<Self> {
                match tag {
                    $($tag => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

sensor_tags! {
    /// Air pollutant concentration sensors
    AirPollutant {
        Pm25 => "PM2.5",
        Pm10 => "PM10",
        O3 => "O3",
        Co => "CO",
        No2 => "NO2",
        So2 => "SO2",
    }
}

sensor_tags! {
    /// Road traffic sensors
    TrafficSignal {
        VehicleCounter => "vehicle_counter",
        VehicleSpeed => "vehicle_speed",
    }
}

sensor_tags! {
    /// Acoustic sensors
    NoiseSignal {
        Decibel => "noise",
        Frequency => "noise_frequency",
    }
}

sensor_tags! {
    /// Water quality probes
    WaterSignal {
        Ph => "pH",
        Turbidity => "turbidity",
        DissolvedOxygen => "dissolved_oxygen",
        Conductivity => "conductivity",
        Temperature => "water_temperature",
    }
}

sensor_tags! {
    /// Grid and generation meters
    EnergySignal {
        Consumption => "energy_consumption",
        Renewable => "renewable_energy",
        GridFrequency => "grid_frequency",
    }
}

sensor_tags! {
    /// Weather station instruments
    WeatherSignal {
        Temperature => "temperature",
        Humidity => "humidity",
        WindSpeed => "wind_speed",
        WindDirection => "wind_direction",
        Precipitation => "precipitation",
    }
}

/// Every sensor type the aggregator recognizes, grouped by category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SensorType {
    Air(AirPollutant),
    Traffic(TrafficSignal),
    Noise(NoiseSignal),
    Water(WaterSignal),
    Energy(EnergySignal),
    Weather(WeatherSignal),
}

impl SensorType {
    pub fn as_str(self) -> &'static str {
        match self {
            SensorType::Air(t) => t.as_str(),
            SensorType::Traffic(t) => t.as_str(),
            SensorType::Noise(t) => t.as_str(),
            SensorType::Water(t) => t.as_str(),
            SensorType::Energy(t) => t.as_str(),
            SensorType::Weather(t) => t.as_str(),
        }
    }

    /// Metric category this sensor feeds
    pub fn category(self) -> MetricCategory {
        match self {
            SensorType::Air(_) => MetricCategory::AirQuality,
            SensorType::Traffic(_) => MetricCategory::Traffic,
            SensorType::Noise(_) => MetricCategory::Noise,
            SensorType::Water(_) => MetricCategory::Water,
            SensorType::Energy(_) => MetricCategory::Energy,
            SensorType::Weather(_) => MetricCategory::Weather,
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorType {
    type Err = SensorTypeError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        AirPollutant::from_tag(tag)
            .map(SensorType::Air)
            .or_else(|| TrafficSignal::from_tag(tag).map(SensorType::Traffic))
            .or_else(|| NoiseSignal::from_tag(tag).map(SensorType::Noise))
            .or_else(|| WaterSignal::from_tag(tag).map(SensorType::Water))
            .or_else(|| EnergySignal::from_tag(tag).map(SensorType::Energy))
            .or_else(|| WeatherSignal::from_tag(tag).map(SensorType::Weather))
            .ok_or_else(|| SensorTypeError::Unknown(tag.to_string()))
    }
}

impl TryFrom<String> for SensorType {
    type Error = SensorTypeError;

    fn try_from(tag: String) -> Result<Self, Self::Error> {
        tag.parse()
    }
}

impl From<SensorType> for String {
    fn from(sensor_type: SensorType) -> Self {
        sensor_type.as_str().to_string()
    }
}

impl From<AirPollutant> for SensorType {
    fn from(t: AirPollutant) -> Self {
        SensorType::Air(t)
    }
}

impl From<TrafficSignal> for SensorType {
    fn from(t: TrafficSignal) -> Self {
        SensorType::Traffic(t)
    }
}

impl From<NoiseSignal> for SensorType {
    fn from(t: NoiseSignal) -> Self {
        SensorType::Noise(t)
    }
}

impl From<WaterSignal> for SensorType {
    fn from(t: WaterSignal) -> Self {
        SensorType::Water(t)
    }
}

impl From<EnergySignal> for SensorType {
    fn from(t: EnergySignal) -> Self {
        SensorType::Energy(t)
    }
}

impl From<WeatherSignal> for SensorType {
    fn from(t: WeatherSignal) -> Self {
        SensorType::Weather(t)
    }
}

/// Derived metric category (one persisted record type each)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    AirQuality,
    Traffic,
    Noise,
    Water,
    Energy,
    Weather,
}

impl MetricCategory {
    pub const ALL: [MetricCategory; 6] = [
        MetricCategory::AirQuality,
        MetricCategory::Traffic,
        MetricCategory::Noise,
        MetricCategory::Water,
        MetricCategory::Energy,
        MetricCategory::Weather,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricCategory::AirQuality => "air_quality",
            MetricCategory::Traffic => "traffic",
            MetricCategory::Noise => "noise",
            MetricCategory::Water => "water",
            MetricCategory::Energy => "energy",
            MetricCategory::Weather => "weather",
        }
    }

    /// Human readable section title
    pub fn title(self) -> &'static str {
        match self {
            MetricCategory::AirQuality => "Air Quality",
            MetricCategory::Traffic => "Traffic",
            MetricCategory::Noise => "Noise Level",
            MetricCategory::Water => "Water Quality",
            MetricCategory::Energy => "Energy Consumption",
            MetricCategory::Weather => "Weather",
        }
    }
}

impl fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricCategory {
    type Err = SensorTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| SensorTypeError::UnknownCategory(s.to_string()))
    }
}

/// A single sensor observation, already joined with its sensor's type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub sensor_type: SensorType,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    pub fn new(sensor_type: impl Into<SensorType>, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            sensor_type: sensor_type.into(),
            value,
            timestamp,
        }
    }
}

/// Physical or logical source of readings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: i64,
    pub name: String,
    pub location: String,
    pub sensor_type: SensorType,
}

/// Sensor registration request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSensor {
    pub name: String,
    pub location: String,
    pub sensor_type: SensorType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_type_tags_round_trip() {
        for tag in ["PM2.5", "vehicle_speed", "noise", "pH", "grid_frequency", "precipitation"] {
            let parsed: SensorType = tag.parse().unwrap();
            assert_eq!(parsed.as_str(), tag);
        }
    }

    #[test]
    fn test_sensor_type_matching_is_case_sensitive() {
        assert_eq!(
            "pm2.5".parse::<SensorType>(),
            Err(SensorTypeError::Unknown("pm2.5".to_string()))
        );
        assert!("PH".parse::<SensorType>().is_err());
        assert!("Noise".parse::<SensorType>().is_err());
    }

    #[test]
    fn test_sensor_type_category() {
        assert_eq!(
            SensorType::from(AirPollutant::So2).category(),
            MetricCategory::AirQuality
        );
        assert_eq!(
            SensorType::from(WaterSignal::Temperature).category(),
            MetricCategory::Water
        );
        assert_eq!(
            "temperature".parse::<SensorType>().unwrap().category(),
            MetricCategory::Weather
        );
    }

    #[test]
    fn test_reading_serde() {
        let json = r#"{"sensor_type":"O3","value":41.5,"timestamp":"2024-05-01T12:00:00Z"}"#;
        let reading: Reading = serde_json::from_str(json).unwrap();

        assert_eq!(reading.sensor_type, SensorType::Air(AirPollutant::O3));
        assert_eq!(reading.value, 41.5);

        let bad = r#"{"sensor_type":"radon","value":1.0,"timestamp":"2024-05-01T12:00:00Z"}"#;
        assert!(serde_json::from_str::<Reading>(bad).is_err());
    }

    #[test]
    fn test_metric_category_parse() {
        assert_eq!(
            "air_quality".parse::<MetricCategory>().unwrap(),
            MetricCategory::AirQuality
        );
        assert!("air".parse::<MetricCategory>().is_err());
    }
}
