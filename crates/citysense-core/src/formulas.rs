//! Category formulas turning a batch of readings into derived metrics
//!
//! Every `compute_*` function is pure: it filters the batch by the
//! category's sensor types and never touches storage.

use crate::metrics::{
    AirQualityMetrics, EnergyMetrics, NoiseMetrics, TrafficMetrics, WaterQualityMetrics,
    WeatherMetrics,
};
use crate::rollups::Samples;
use crate::types::{
    AirPollutant, EnergySignal, MetricCategory, NoiseSignal, Reading, SensorType, TrafficSignal,
    WaterSignal, WeatherSignal,
};
use crate::{MetricError, MetricResult};

/// Per-pollutant weights of the air quality blend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AqiWeights {
    pub pm25: f64,
    pub pm10: f64,
    pub o3: f64,
    pub co: f64,
    pub no2: f64,
    pub so2: f64,
}

/// Canonical AQI weights.
///
/// PM10 only contributes when present, so without it the blend divides by 20
/// and with it by 25.
pub const AQI_WEIGHTS: AqiWeights = AqiWeights {
    pm25: 5.0,
    pm10: 5.0,
    o3: 5.0,
    co: 4.0,
    no2: 3.0,
    so2: 3.0,
};

pub const AQI_MIN: f64 = 0.0;
pub const AQI_MAX: f64 = 500.0;

/// Vehicles per batch at which a road counts as saturated
pub const ROAD_CAPACITY: f64 = 1000.0;

/// Speed (km/h) treated as uncongested flow
pub const FREE_FLOW_SPEED_KMH: f64 = 60.0;

impl Samples {
    fn require_mean(
        &self,
        category: MetricCategory,
        sensor_type: impl Into<SensorType>,
    ) -> MetricResult<f64> {
        let sensor_type = sensor_type.into();
        self.mean(sensor_type)
            .ok_or(MetricError::InsufficientData {
                category,
                sensor_type,
            })
    }
}

/// Weighted mean of `(value, weight)` pairs.
///
/// Each term is scaled by its normalized weight first so the blend cannot
/// overflow for finite inputs.
fn weighted_mean(terms: &[(f64, f64)]) -> f64 {
    let total: f64 = terms.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return 0.0;
    }
    terms.iter().map(|(v, w)| v * (w / total)).sum()
}

pub fn compute_air_quality(readings: &[Reading]) -> MetricResult<AirQualityMetrics> {
    let category = MetricCategory::AirQuality;
    let samples = Samples::collect(readings);

    let pm25 = samples.require_mean(category, AirPollutant::Pm25)?;
    let o3 = samples.require_mean(category, AirPollutant::O3)?;
    let co = samples.require_mean(category, AirPollutant::Co)?;
    let no2 = samples.require_mean(category, AirPollutant::No2)?;
    let so2 = samples.require_mean(category, AirPollutant::So2)?;
    let pm10 = samples.mean(AirPollutant::Pm10);

    let w = &AQI_WEIGHTS;
    let mut terms = vec![
        (pm25, w.pm25),
        (o3, w.o3),
        (co, w.co),
        (no2, w.no2),
        (so2, w.so2),
    ];
    if let Some(pm10) = pm10 {
        terms.push((pm10, w.pm10));
    }
    let aqi = weighted_mean(&terms).clamp(AQI_MIN, AQI_MAX);

    Ok(AirQualityMetrics {
        aqi,
        pm25,
        pm10,
        o3,
        co,
        no2,
        so2,
    })
}

pub fn compute_traffic(readings: &[Reading]) -> MetricResult<TrafficMetrics> {
    let samples = Samples::collect(readings);

    if samples.count(TrafficSignal::VehicleCounter) == 0 {
        return Err(MetricError::InsufficientData {
            category: MetricCategory::Traffic,
            sensor_type: TrafficSignal::VehicleCounter.into(),
        });
    }

    let vehicle_count = samples.sum(TrafficSignal::VehicleCounter);
    let density = (vehicle_count / ROAD_CAPACITY).clamp(0.0, 1.0);
    let average_speed = samples.mean(TrafficSignal::VehicleSpeed);
    let congestion_level =
        average_speed.map(|speed| (1.0 - speed / FREE_FLOW_SPEED_KMH).clamp(0.0, 1.0));

    Ok(TrafficMetrics {
        density,
        vehicle_count,
        average_speed,
        congestion_level,
    })
}

pub fn compute_noise(readings: &[Reading]) -> MetricResult<NoiseMetrics> {
    let samples = Samples::collect(readings);

    Ok(NoiseMetrics {
        decibel: samples.require_mean(MetricCategory::Noise, NoiseSignal::Decibel)?,
        frequency: samples.mean(NoiseSignal::Frequency),
    })
}

pub fn compute_water_quality(readings: &[Reading]) -> MetricResult<WaterQualityMetrics> {
    let category = MetricCategory::Water;
    let samples = Samples::collect(readings);

    Ok(WaterQualityMetrics {
        ph: samples.require_mean(category, WaterSignal::Ph)?,
        turbidity: samples.require_mean(category, WaterSignal::Turbidity)?,
        dissolved_oxygen: samples.require_mean(category, WaterSignal::DissolvedOxygen)?,
        conductivity: samples.mean(WaterSignal::Conductivity),
        temperature: samples.mean(WaterSignal::Temperature),
    })
}

pub fn compute_energy(readings: &[Reading]) -> MetricResult<EnergyMetrics> {
    let samples = Samples::collect(readings);

    if samples.count(EnergySignal::Consumption) == 0 && samples.count(EnergySignal::Renewable) == 0
    {
        return Err(MetricError::InsufficientData {
            category: MetricCategory::Energy,
            sensor_type: EnergySignal::Consumption.into(),
        });
    }

    let consumption = samples.sum(EnergySignal::Consumption);
    let renewable = samples.sum(EnergySignal::Renewable);
    let total = consumption + renewable;
    let renewable_percentage = if total > 0.0 && total.is_finite() {
        (renewable / total * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };

    Ok(EnergyMetrics {
        consumption,
        renewable_percentage,
        peak_demand: samples.max(EnergySignal::Consumption),
        grid_frequency: samples.mean(EnergySignal::GridFrequency),
    })
}

pub fn compute_weather(readings: &[Reading]) -> MetricResult<WeatherMetrics> {
    let category = MetricCategory::Weather;
    let samples = Samples::collect(readings);

    Ok(WeatherMetrics {
        temperature: samples.require_mean(category, WeatherSignal::Temperature)?,
        humidity: samples.require_mean(category, WeatherSignal::Humidity)?,
        wind_speed: samples.require_mean(category, WeatherSignal::WindSpeed)?,
        wind_direction: samples.require_mean(category, WeatherSignal::WindDirection)?,
        precipitation: samples.sum(WeatherSignal::Precipitation),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, minute, 0).unwrap()
    }

    fn batch(entries: &[(&str, f64)]) -> Vec<Reading> {
        entries
            .iter()
            .enumerate()
            .map(|(i, (tag, value))| Reading {
                sensor_type: tag.parse().unwrap(),
                value: *value,
                timestamp: at(i as u32 % 60),
            })
            .collect()
    }

    fn air_batch(value: f64) -> Vec<Reading> {
        batch(&[
            ("PM2.5", value),
            ("O3", value),
            ("CO", value),
            ("NO2", value),
            ("SO2", value),
        ])
    }

    #[test]
    fn test_aqi_five_pollutant_blend() {
        let readings = batch(&[
            ("PM2.5", 10.0),
            ("PM2.5", 20.0),
            ("O3", 5.0),
            ("CO", 1.0),
            ("NO2", 2.0),
            ("SO2", 1.0),
        ]);
        let m = compute_air_quality(&readings).unwrap();

        assert_eq!(m.pm25, 15.0);
        assert_eq!(m.o3, 5.0);
        assert_eq!(m.co, 1.0);
        assert_eq!(m.no2, 2.0);
        assert_eq!(m.so2, 1.0);
        assert_eq!(m.pm10, None);
        // (15*5 + 5*5 + 1*4 + 2*3 + 1*3) / 20
        assert!((m.aqi - 5.65).abs() < 1e-9, "aqi = {}", m.aqi);
    }

    #[test]
    fn test_aqi_includes_pm10_when_present() {
        let mut readings = air_batch(10.0);
        readings.extend(batch(&[("PM10", 60.0)]));
        let m = compute_air_quality(&readings).unwrap();

        assert_eq!(m.pm10, Some(60.0));
        // (10*20 + 60*5) / 25
        assert!((m.aqi - 20.0).abs() < 1e-9, "aqi = {}", m.aqi);
    }

    #[test]
    fn test_aqi_is_clamped() {
        for value in [-1e6, -1.0, 0.0, 499.0, 501.0, 1e9, f64::MAX, -f64::MAX] {
            let m = compute_air_quality(&air_batch(value)).unwrap();
            assert!(
                (AQI_MIN..=AQI_MAX).contains(&m.aqi),
                "aqi {} out of range for {value}",
                m.aqi
            );
        }

        let m = compute_air_quality(&air_batch(10_000.0)).unwrap();
        assert_eq!(m.aqi, AQI_MAX);
        let m = compute_air_quality(&air_batch(-3.0)).unwrap();
        assert_eq!(m.aqi, AQI_MIN);
    }

    #[test]
    fn test_aqi_missing_pollutant_is_insufficient() {
        let readings = batch(&[("PM2.5", 10.0), ("O3", 5.0), ("CO", 1.0), ("NO2", 2.0)]);
        let err = compute_air_quality(&readings).unwrap_err();

        match err {
            MetricError::InsufficientData {
                category,
                sensor_type,
            } => {
                assert_eq!(category, MetricCategory::AirQuality);
                assert_eq!(sensor_type, SensorType::Air(AirPollutant::So2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_uniform_values_pass_through_exactly() {
        let v = 7.3;
        let readings = batch(&[
            ("noise", v),
            ("noise", v),
            ("noise", v),
            ("pH", v),
            ("pH", v),
            ("turbidity", v),
            ("dissolved_oxygen", v),
            ("temperature", v),
            ("temperature", v),
            ("humidity", v),
            ("wind_speed", v),
            ("wind_direction", v),
        ]);

        assert_eq!(compute_noise(&readings).unwrap().decibel, v);
        let water = compute_water_quality(&readings).unwrap();
        assert_eq!(water.ph, v);
        assert_eq!(water.turbidity, v);
        assert_eq!(water.dissolved_oxygen, v);
        let weather = compute_weather(&readings).unwrap();
        assert_eq!(weather.temperature, v);
        assert_eq!(weather.humidity, v);
        assert_eq!(weather.wind_speed, v);
        assert_eq!(weather.wind_direction, v);
        assert_eq!(weather.precipitation, 0.0);
    }

    #[test]
    fn test_traffic_density_and_congestion() {
        let readings = batch(&[
            ("vehicle_counter", 200.0),
            ("vehicle_counter", 300.0),
            ("vehicle_speed", 30.0),
            ("vehicle_speed", 30.0),
        ]);
        let m = compute_traffic(&readings).unwrap();

        assert_eq!(m.vehicle_count, 500.0);
        assert_eq!(m.density, 0.5);
        assert_eq!(m.average_speed, Some(30.0));
        assert_eq!(m.congestion_level, Some(0.5));
    }

    #[test]
    fn test_traffic_density_is_bounded() {
        for count in [0.0, 999.0, 1000.0, 5_000.0, 1e300, -50.0] {
            let m = compute_traffic(&batch(&[("vehicle_counter", count)])).unwrap();
            assert!((0.0..=1.0).contains(&m.density), "density {}", m.density);
        }
        let m = compute_traffic(&batch(&[("vehicle_counter", 5_000.0)])).unwrap();
        assert_eq!(m.density, 1.0);
    }

    #[test]
    fn test_traffic_without_speed_has_no_congestion() {
        let m = compute_traffic(&batch(&[("vehicle_counter", 10.0)])).unwrap();
        assert_eq!(m.average_speed, None);
        assert_eq!(m.congestion_level, None);

        let fast = compute_traffic(&batch(&[("vehicle_counter", 1.0), ("vehicle_speed", 90.0)]))
            .unwrap();
        assert_eq!(fast.congestion_level, Some(0.0));
    }

    #[test]
    fn test_traffic_requires_counter() {
        let err = compute_traffic(&batch(&[("vehicle_speed", 40.0)])).unwrap_err();
        assert!(matches!(err, MetricError::InsufficientData { .. }));
    }

    #[test]
    fn test_noise_optional_frequency() {
        let m = compute_noise(&batch(&[("noise", 60.0), ("noise", 70.0)])).unwrap();
        assert_eq!(m.decibel, 65.0);
        assert_eq!(m.frequency, None);

        let m = compute_noise(&batch(&[("noise", 60.0), ("noise_frequency", 440.0)])).unwrap();
        assert_eq!(m.frequency, Some(440.0));

        assert!(compute_noise(&batch(&[("noise_frequency", 440.0)])).is_err());
    }

    #[test]
    fn test_water_quality_optional_fields() {
        let readings = batch(&[
            ("pH", 7.0),
            ("pH", 8.0),
            ("turbidity", 1.5),
            ("dissolved_oxygen", 9.0),
            ("conductivity", 250.0),
        ]);
        let m = compute_water_quality(&readings).unwrap();

        assert_eq!(m.ph, 7.5);
        assert_eq!(m.conductivity, Some(250.0));
        assert_eq!(m.temperature, None);
    }

    #[test]
    fn test_energy_renewable_share() {
        let readings = batch(&[
            ("energy_consumption", 40.0),
            ("energy_consumption", 35.0),
            ("renewable_energy", 25.0),
            ("grid_frequency", 50.0),
            ("grid_frequency", 50.2),
        ]);
        let m = compute_energy(&readings).unwrap();

        assert_eq!(m.consumption, 75.0);
        assert_eq!(m.renewable_percentage, 25.0);
        assert_eq!(m.peak_demand, Some(40.0));
        assert!((m.grid_frequency.unwrap() - 50.1).abs() < 1e-9);
    }

    #[test]
    fn test_energy_zero_total_reports_zero_percent() {
        let readings = batch(&[("energy_consumption", 0.0), ("renewable_energy", 0.0)]);
        let m = compute_energy(&readings).unwrap();

        assert_eq!(m.renewable_percentage, 0.0);
        assert_eq!(m.consumption, 0.0);
    }

    #[test]
    fn test_energy_renewable_only() {
        let m = compute_energy(&batch(&[("renewable_energy", 12.0)])).unwrap();
        assert_eq!(m.consumption, 0.0);
        assert_eq!(m.renewable_percentage, 100.0);
        assert_eq!(m.peak_demand, None);
    }

    #[test]
    fn test_energy_requires_some_meter() {
        let err = compute_energy(&batch(&[("grid_frequency", 50.0)])).unwrap_err();
        assert!(matches!(
            err,
            MetricError::InsufficientData {
                category: MetricCategory::Energy,
                ..
            }
        ));
    }

    #[test]
    fn test_weather_precipitation_is_summed() {
        let readings = batch(&[
            ("temperature", 20.0),
            ("temperature", 22.0),
            ("humidity", 55.0),
            ("wind_speed", 3.0),
            ("wind_direction", 180.0),
            ("precipitation", 1.5),
            ("precipitation", 2.5),
        ]);
        let m = compute_weather(&readings).unwrap();

        assert_eq!(m.temperature, 21.0);
        assert_eq!(m.precipitation, 4.0);
    }

    #[test]
    fn test_empty_batch_is_insufficient_everywhere() {
        assert!(compute_air_quality(&[]).is_err());
        assert!(compute_traffic(&[]).is_err());
        assert!(compute_noise(&[]).is_err());
        assert!(compute_water_quality(&[]).is_err());
        assert!(compute_energy(&[]).is_err());
        assert!(compute_weather(&[]).is_err());
    }

    #[test]
    fn test_non_finite_values_are_ignored() {
        let readings = batch(&[("noise", f64::NAN), ("noise", 50.0), ("noise", f64::INFINITY)]);
        assert_eq!(compute_noise(&readings).unwrap().decibel, 50.0);

        let only_nan = batch(&[("noise", f64::NAN)]);
        assert!(compute_noise(&only_nan).is_err());
    }
}
