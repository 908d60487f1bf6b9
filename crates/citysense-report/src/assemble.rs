//! Report assembly and the row layout shared by every renderer

use crate::{ReportError, ReportResult};
use chrono::NaiveDate;
use citysense_core::{
    AirQualityRecord, EnergyRecord, MetricCategory, MetricRecord, MetricStore, NoiseRecord,
    TrafficRecord, WaterQualityRecord, WeatherRecord,
};
use tracing::{debug, instrument};

/// Latest record of every category for one location
#[derive(Debug, Clone, PartialEq)]
pub struct DailyReport {
    pub location: String,
    pub date: NaiveDate,
    pub air: AirQualityRecord,
    pub traffic: TrafficRecord,
    pub noise: NoiseRecord,
    pub water: WaterQualityRecord,
    pub energy: EnergyRecord,
    pub weather: WeatherRecord,
}

/// One labelled value of a report section
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSection {
    pub category: MetricCategory,
    pub rows: Vec<ReportRow>,
}

/// Fetch the latest record per category.
///
/// Every category must have at least one record; otherwise the error lists all
/// of the missing ones.
#[instrument(skip(store))]
pub async fn assemble(
    store: &dyn MetricStore,
    location: &str,
    date: NaiveDate,
) -> ReportResult<DailyReport> {
    let mut air = None;
    let mut traffic = None;
    let mut noise = None;
    let mut water = None;
    let mut energy = None;
    let mut weather = None;

    for category in MetricCategory::ALL {
        let latest = store
            .latest(location, category)
            .await
            .map_err(ReportError::Storage)?;

        match latest {
            Some(MetricRecord::AirQuality(r)) if category == MetricCategory::AirQuality => {
                air = Some(r)
            }
            Some(MetricRecord::Traffic(r)) if category == MetricCategory::Traffic => {
                traffic = Some(r)
            }
            Some(MetricRecord::Noise(r)) if category == MetricCategory::Noise => noise = Some(r),
            Some(MetricRecord::Water(r)) if category == MetricCategory::Water => water = Some(r),
            Some(MetricRecord::Energy(r)) if category == MetricCategory::Energy => {
                energy = Some(r)
            }
            Some(MetricRecord::Weather(r)) if category == MetricCategory::Weather => {
                weather = Some(r)
            }
            _ => debug!(%category, "No record"),
        }
    }

    match (air, traffic, noise, water, energy, weather) {
        (Some(air), Some(traffic), Some(noise), Some(water), Some(energy), Some(weather)) => {
            Ok(DailyReport {
                location: location.to_string(),
                date,
                air,
                traffic,
                noise,
                water,
                energy,
                weather,
            })
        }
        (air, traffic, noise, water, energy, weather) => {
            let present = [
                air.is_some(),
                traffic.is_some(),
                noise.is_some(),
                water.is_some(),
                energy.is_some(),
                weather.is_some(),
            ];
            let missing = MetricCategory::ALL
                .into_iter()
                .zip(present)
                .filter(|(_, present)| !present)
                .map(|(category, _)| category)
                .collect();

            Err(ReportError::Incomplete {
                location: location.to_string(),
                missing,
            })
        }
    }
}

fn row(label: &'static str, value: f64, unit: &str) -> ReportRow {
    ReportRow {
        label,
        value: format!("{:.2}{}", value, unit),
    }
}

fn optional_row(label: &'static str, value: Option<f64>, unit: &str) -> ReportRow {
    match value {
        Some(v) => row(label, v, unit),
        None => ReportRow {
            label,
            value: "n/a".to_string(),
        },
    }
}

impl DailyReport {
    /// "Daily Report for <location> - <YYYY-MM-DD>"
    pub fn title(&self) -> String {
        format!(
            "Daily Report for {} - {}",
            self.location,
            self.date.format("%Y-%m-%d")
        )
    }

    /// Sections in category order
    pub fn sections(&self) -> Vec<ReportSection> {
        let air = &self.air.metrics;
        let traffic = &self.traffic.metrics;
        let noise = &self.noise.metrics;
        let water = &self.water.metrics;
        let energy = &self.energy.metrics;
        let weather = &self.weather.metrics;

        vec![
            ReportSection {
                category: MetricCategory::AirQuality,
                rows: vec![
                    row("AQI", air.aqi, ""),
                    row("PM2.5", air.pm25, ""),
                    optional_row("PM10", air.pm10, ""),
                    row("O3", air.o3, ""),
                    row("CO", air.co, ""),
                    row("NO2", air.no2, ""),
                    row("SO2", air.so2, ""),
                ],
            },
            ReportSection {
                category: MetricCategory::Traffic,
                rows: vec![
                    row("Density", traffic.density, ""),
                    row("Vehicle Count", traffic.vehicle_count, ""),
                    optional_row("Average Speed", traffic.average_speed, " km/h"),
                    optional_row("Congestion Level", traffic.congestion_level, ""),
                ],
            },
            ReportSection {
                category: MetricCategory::Noise,
                rows: vec![
                    row("Decibel", noise.decibel, " dB"),
                    optional_row("Frequency", noise.frequency, " Hz"),
                ],
            },
            ReportSection {
                category: MetricCategory::Water,
                rows: vec![
                    row("pH", water.ph, ""),
                    row("Turbidity", water.turbidity, " NTU"),
                    row("Dissolved Oxygen", water.dissolved_oxygen, " mg/L"),
                    optional_row("Conductivity", water.conductivity, " µS/cm"),
                    optional_row("Temperature", water.temperature, " °C"),
                ],
            },
            ReportSection {
                category: MetricCategory::Energy,
                rows: vec![
                    row("Total Consumption", energy.consumption, " kWh"),
                    row("Renewable Percentage", energy.renewable_percentage, "%"),
                    optional_row("Peak Demand", energy.peak_demand, " kW"),
                    optional_row("Grid Frequency", energy.grid_frequency, " Hz"),
                ],
            },
            ReportSection {
                category: MetricCategory::Weather,
                rows: vec![
                    row("Temperature", weather.temperature, " °C"),
                    row("Humidity", weather.humidity, "%"),
                    row("Wind Speed", weather.wind_speed, " m/s"),
                    row("Wind Direction", weather.wind_direction, "°"),
                    row("Precipitation", weather.precipitation, " mm"),
                ],
            },
        ]
    }
}
