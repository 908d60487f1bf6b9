//! Compute-and-persist operations, one per metric category

use chrono::Utc;
use citysense_core::{
    compute_air_quality, compute_energy, compute_noise, compute_traffic, compute_water_quality,
    compute_weather, AirQualityRecord, CategoryMetrics, DerivedRecord, EnergyRecord,
    MetricCategory, MetricError, MetricRecord, MetricResult, MetricStore, NoiseRecord, Reading,
    TrafficRecord, WaterQualityRecord, WeatherRecord,
};
use tracing::{debug, info, instrument, warn};

/// Stamp freshly computed metrics and write them through the gateway
async fn persist<M: CategoryMetrics>(
    store: &dyn MetricStore,
    location: &str,
    metrics: M,
) -> MetricResult<DerivedRecord<M>> {
    let timestamp = Utc::now();
    let record = metrics.into_record(location.to_string(), timestamp);

    store
        .store(&record)
        .await
        .map_err(|source| MetricError::Storage {
            category: M::CATEGORY,
            source,
        })?;

    info!(category = %M::CATEGORY, %location, "Derived metric record stored");
    Ok(DerivedRecord {
        location: location.to_string(),
        timestamp,
        metrics,
    })
}

#[instrument(skip(store, readings), fields(readings = readings.len()))]
pub async fn update_air_quality(
    store: &dyn MetricStore,
    location: &str,
    readings: &[Reading],
) -> MetricResult<AirQualityRecord> {
    persist(store, location, compute_air_quality(readings)?).await
}

#[instrument(skip(store, readings), fields(readings = readings.len()))]
pub async fn update_traffic(
    store: &dyn MetricStore,
    location: &str,
    readings: &[Reading],
) -> MetricResult<TrafficRecord> {
    persist(store, location, compute_traffic(readings)?).await
}

#[instrument(skip(store, readings), fields(readings = readings.len()))]
pub async fn update_noise(
    store: &dyn MetricStore,
    location: &str,
    readings: &[Reading],
) -> MetricResult<NoiseRecord> {
    persist(store, location, compute_noise(readings)?).await
}

#[instrument(skip(store, readings), fields(readings = readings.len()))]
pub async fn update_water_quality(
    store: &dyn MetricStore,
    location: &str,
    readings: &[Reading],
) -> MetricResult<WaterQualityRecord> {
    persist(store, location, compute_water_quality(readings)?).await
}

#[instrument(skip(store, readings), fields(readings = readings.len()))]
pub async fn update_energy(
    store: &dyn MetricStore,
    location: &str,
    readings: &[Reading],
) -> MetricResult<EnergyRecord> {
    persist(store, location, compute_energy(readings)?).await
}

#[instrument(skip(store, readings), fields(readings = readings.len()))]
pub async fn update_weather(
    store: &dyn MetricStore,
    location: &str,
    readings: &[Reading],
) -> MetricResult<WeatherRecord> {
    persist(store, location, compute_weather(readings)?).await
}

/// Run the update for a single category
pub async fn update_category(
    store: &dyn MetricStore,
    category: MetricCategory,
    location: &str,
    readings: &[Reading],
) -> MetricResult<MetricRecord> {
    match category {
        MetricCategory::AirQuality => update_air_quality(store, location, readings)
            .await
            .map(MetricRecord::AirQuality),
        MetricCategory::Traffic => update_traffic(store, location, readings)
            .await
            .map(MetricRecord::Traffic),
        MetricCategory::Noise => update_noise(store, location, readings)
            .await
            .map(MetricRecord::Noise),
        MetricCategory::Water => update_water_quality(store, location, readings)
            .await
            .map(MetricRecord::Water),
        MetricCategory::Energy => update_energy(store, location, readings)
            .await
            .map(MetricRecord::Energy),
        MetricCategory::Weather => update_weather(store, location, readings)
            .await
            .map(MetricRecord::Weather),
    }
}

/// Result of one category within a batch update
#[derive(Debug)]
pub struct CategoryOutcome {
    pub category: MetricCategory,
    pub result: MetricResult<MetricRecord>,
}

impl CategoryOutcome {
    pub fn is_stored(&self) -> bool {
        self.result.is_ok()
    }
}

/// Update every category from the same batch.
///
/// Categories are independent: a failure in one is reported in its outcome
/// and the remaining categories are still computed and stored.
#[instrument(skip(store, readings), fields(readings = readings.len()))]
pub async fn update_all(
    store: &dyn MetricStore,
    location: &str,
    readings: &[Reading],
) -> Vec<CategoryOutcome> {
    let mut outcomes = Vec::with_capacity(MetricCategory::ALL.len());

    for category in MetricCategory::ALL {
        let result = update_category(store, category, location, readings).await;
        match &result {
            Ok(_) => debug!(%category, "Category updated"),
            Err(e @ MetricError::InsufficientData { .. }) => debug!(%category, "Skipped: {}", e),
            Err(e) => warn!(%category, error = %e, "Category update failed"),
        }
        outcomes.push(CategoryOutcome { category, result });
    }

    let stored = outcomes.iter().filter(|o| o.is_stored()).count();
    info!(%location, stored, total = outcomes.len(), "Batch update finished");
    outcomes
}
