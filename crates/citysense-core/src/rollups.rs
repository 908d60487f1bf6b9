//! Aggregation primitives over filtered reading values

use crate::types::{Reading, SensorType};
use std::collections::HashMap;

/// Aggregation type for a reading subset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateType {
    Max,
    Sum,
    Avg,
}

/// Accumulator for calculating aggregates over multiple observations
///
/// Non-finite values are dropped on insertion.
#[derive(Debug, Clone)]
pub struct Accumulator {
    observations: Vec<f64>,
    aggregate_type: AggregateType,
}

impl Accumulator {
    pub fn new(aggregate_type: AggregateType) -> Self {
        Self {
            observations: Vec::new(),
            aggregate_type,
        }
    }

    pub fn add(&mut self, value: f64) {
        if value.is_finite() {
            self.observations.push(value);
        }
    }

    /// Aggregate of everything added so far, `None` when nothing was added
    pub fn result(&self) -> Option<f64> {
        if self.observations.is_empty() {
            return None;
        }

        match self.aggregate_type {
            AggregateType::Max => Some(
                self.observations
                    .iter()
                    .copied()
                    .fold(f64::NEG_INFINITY, f64::max),
            ),
            AggregateType::Sum => Some(self.observations.iter().sum()),
            AggregateType::Avg => mean(&self.observations),
        }
    }
}

impl Extend<f64> for Accumulator {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}

/// Arithmetic mean of `values`, `None` for an empty slice.
///
/// Uses a running mean so a uniform series averages back to exactly its value.
/// Falls back to summing pre-divided terms if the running mean overflows.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut running = 0.0;
    for (i, value) in values.iter().enumerate() {
        running += (value - running) / (i + 1) as f64;
    }
    if running.is_finite() {
        return Some(running);
    }

    let n = values.len() as f64;
    Some(values.iter().map(|v| v / n).sum())
}

/// Finite values of every reading with the given sensor type, in input order
pub fn values_of(readings: &[Reading], sensor_type: SensorType) -> Vec<f64> {
    readings
        .iter()
        .filter(|r| r.sensor_type == sensor_type && r.value.is_finite())
        .map(|r| r.value)
        .collect()
}

/// Reading values grouped by sensor type
#[derive(Debug, Clone, Default)]
pub struct Samples {
    by_type: HashMap<SensorType, Vec<f64>>,
}

impl Samples {
    /// Group finite reading values by sensor type, preserving input order
    pub fn collect(readings: &[Reading]) -> Self {
        let mut by_type: HashMap<SensorType, Vec<f64>> = HashMap::new();
        for reading in readings.iter().filter(|r| r.value.is_finite()) {
            by_type
                .entry(reading.sensor_type)
                .or_default()
                .push(reading.value);
        }
        Self { by_type }
    }

    pub fn values(&self, sensor_type: impl Into<SensorType>) -> &[f64] {
        self.by_type
            .get(&sensor_type.into())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn aggregate(
        &self,
        sensor_type: impl Into<SensorType>,
        aggregate_type: AggregateType,
    ) -> Option<f64> {
        let mut acc = Accumulator::new(aggregate_type);
        acc.extend(self.values(sensor_type).iter().copied());
        acc.result()
    }

    pub fn mean(&self, sensor_type: impl Into<SensorType>) -> Option<f64> {
        self.aggregate(sensor_type, AggregateType::Avg)
    }

    /// Sum of matching values; 0 when there are none
    pub fn sum(&self, sensor_type: impl Into<SensorType>) -> f64 {
        self.aggregate(sensor_type, AggregateType::Sum)
            .unwrap_or(0.0)
    }

    pub fn max(&self, sensor_type: impl Into<SensorType>) -> Option<f64> {
        self.aggregate(sensor_type, AggregateType::Max)
    }

    pub fn count(&self, sensor_type: impl Into<SensorType>) -> usize {
        self.values(sensor_type).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AirPollutant, EnergySignal};
    use chrono::Utc;

    #[test]
    fn test_accumulator_max() {
        let mut acc = Accumulator::new(AggregateType::Max);
        acc.add(10.0);
        acc.add(5.0);
        acc.add(15.0);
        assert_eq!(acc.result(), Some(15.0));
    }

    #[test]
    fn test_accumulator_avg() {
        let mut acc = Accumulator::new(AggregateType::Avg);
        acc.add(10.0);
        acc.add(20.0);
        acc.add(30.0);
        assert_eq!(acc.result(), Some(20.0));
    }

    #[test]
    fn test_accumulator_sum() {
        let mut acc = Accumulator::new(AggregateType::Sum);
        acc.add(10.0);
        acc.add(20.0);
        acc.add(30.0);
        assert_eq!(acc.result(), Some(60.0));
    }

    #[test]
    fn test_accumulator_empty() {
        let acc = Accumulator::new(AggregateType::Avg);
        assert_eq!(acc.result(), None);
    }

    #[test]
    fn test_accumulator_drops_non_finite() {
        let mut acc = Accumulator::new(AggregateType::Avg);
        acc.add(f64::NAN);
        acc.add(4.0);
        acc.add(f64::INFINITY);
        assert_eq!(acc.result(), Some(4.0));

        let mut acc = Accumulator::new(AggregateType::Sum);
        acc.extend([f64::NEG_INFINITY, 1.5, f64::NAN, 2.5]);
        assert_eq!(acc.result(), Some(4.0));
    }

    #[test]
    fn test_mean_of_uniform_values_is_exact() {
        for v in [0.1, 1.0 / 3.0, 7.77, -42.125, 1e300] {
            for n in 1..=25 {
                let values = vec![v; n];
                assert_eq!(mean(&values), Some(v), "value {v} x{n}");
            }
        }
    }

    #[test]
    fn test_mean_survives_extreme_values() {
        let m = mean(&[f64::MAX, -f64::MAX, f64::MAX]).unwrap();
        assert!(m.is_finite());
        assert!(m > 0.0);
    }

    #[test]
    fn test_samples_grouping() {
        let now = Utc::now();
        let readings = vec![
            Reading::new(AirPollutant::Pm25, 10.0, now),
            Reading::new(EnergySignal::Consumption, 3.0, now),
            Reading::new(AirPollutant::Pm25, 20.0, now),
            Reading::new(EnergySignal::Consumption, f64::NAN, now),
            Reading::new(EnergySignal::Consumption, 5.0, now),
        ];
        let samples = Samples::collect(&readings);

        assert_eq!(samples.values(AirPollutant::Pm25), &[10.0, 20.0]);
        assert_eq!(samples.mean(AirPollutant::Pm25), Some(15.0));
        assert_eq!(samples.sum(EnergySignal::Consumption), 8.0);
        assert_eq!(samples.max(EnergySignal::Consumption), Some(5.0));
        assert_eq!(samples.count(EnergySignal::Renewable), 0);
        assert_eq!(samples.sum(EnergySignal::Renewable), 0.0);
        assert_eq!(samples.mean(AirPollutant::O3), None);
    }

    #[test]
    fn test_values_of_filters_by_type() {
        let now = Utc::now();
        let readings = vec![
            Reading::new(AirPollutant::Co, 1.0, now),
            Reading::new(AirPollutant::No2, 2.0, now),
            Reading::new(AirPollutant::Co, 3.0, now),
        ];
        assert_eq!(
            values_of(&readings, AirPollutant::Co.into()),
            vec![1.0, 3.0]
        );
    }
}
