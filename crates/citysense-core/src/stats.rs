//! Outlier detection and cross-sensor correlation

use crate::rollups::{mean, values_of};
use crate::types::{Reading, SensorType};
use chrono::{DateTime, Utc};

/// |z| above which a value is reported as an anomaly
pub const ANOMALY_Z_THRESHOLD: f64 = 3.0;

/// Values of `sensor_type` whose z-score magnitude exceeds [`ANOMALY_Z_THRESHOLD`].
///
/// Flagged raw values come back in input order.
pub fn detect_anomalies(readings: &[Reading], sensor_type: SensorType) -> Vec<f64> {
    z_score_outliers(&values_of(readings, sensor_type), ANOMALY_Z_THRESHOLD)
}

/// Values whose z-score magnitude exceeds `threshold`.
///
/// The spread is the population standard deviation of `values`. Fewer than two
/// values, or no spread at all, flags nothing.
pub fn z_score_outliers(values: &[f64], threshold: f64) -> Vec<f64> {
    if values.len() < 2 {
        return Vec::new();
    }
    let Some(mean) = mean(values) else {
        return Vec::new();
    };

    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    let std_dev = variance.sqrt();
    if !std_dev.is_finite() || std_dev <= 0.0 {
        return Vec::new();
    }

    values
        .iter()
        .copied()
        .filter(|v| ((v - mean) / std_dev).abs() > threshold)
        .collect()
}

/// Pearson correlation between two sensor types at one location.
///
/// The two series are sorted by timestamp and must cover exactly the same
/// timestamps (hence the same length, greater than one); values are paired by
/// timestamp. Anything else, or a constant series, is `None`.
pub fn correlate(readings: &[Reading], first: SensorType, second: SensorType) -> Option<f64> {
    let a = timed_series(readings, first);
    let b = timed_series(readings, second);

    if a.len() != b.len() || a.len() < 2 {
        return None;
    }
    if a.iter().zip(&b).any(|((ta, _), (tb, _))| ta != tb) {
        return None;
    }

    let xs: Vec<f64> = a.into_iter().map(|(_, v)| v).collect();
    let ys: Vec<f64> = b.into_iter().map(|(_, v)| v).collect();
    pearson(&xs, &ys)
}

/// Pearson coefficient of two equal-length series, clamped to [-1, 1]
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mean_x = mean(xs)?;
    let mean_y = mean(ys)?;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    let r = cov / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

fn timed_series(readings: &[Reading], sensor_type: SensorType) -> Vec<(DateTime<Utc>, f64)> {
    let mut series: Vec<_> = readings
        .iter()
        .filter(|r| r.sensor_type == sensor_type && r.value.is_finite())
        .map(|r| (r.timestamp, r.value))
        .collect();
    series.sort_by_key(|(ts, _)| *ts);
    series
}
