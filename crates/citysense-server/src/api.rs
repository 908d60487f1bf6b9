//! `/iot` endpoints: sensor registration, reading ingestion, metric updates,
//! analytics and daily reports

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use citysense_core::{
    correlate, detect_anomalies, MetricError, NewSensor, Reading, SensorType,
};
use citysense_metrics::update_all;
use citysense_report::{assemble, pdf_filename, render_pdf, render_text};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::{ApiError, ApiResult, AppState};

fn parse_sensor_type(tag: &str) -> ApiResult<SensorType> {
    tag.parse::<SensorType>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct RegisterSensorRequest {
    pub name: String,
    pub location: String,
    pub sensor_type: String,
}

pub async fn register_sensor(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterSensorRequest>,
) -> ApiResult<impl IntoResponse> {
    state.count_request();
    let sensor = NewSensor {
        sensor_type: parse_sensor_type(&req.sensor_type)?,
        name: req.name,
        location: req.location,
    };

    let sensor = state.reading_store().register_sensor(&sensor).await?;
    info!(id = sensor.id, location = %sensor.location, sensor_type = %sensor.sensor_type, "Sensor registered");
    Ok((StatusCode::CREATED, Json(sensor)))
}

#[derive(Debug, Deserialize)]
pub struct ReadingRequest {
    pub value: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

pub async fn record_reading(
    State(state): State<Arc<AppState>>,
    Path(sensor_id): Path<i64>,
    Json(req): Json<ReadingRequest>,
) -> ApiResult<impl IntoResponse> {
    state.count_request();
    let store = state.reading_store();
    if store.get_sensor(sensor_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("sensor {} not found", sensor_id)));
    }
    if !req.value.is_finite() {
        return Err(ApiError::BadRequest("reading value must be finite".to_string()));
    }

    let timestamp = req.timestamp.unwrap_or_else(Utc::now);
    store.record_reading(sensor_id, req.value, timestamp).await?;
    debug!(sensor_id, value = req.value, "Reading recorded");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "sensor_id": sensor_id,
            "value": req.value,
            "timestamp": timestamp,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ReadingPayload {
    pub sensor_type: String,
    pub value: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub readings: Vec<ReadingPayload>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SinceQuery {
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct CategoryStatus {
    pub category: &'static str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub location: String,
    pub readings: usize,
    pub ignored: usize,
    pub results: Vec<CategoryStatus>,
}

/// Convert payload readings, dropping those with unknown tags.
/// Returns the converted readings and how many were dropped.
fn convert_readings(payload: Vec<ReadingPayload>) -> (Vec<Reading>, usize) {
    let now = Utc::now();
    let total = payload.len();
    let readings: Vec<Reading> = payload
        .into_iter()
        .filter_map(|r| match r.sensor_type.parse::<SensorType>() {
            Ok(sensor_type) => Some(Reading {
                sensor_type,
                value: r.value,
                timestamp: r.timestamp.unwrap_or(now),
            }),
            Err(e) => {
                debug!("Ignoring reading: {}", e);
                None
            }
        })
        .collect();
    let ignored = total - readings.len();
    (readings, ignored)
}

/// Recompute every category for a location.
///
/// With a `readings` body the batch is used as given; with an empty body the
/// stored readings for the location are used, optionally from `since` on.
pub async fn update_metrics(
    State(state): State<Arc<AppState>>,
    Path(location): Path<String>,
    Query(q): Query<SinceQuery>,
    body: Bytes,
) -> ApiResult<Json<UpdateResponse>> {
    state.count_request();

    let (readings, ignored) = if body.iter().all(u8::is_ascii_whitespace) {
        let stored = state
            .reading_store()
            .readings_for_location(&location, q.since)
            .await?;
        (stored, 0)
    } else {
        let req: UpdateRequest = serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("invalid update payload: {e}")))?;
        convert_readings(req.readings)
    };
    if ignored > 0 {
        warn!(%location, ignored, "Readings with unknown sensor types ignored");
    }

    let outcomes = update_all(state.metric_store(), &location, &readings).await;

    let mut results = Vec::with_capacity(outcomes.len());
    let mut stored = 0u64;
    for outcome in outcomes {
        let category = outcome.category.as_str();
        let status = match outcome.result {
            Ok(record) => {
                stored += 1;
                CategoryStatus {
                    category,
                    status: "stored",
                    record: serde_json::to_value(&record).ok(),
                    error: None,
                }
            }
            Err(e @ MetricError::InsufficientData { .. }) => CategoryStatus {
                category,
                status: "insufficient_data",
                record: None,
                error: Some(e.to_string()),
            },
            Err(e @ MetricError::Storage { .. }) => CategoryStatus {
                category,
                status: "storage_error",
                record: None,
                error: Some(e.to_string()),
            },
        };
        results.push(status);
    }
    state.records_stored.add(stored, &[]);

    Ok(Json(UpdateResponse {
        location,
        readings: readings.len(),
        ignored,
        results,
    }))
}

#[derive(Debug, Deserialize)]
pub struct AnomalyQuery {
    pub sensor_type: String,
    pub since: Option<DateTime<Utc>>,
}

pub async fn anomalies(
    State(state): State<Arc<AppState>>,
    Path(location): Path<String>,
    Query(q): Query<AnomalyQuery>,
) -> ApiResult<impl IntoResponse> {
    state.count_request();
    let sensor_type = parse_sensor_type(&q.sensor_type)?;

    let readings = state
        .reading_store()
        .readings_for_location(&location, q.since)
        .await?;
    let flagged = detect_anomalies(&readings, sensor_type);

    Ok(Json(json!({
        "location": location,
        "sensor_type": sensor_type,
        "anomalies": flagged,
    })))
}

#[derive(Debug, Deserialize)]
pub struct CorrelationQuery {
    pub type1: String,
    pub type2: String,
    pub since: Option<DateTime<Utc>>,
}

pub async fn correlation(
    State(state): State<Arc<AppState>>,
    Path(location): Path<String>,
    Query(q): Query<CorrelationQuery>,
) -> ApiResult<impl IntoResponse> {
    state.count_request();
    let first = parse_sensor_type(&q.type1)?;
    let second = parse_sensor_type(&q.type2)?;

    let readings = state
        .reading_store()
        .readings_for_location(&location, q.since)
        .await?;
    let coefficient = correlate(&readings, first, second);

    Ok(Json(json!({
        "location": location,
        "type1": first,
        "type2": second,
        "coefficient": coefficient,
    })))
}

pub async fn report_text(
    State(state): State<Arc<AppState>>,
    Path(location): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.count_request();
    let report = assemble(state.metric_store(), &location, Utc::now().date_naive()).await?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        render_text(&report),
    ))
}

/// PDF variant of the daily report; every failure is a 500
pub async fn report_pdf(
    State(state): State<Arc<AppState>>,
    Path(location): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.count_request();
    let date = Utc::now().date_naive();

    let report = assemble(state.metric_store(), &location, date)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let bytes = render_pdf(&report).map_err(|e| ApiError::Internal(e.to_string()))?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        pdf_filename(&location, date)
    ))
    .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}
