use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    routing::{get, post},
    Router,
};
use citysense_core::{MetricStore, ReadingStore};
use opentelemetry::metrics::{Counter, MeterProvider};
use opentelemetry_prometheus::exporter;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};

pub mod api;
pub mod error;

pub use error::{ApiError, ApiResult};

pub struct AppState {
    ready: AtomicBool,
    registry: Registry,
    #[allow(dead_code)]
    provider: SdkMeterProvider,
    requests_total: Counter<u64>,
    records_stored: Counter<u64>,
    metrics: Arc<dyn MetricStore>,
    readings: Arc<dyn ReadingStore>,
}

impl AppState {
    pub fn metric_store(&self) -> &dyn MetricStore {
        self.metrics.as_ref()
    }

    pub fn reading_store(&self) -> &dyn ReadingStore {
        self.readings.as_ref()
    }

    fn count_request(&self) {
        self.requests_total.add(1, &[]);
    }
}

/// Build the router over the given gateways.
///
/// Both gateways are usually the same object; they are passed separately so a
/// deployment can keep raw readings and derived records apart.
pub fn build_app(
    metrics: Arc<dyn MetricStore>,
    readings: Arc<dyn ReadingStore>,
) -> Result<(Router, Arc<AppState>)> {
    // Prometheus exporter via OpenTelemetry
    let registry = Registry::new();
    let reader = exporter()
        .with_registry(registry.clone())
        .build()
        .context("failed to build prometheus exporter")?;
    let provider = SdkMeterProvider::builder().with_reader(reader).build();
    let meter = provider.meter("citysense-server");

    let requests_total = meter
        .u64_counter("citysense_requests_total")
        .with_description("Total HTTP requests served")
        .init();
    let records_stored = meter
        .u64_counter("citysense_records_stored_total")
        .with_description("Derived metric records written")
        .init();

    let state = Arc::new(AppState {
        ready: AtomicBool::new(false),
        registry,
        provider,
        requests_total,
        records_stored,
        metrics,
        readings,
    });

    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(prometheus_metrics))
        .route("/iot/sensors", post(api::register_sensor))
        .route("/iot/sensors/:id/readings", post(api::record_reading))
        .route("/iot/data/update/:location", post(api::update_metrics))
        .route("/iot/data/anomalies/:location", get(api::anomalies))
        .route("/iot/data/correlation/:location", get(api::correlation))
        .route("/iot/data/report/:location", get(api::report_text))
        .route("/iot/data/report/:location/pdf", get(api::report_pdf))
        .with_state(Arc::clone(&state));

    Ok((router, state))
}

pub fn set_ready(state: &Arc<AppState>, is_ready: bool) {
    state.ready.store(is_ready, Ordering::Relaxed);
}

async fn healthz(State(state): State<Arc<AppState>>) -> StatusCode {
    state.count_request();
    StatusCode::OK
}

async fn readyz(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.ready.load(Ordering::Relaxed) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn prometheus_metrics(
    State(state): State<Arc<AppState>>,
) -> (
    [(axum::http::header::HeaderName, axum::http::HeaderValue); 1],
    String,
) {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buf) {
        tracing::warn!(error=?e, "failed to encode metrics");
    }
    let body = String::from_utf8(buf).unwrap_or_default();
    let header = (
        header::CONTENT_TYPE,
        axum::http::HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    ([header], body)
}
