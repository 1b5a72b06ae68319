//! Request handlers: wire requests in, synthesis jobs through the
//! scheduler, audio bytes out.
//!
//! Input validation (presence, size, parameter ranges, target format) runs
//! before a job is admitted, so malformed requests never consume scheduler
//! capacity. Every internal error kind maps to exactly one response status
//! here; nothing crosses this boundary unclassified.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use habla_audio::AudioFormat;
use habla_core::{SynthesisRequest, TtsError, MAX_TEXT_CHARS};
use habla_runtime::Scheduler;

/// Shared server state.
pub struct AppState {
    /// The synthesis scheduler; the only path to the model.
    pub scheduler: Arc<Scheduler>,
    /// Loaded model identifier.
    pub model_name: String,
    /// Model output sample rate in Hz.
    pub sample_rate: u32,
    /// Prometheus exposition handle, when metrics are installed.
    pub metrics: Option<PrometheusHandle>,
    /// Process start, for uptime reporting.
    pub start_time: Instant,
}

/// Body of `POST /synthesize`.
#[derive(Debug, Deserialize)]
pub struct SynthesizeBody {
    /// Text to synthesize.
    pub text: String,
    /// Speaking-rate multiplier.
    pub speed: Option<f32>,
    /// Pitch multiplier.
    pub pitch: Option<f32>,
    /// Target format: "wav" (default) or "pcm".
    pub format: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: u64,
}

#[derive(Serialize)]
struct InfoResponse {
    name: &'static str,
    version: &'static str,
    model: String,
    language: &'static str,
    sample_rate: u32,
    max_text_chars: usize,
}

/// Synthesize text into audio bytes.
pub async fn synthesize(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SynthesizeBody>,
) -> Response {
    let format = match body.format.as_deref().unwrap_or("wav").parse::<AudioFormat>() {
        Ok(format) => format,
        Err(e) => return error_response(&e),
    };

    let mut request = SynthesisRequest::new(body.text);
    request.speed = body.speed;
    request.pitch = body.pitch;

    // Reject malformed input before it can occupy queue capacity.
    if let Err(e) = request.validate() {
        debug!(error = %e, "rejecting invalid request");
        return error_response(&e);
    }

    let request_id = request.id;
    let start = Instant::now();

    info!(
        %request_id,
        text_chars = request.text.chars().count(),
        "synthesis request admitted"
    );

    let audio = match state.scheduler.submit(request).await {
        Ok(audio) => audio,
        Err(e) => return error_response(&e),
    };

    let bytes = match habla_audio::encode(&audio, format) {
        Ok(bytes) => bytes,
        Err(e) => return error_response(&e),
    };

    info!(
        %request_id,
        audio_ms = audio.duration_ms(),
        total_ms = start.elapsed().as_millis() as u64,
        bytes = bytes.len(),
        "synthesis request served"
    );

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, format.content_type().parse().unwrap());
    if let Ok(value) = request_id.to_string().parse() {
        headers.insert("x-request-id", value);
    }
    (StatusCode::OK, headers, bytes).into_response()
}

/// Liveness probe.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// Readiness probe: false until the model is loaded and warm, and false
/// again once the scheduler has latched unhealthy.
pub async fn ready(State(state): State<Arc<AppState>>) -> Response {
    if state.scheduler.is_healthy() {
        (StatusCode::OK, "ready").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready").into_response()
    }
}

/// Service and model metadata.
pub async fn info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(InfoResponse {
        name: "habla",
        version: env!("CARGO_PKG_VERSION"),
        model: state.model_name.clone(),
        language: "es",
        sample_rate: state.sample_rate,
        max_text_chars: MAX_TEXT_CHARS,
    })
}

/// Prometheus exposition.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

/// Map an internal error to its stable wire status.
fn status_for(error: &TtsError) -> StatusCode {
    match error {
        TtsError::InvalidInput(_) | TtsError::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
        TtsError::Overload { .. } => StatusCode::SERVICE_UNAVAILABLE,
        TtsError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        TtsError::Unavailable(_) | TtsError::ModelLoad { .. } => StatusCode::SERVICE_UNAVAILABLE,
        TtsError::Inference(_)
        | TtsError::Config(_)
        | TtsError::Io(_)
        | TtsError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: &TtsError) -> Response {
    let status = status_for(error);
    let mut headers = HeaderMap::new();
    if error.is_retryable() {
        headers.insert(header::RETRY_AFTER, "1".parse().unwrap());
    }
    (
        status,
        headers,
        Json(ErrorBody {
            error: error.to_string(),
        }),
    )
        .into_response()
}
