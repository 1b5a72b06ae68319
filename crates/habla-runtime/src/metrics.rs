//! Metrics collection and Prometheus export.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use habla_core::{TtsError, TtsResult};

/// Metrics recorder facade for synthesis operations.
///
/// The methods are safe to call whether or not a recorder is installed;
/// without one they are no-ops, which is what tests use.
#[derive(Debug, Clone, Copy)]
pub struct TtsMetrics;

impl TtsMetrics {
    /// Install the global Prometheus recorder and return a handle whose
    /// `render()` produces the exposition text for the metrics endpoint.
    pub fn install() -> TtsResult<(Self, PrometheusHandle)> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| TtsError::internal(format!("metrics init failed: {e}")))?;

        Self::describe();
        Ok((Self, handle))
    }

    /// Metrics facade without a recorder (for tests).
    pub fn noop() -> Self {
        Self
    }

    fn describe() {
        describe_counter!("tts_requests_total", "Synthesis requests received");
        describe_counter!("tts_requests_completed", "Requests completed successfully");
        describe_counter!("tts_requests_failed", "Requests that failed in the model");
        describe_counter!("tts_requests_timeout", "Requests that exceeded their deadline");
        describe_counter!(
            "tts_requests_rejected",
            "Requests rejected because the queue was full"
        );
        describe_histogram!(
            "tts_inference_latency_ms",
            "Model inference latency in milliseconds"
        );
        describe_histogram!(
            "tts_rtf",
            "Real-time factor (processing time / audio duration)"
        );
        describe_gauge!("tts_queue_size", "Current synthesis queue depth");
    }

    /// Record a request received.
    pub fn request_received(&self) {
        counter!("tts_requests_total").increment(1);
    }

    /// Record a request completed successfully.
    pub fn request_completed(&self) {
        counter!("tts_requests_completed").increment(1);
    }

    /// Record a failed request.
    pub fn request_failed(&self) {
        counter!("tts_requests_failed").increment(1);
    }

    /// Record a request that hit its deadline.
    pub fn request_timeout(&self) {
        counter!("tts_requests_timeout").increment(1);
    }

    /// Record a request rejected by backpressure.
    pub fn request_rejected(&self) {
        counter!("tts_requests_rejected").increment(1);
    }

    /// Record model inference latency.
    pub fn record_inference_latency(&self, ms: f64) {
        histogram!("tts_inference_latency_ms").record(ms);
    }

    /// Record the real-time factor of a completed job.
    pub fn record_rtf(&self, rtf: f64) {
        histogram!("tts_rtf").record(rtf);
    }

    /// Update the queue-depth gauge.
    pub fn set_queue_size(&self, size: f64) {
        gauge!("tts_queue_size").set(size);
    }
}
