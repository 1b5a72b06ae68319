//! Core data types for the synthesis service.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{TtsError, TtsResult};

/// Maximum accepted input length in characters.
pub const MAX_TEXT_CHARS: usize = 10_000;

/// Valid range for the speed and pitch parameters.
pub const PARAM_RANGE: (f32, f32) = (0.5, 2.0);

/// A buffer of decoded audio with its format metadata.
///
/// Produced by the model backend, consumed by the encoder. Buffers are never
/// shared between requests.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// PCM samples in [-1, 1].
    pub pcm: Arc<[f32]>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
}

impl AudioBuffer {
    /// Create a new mono audio buffer.
    pub fn mono(pcm: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            pcm: pcm.into(),
            sample_rate,
            channels: 1,
        }
    }

    /// Number of samples per channel.
    pub fn num_samples(&self) -> usize {
        self.pcm.len() / self.channels.max(1) as usize
    }

    /// Duration of the buffer in milliseconds.
    pub fn duration_ms(&self) -> f32 {
        self.num_samples() as f32 / self.sample_rate as f32 * 1000.0
    }
}

/// A synthesis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisRequest {
    /// Unique request identifier.
    pub id: Uuid,
    /// Text to synthesize.
    pub text: String,
    /// Speaking-rate multiplier (1.0 = model default).
    pub speed: Option<f32>,
    /// Pitch multiplier (1.0 = model default).
    pub pitch: Option<f32>,
    /// Per-request deadline in milliseconds; scheduler default when unset.
    pub timeout_ms: Option<u64>,
}

impl SynthesisRequest {
    /// Create a new request with default parameters.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            speed: None,
            pitch: None,
            timeout_ms: None,
        }
    }

    /// Set the speaking-rate multiplier.
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = Some(speed);
        self
    }

    /// Set the pitch multiplier.
    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = Some(pitch);
        self
    }

    /// Set the deadline.
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }

    /// Validate text presence, text size, and parameter ranges.
    ///
    /// This runs at the service boundary, before the request is admitted to
    /// the scheduler, so malformed input never consumes queue capacity.
    pub fn validate(&self) -> TtsResult<()> {
        if self.text.trim().is_empty() {
            return Err(TtsError::invalid_input("text must not be empty"));
        }
        let chars = self.text.chars().count();
        if chars > MAX_TEXT_CHARS {
            return Err(TtsError::invalid_input(format!(
                "text too long: {chars} chars (max {MAX_TEXT_CHARS})"
            )));
        }
        for (name, value) in [("speed", self.speed), ("pitch", self.pitch)] {
            if let Some(v) = value {
                if !v.is_finite() || v < PARAM_RANGE.0 || v > PARAM_RANGE.1 {
                    return Err(TtsError::invalid_input(format!(
                        "{name} {v} outside supported range [{}, {}]",
                        PARAM_RANGE.0, PARAM_RANGE.1
                    )));
                }
            }
        }
        Ok(())
    }
}
