//! Trait definitions for model backends.

use crate::error::TtsResult;
use crate::types::{AudioBuffer, SynthesisRequest};

/// A loaded text-to-speech model.
///
/// `synthesize` takes `&mut self`: inference runtimes keep mutable internal
/// buffers (decoder state, scratch tensors), so a handle must never be shared
/// between concurrent jobs. The scheduler gives each worker thread exclusive
/// ownership of one handle; running several jobs in parallel requires
/// loading independent replicas.
pub trait SpeechSynthesizer: Send {
    /// Run inference for a validated request, producing decoded samples.
    fn synthesize(&mut self, request: &SynthesisRequest) -> TtsResult<AudioBuffer>;

    /// Output sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Output channel count.
    fn channels(&self) -> u16 {
        1
    }

    /// Human-readable model identifier for logs and the info endpoint.
    fn model_name(&self) -> &str;
}
