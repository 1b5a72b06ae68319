//! The VITS-style voice synthesizer.
//!
//! Two backends share one surface: `Neural` runs the candle graph loaded
//! from safetensors weights, `Mock` produces a deterministic tone sequence
//! without any weights so the scheduler and server can be exercised in
//! tests and local development. The mock is only ever constructed
//! explicitly through [`VitsSynthesizer::new_mock`]; a failed weight load is
//! a hard error, not a fallback.

use candle_core::{DType, Device, Tensor};
use candle_nn::{Conv1d, Conv1dConfig, Embedding, Linear, Module, VarBuilder};
use tracing::{debug, info};

use habla_core::{AudioBuffer, SpeechSynthesizer, SynthesisRequest, TtsError, TtsResult};

use crate::config::VitsConfig;
use crate::dsp;
use crate::weights::{self, ModelSource};

fn tensor_err(e: candle_core::Error) -> TtsError {
    TtsError::inference(e.to_string())
}

/// Cap on frames per character after the duration head, keeping a single
/// degenerate prediction from dominating a request.
const MAX_FRAMES_PER_CHAR: f32 = 60.0;

/// A loaded voice model.
pub struct VitsSynthesizer {
    config: VitsConfig,
    device: Device,
    backend: Backend,
}

enum Backend {
    Mock(MockVoice),
    Neural(NeuralVoice),
}

impl std::fmt::Debug for VitsSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match self.backend {
            Backend::Mock(_) => "mock",
            Backend::Neural(_) => "neural",
        };
        f.debug_struct("VitsSynthesizer")
            .field("name", &self.config.name)
            .field("backend", &backend)
            .finish()
    }
}

impl VitsSynthesizer {
    /// Create a weightless mock voice for tests and local development.
    pub fn new_mock() -> Self {
        let config = VitsConfig::default();
        let mock = MockVoice {
            sample_rate: config.sample_rate,
        };
        Self {
            config,
            device: Device::Cpu,
            backend: Backend::Mock(mock),
        }
    }

    /// Resolve and load a model onto the given device.
    ///
    /// Fails with `ModelLoad` if the source cannot be resolved, the config
    /// is invalid, or the weights do not match the declared architecture.
    pub fn load(source: &ModelSource, device: &Device) -> TtsResult<Self> {
        let resolved = weights::resolve(source)?;
        let config = VitsConfig::from_file(&resolved.config_path)?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(
                &[resolved.weights_path.clone()],
                DType::F32,
                device,
            )
        }
        .map_err(|e| TtsError::model_load(&resolved.source_id, e.to_string()))?;

        let voice = NeuralVoice::new(vb, &config)
            .map_err(|e| TtsError::model_load(&resolved.source_id, e.to_string()))?;

        info!(
            name = %config.name,
            sample_rate = config.sample_rate,
            vocab = config.vocab_size(),
            "voice model loaded"
        );

        Ok(Self {
            config,
            device: device.clone(),
            backend: Backend::Neural(voice),
        })
    }

    /// The voice configuration.
    pub fn config(&self) -> &VitsConfig {
        &self.config
    }

    /// Whether real weights are loaded.
    pub fn is_neural(&self) -> bool {
        matches!(self.backend, Backend::Neural(_))
    }
}

impl SpeechSynthesizer for VitsSynthesizer {
    fn synthesize(&mut self, request: &SynthesisRequest) -> TtsResult<AudioBuffer> {
        request.validate()?;

        let ids = self.config.encode_text(&request.text);
        if ids.is_empty() {
            return Err(TtsError::invalid_input(
                "text contains no synthesizable characters",
            ));
        }

        let speed = request.speed.unwrap_or(1.0);
        let mut pcm = match &self.backend {
            Backend::Mock(voice) => voice.infer(&ids, speed),
            Backend::Neural(voice) => voice.infer(&ids, speed, &self.config, &self.device)?,
        };

        if pcm.is_empty() {
            return Err(TtsError::inference("model produced no samples"));
        }
        if pcm.iter().any(|s| !s.is_finite()) {
            return Err(TtsError::inference("non-finite sample in model output"));
        }

        // Pitch as a playback-rate shift: render at rate/pitch, play at rate.
        if let Some(pitch) = request.pitch {
            if (pitch - 1.0).abs() > f32::EPSILON {
                let rate = self.config.sample_rate;
                let render_rate = (rate as f32 / pitch).round().max(1.0) as u32;
                pcm = dsp::resample_linear(&pcm, rate, render_rate);
            }
        }

        debug!(
            request_id = %request.id,
            chars = ids.len(),
            samples = pcm.len(),
            "synthesis complete"
        );

        Ok(AudioBuffer::mono(pcm, self.config.sample_rate))
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    fn model_name(&self) -> &str {
        &self.config.name
    }
}

/// Grapheme embedding → conv text encoder → duration head → length
/// regulator → conv decoder projecting each frame to `hop_length` samples.
struct NeuralVoice {
    embedding: Embedding,
    encoder: Vec<Conv1d>,
    duration: Linear,
    decoder: Vec<Conv1d>,
    head: Conv1d,
}

impl NeuralVoice {
    fn new(vb: VarBuilder, config: &VitsConfig) -> candle_core::Result<Self> {
        let hidden = config.hidden_size;
        let kernel = config.encoder_kernel;
        let conv_cfg = Conv1dConfig {
            padding: kernel / 2,
            ..Default::default()
        };

        let embedding = candle_nn::embedding(config.vocab_size(), hidden, vb.pp("text_emb"))?;

        let mut encoder = Vec::with_capacity(config.encoder_layers);
        for i in 0..config.encoder_layers {
            encoder.push(candle_nn::conv1d(
                hidden,
                hidden,
                kernel,
                conv_cfg,
                vb.pp(format!("encoder.{i}")),
            )?);
        }

        let duration = candle_nn::linear(hidden, 1, vb.pp("duration_proj"))?;

        let mut decoder = Vec::with_capacity(config.decoder_layers);
        for i in 0..config.decoder_layers {
            decoder.push(candle_nn::conv1d(
                hidden,
                hidden,
                kernel,
                conv_cfg,
                vb.pp(format!("decoder.{i}")),
            )?);
        }

        let head = candle_nn::conv1d(
            hidden,
            config.hop_length,
            1,
            Conv1dConfig::default(),
            vb.pp("decoder_out"),
        )?;

        Ok(Self {
            embedding,
            encoder,
            duration,
            decoder,
            head,
        })
    }

    fn infer(
        &self,
        ids: &[u32],
        speed: f32,
        config: &VitsConfig,
        device: &Device,
    ) -> TtsResult<Vec<f32>> {
        let input = Tensor::new(ids, device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(tensor_err)?;

        // [1, T, H] -> [1, H, T] for the conv stack.
        let mut hidden = self
            .embedding
            .forward(&input)
            .and_then(|h| h.transpose(1, 2))
            .map_err(tensor_err)?;
        for conv in &self.encoder {
            hidden = conv
                .forward(&hidden)
                .and_then(|h| h.gelu())
                .map_err(tensor_err)?;
        }

        // Log-domain durations, one per grapheme.
        let log_durations: Vec<f32> = self
            .duration
            .forward(&hidden.transpose(1, 2).map_err(tensor_err)?)
            .and_then(|d| d.squeeze(2))
            .and_then(|d| d.squeeze(0))
            .and_then(|d| d.to_vec1())
            .map_err(tensor_err)?;

        let frames_per_char: Vec<usize> = log_durations
            .iter()
            .map(|&d| (d.exp() / speed).clamp(1.0, MAX_FRAMES_PER_CHAR).round() as usize)
            .collect();

        // Length regulation: repeat each grapheme's hidden state for its
        // predicted frame count, capped by the configured frame limit.
        let mut indices: Vec<u32> = Vec::new();
        'outer: for (i, &n) in frames_per_char.iter().enumerate() {
            for _ in 0..n {
                if indices.len() >= config.max_frames {
                    break 'outer;
                }
                indices.push(i as u32);
            }
        }

        let index_tensor = Tensor::new(indices.as_slice(), device).map_err(tensor_err)?;
        let mut frames = hidden.index_select(&index_tensor, 2).map_err(tensor_err)?;

        for conv in &self.decoder {
            frames = conv
                .forward(&frames)
                .and_then(|f| f.gelu())
                .map_err(tensor_err)?;
        }

        // [1, hop, T'] -> [1, T', hop] -> flat waveform in [-1, 1].
        let pcm = self
            .head
            .forward(&frames)
            .and_then(|w| w.transpose(1, 2))
            .and_then(|w| w.flatten_all())
            .and_then(|w| w.tanh())
            .and_then(|w| w.to_vec1::<f32>())
            .map_err(tensor_err)?;

        Ok(pcm)
    }
}

/// Deterministic weightless voice: one enveloped tone per grapheme.
struct MockVoice {
    sample_rate: u32,
}

impl MockVoice {
    fn infer(&self, ids: &[u32], speed: f32) -> Vec<f32> {
        let rate = self.sample_rate as f32;
        let per_char = ((0.07 / speed) * rate).max(1.0) as usize;

        let mut pcm = Vec::with_capacity(ids.len() * per_char);
        for &id in ids {
            // Grapheme 0 is the word separator in the default inventory.
            let silent = id == 0;
            let freq = 90.0 + ((id * 7 + 13) % 160) as f32 * 2.5;

            for n in 0..per_char {
                if silent {
                    pcm.push(0.0);
                    continue;
                }
                let t = n as f32 / rate;
                let envelope =
                    0.5 * (1.0 - (2.0 * std::f32::consts::PI * n as f32 / per_char as f32).cos());
                pcm.push((2.0 * std::f32::consts::PI * freq * t).sin() * 0.3 * envelope);
            }
        }
        pcm
    }
}
