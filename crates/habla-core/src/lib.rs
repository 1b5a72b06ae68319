//! # habla-core
//!
//! Core types, traits, and error definitions for the habla speech service.
//!
//! This crate provides the foundational abstractions used across all other
//! crates in the workspace:
//!
//! - Common data types (`SynthesisRequest`, `AudioBuffer`)
//! - The `SpeechSynthesizer` trait implemented by model backends
//! - Unified error handling via `TtsError`
//! - Configuration structures

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{LoggingConfig, ModelConfig, SchedulerConfig, ServerConfig};
pub use error::{TtsError, TtsResult};
pub use traits::SpeechSynthesizer;
pub use types::{AudioBuffer, SynthesisRequest, MAX_TEXT_CHARS, PARAM_RANGE};
