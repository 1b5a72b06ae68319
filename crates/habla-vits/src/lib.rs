//! # habla-vits
//!
//! Model runtime adapter for the habla speech service.
//!
//! Owns the loaded VITS-style voice model and everything the rest of the
//! service should not have to know about:
//!
//! - compute device selection with automatic fallback (`device`)
//! - device-memory allocator tuning read once at startup (`alloc`)
//! - weight resolution from a local directory or the Hugging Face hub
//!   (`weights`)
//! - the synthesizer itself with mock and neural backends (`model`)
//!
//! Loading fails fast: a missing or unreadable model is a startup error,
//! never a per-request one.

pub mod alloc;
pub mod config;
pub mod device;
pub mod dsp;
pub mod model;
pub mod weights;

pub use alloc::AllocTuning;
pub use config::VitsConfig;
pub use device::DevicePreference;
pub use model::VitsSynthesizer;
pub use weights::ModelSource;
