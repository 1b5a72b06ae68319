//! # habla-runtime
//!
//! Runtime orchestration for the habla speech service.
//!
//! This crate provides:
//! - the bounded FIFO job queue and the synthesis scheduler that arbitrates
//!   all access to the model
//! - structured logging setup
//! - Prometheus metrics
//! - model warmup before serving

pub mod logging;
pub mod metrics;
pub mod queue;
pub mod scheduler;
pub mod warm;

pub use metrics::TtsMetrics;
pub use queue::{Job, JobQueue};
pub use scheduler::Scheduler;
