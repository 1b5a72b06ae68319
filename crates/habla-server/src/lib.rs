//! # habla-server
//!
//! HTTP synthesis service.
//!
//! Provides:
//! - `POST /synthesize` — text in, audio bytes out
//! - `GET /health`, `/healthz`, `/ready` — liveness and readiness
//! - `GET /info` — model and service metadata
//! - `GET /metrics` — Prometheus exposition

pub mod handlers;
pub mod server;

pub use handlers::AppState;
pub use server::{router, HttpServer};
