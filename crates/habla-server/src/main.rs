//! habla HTTP synthesis server.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use habla_core::{LoggingConfig, ModelConfig, SchedulerConfig, ServerConfig, SpeechSynthesizer};
use habla_runtime::{logging, warm::warm_model, Scheduler, TtsMetrics};
use habla_server::{AppState, HttpServer};
use habla_vits::{device, AllocTuning, DevicePreference, ModelSource, VitsSynthesizer};

/// habla — Spanish speech synthesis server
#[derive(Debug, Parser)]
#[command(name = "habla-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server bind host
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Server port
    #[arg(long, default_value_t = 5055)]
    port: u16,

    /// Model source: local directory or hf://owner/repo[@revision]
    #[arg(long, default_value = "models/es-css10-vits")]
    model: String,

    /// Compute device (auto, cpu, cuda, metal)
    #[arg(long, default_value = "auto")]
    device: String,

    /// Use the weightless mock voice (development only)
    #[arg(long)]
    mock: bool,

    /// Model replicas / worker threads; inference is serialized per replica
    #[arg(long, default_value_t = 1)]
    workers: usize,

    /// Maximum queued jobs before submissions are rejected
    #[arg(long, default_value_t = 16)]
    queue_capacity: usize,

    /// Default per-request deadline in milliseconds
    #[arg(long, default_value_t = 60_000)]
    timeout_ms: u64,

    /// Graceful shutdown timeout in seconds
    #[arg(long, default_value_t = 30)]
    shutdown_timeout_secs: u64,

    /// Skip warmup synthesis runs
    #[arg(long)]
    no_warm: bool,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    json_logs: bool,
}

/// Load one model replica per worker; any failed load aborts startup.
fn load_replicas(
    config: &ModelConfig,
    workers: usize,
    mock: bool,
) -> Result<Vec<Box<dyn SpeechSynthesizer + Send>>> {
    let mut replicas: Vec<Box<dyn SpeechSynthesizer + Send>> = Vec::with_capacity(workers);

    if mock {
        for _ in 0..workers {
            replicas.push(Box::new(VitsSynthesizer::new_mock()));
        }
        return Ok(replicas);
    }

    let preference: DevicePreference = config.device.parse().context("device selection")?;
    let compute = preference.select().context("device selection")?;
    info!(device = device::device_label(&compute), "device selected");

    let source = ModelSource::parse(&config.source).context("model source")?;
    for _ in 0..workers {
        let model = VitsSynthesizer::load(&source, &compute).context("model load")?;
        replicas.push(Box::new(model));
    }
    Ok(replicas)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let logging_config = LoggingConfig {
        level: args.log_level.clone(),
        format: if args.json_logs { "json" } else { "text" }.to_string(),
    };
    logging::init_from_config(&logging_config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %args.host,
        port = args.port,
        model = %args.model,
        "starting habla server"
    );

    // Allocator tuning is read and validated exactly once, before any
    // device context exists.
    let alloc = AllocTuning::from_env().context("allocator configuration")?;
    alloc.apply();

    let model_config = ModelConfig {
        source: args.model,
        device: args.device,
    };
    let workers = args.workers.max(1);
    let mut replicas = load_replicas(&model_config, workers, args.mock)?;

    let model_name = replicas[0].model_name().to_string();
    let sample_rate = replicas[0].sample_rate();

    if !args.no_warm {
        for replica in replicas.iter_mut() {
            warm_model(replica.as_mut()).context("warmup")?;
        }
    }

    let (metrics, metrics_handle) = TtsMetrics::install().context("metrics")?;

    let scheduler_config = SchedulerConfig {
        queue_capacity: args.queue_capacity,
        workers,
        default_timeout_ms: args.timeout_ms,
    };
    let scheduler = Arc::new(
        Scheduler::start(replicas, scheduler_config, metrics).context("scheduler start")?,
    );

    let state = Arc::new(AppState {
        scheduler,
        model_name,
        sample_rate,
        metrics: Some(metrics_handle),
        start_time: Instant::now(),
    });

    let server_config = ServerConfig {
        host: args.host,
        port: args.port,
        shutdown_timeout_secs: args.shutdown_timeout_secs,
    };
    let server = HttpServer::new(server_config, state);
    server.run().await.context("server failed")?;

    info!("server shutdown complete");
    Ok(())
}
