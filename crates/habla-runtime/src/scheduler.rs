//! The synthesis scheduler: sole arbiter of access to the model.
//!
//! Request handlers submit jobs and await a completion channel; worker
//! threads consume the queue and run inference. Each worker exclusively
//! owns one model replica, so the default single-worker pool serializes all
//! inference (the conservative assumption for runtimes with mutable
//! internal state) while admission stays concurrent and bounded.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use habla_core::{AudioBuffer, SchedulerConfig, SpeechSynthesizer, SynthesisRequest, TtsError, TtsResult};

use crate::metrics::TtsMetrics;
use crate::queue::{Job, JobQueue};

/// Shared scheduler state handed to worker threads.
struct Shared {
    queue: JobQueue,
    healthy: AtomicBool,
    admitted: AtomicU64,
    metrics: TtsMetrics,
}

/// The synthesis scheduler.
pub struct Scheduler {
    shared: Arc<Shared>,
    config: SchedulerConfig,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    /// Start the scheduler with one worker thread per model replica.
    ///
    /// The model handles are owned by the caller until this point and move
    /// into the workers; nothing else ever touches them again.
    pub fn start(
        models: Vec<Box<dyn SpeechSynthesizer + Send>>,
        config: SchedulerConfig,
        metrics: TtsMetrics,
    ) -> TtsResult<Self> {
        if models.is_empty() {
            return Err(TtsError::config("at least one model replica is required"));
        }
        if config.queue_capacity == 0 {
            return Err(TtsError::config("queue_capacity must be nonzero"));
        }

        let shared = Arc::new(Shared {
            queue: JobQueue::new(config.queue_capacity),
            healthy: AtomicBool::new(true),
            admitted: AtomicU64::new(0),
            metrics,
        });

        let mut workers = Vec::with_capacity(models.len());
        let replicas = models.len();
        for (idx, model) in models.into_iter().enumerate() {
            let shared = Arc::clone(&shared);
            let handle = std::thread::Builder::new()
                .name(format!("synth-worker-{idx}"))
                .spawn(move || worker_loop(idx, model, shared))
                .map_err(|e| TtsError::internal(format!("spawn worker: {e}")))?;
            workers.push(handle);
        }

        info!(
            workers = replicas,
            queue_capacity = config.queue_capacity,
            "scheduler started"
        );

        Ok(Self {
            shared,
            config,
            workers: Mutex::new(workers),
        })
    }

    /// Submit a request and await its audio.
    ///
    /// Fails fast with `Unavailable` when the scheduler is unhealthy and
    /// `Overload` when the queue is full. Once admitted, the caller waits at
    /// most the job's deadline: on expiry it gets `Timeout` immediately and
    /// detaches — any in-flight computation finishes into a closed channel
    /// and is discarded.
    pub async fn submit(&self, request: SynthesisRequest) -> TtsResult<AudioBuffer> {
        self.shared.metrics.request_received();

        if !self.is_healthy() {
            return Err(TtsError::unavailable(
                "scheduler is unhealthy; restart required",
            ));
        }

        let timeout = Duration::from_millis(
            request.timeout_ms.unwrap_or(self.config.default_timeout_ms),
        );
        let request_id = request.id;

        let (tx, rx) = oneshot::channel();
        let job = Job::new(request, timeout, tx);

        if self.shared.queue.push(job).is_err() {
            if self.shared.queue.is_closed() {
                return Err(TtsError::unavailable("scheduler is shut down"));
            }
            self.shared.metrics.request_rejected();
            debug!(%request_id, "queue full, rejecting");
            return Err(TtsError::Overload {
                capacity: self.config.queue_capacity,
            });
        }

        self.shared.admitted.fetch_add(1, Ordering::Relaxed);
        self.shared.metrics.set_queue_size(self.shared.queue.len() as f64);

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(TtsError::unavailable(
                "worker stopped before completing the job",
            )),
            Err(_) => {
                self.shared.metrics.request_timeout();
                debug!(%request_id, ?timeout, "deadline elapsed, detaching");
                Err(TtsError::Timeout {
                    ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    /// False after a fatal model error; only a process restart resets it.
    pub fn is_healthy(&self) -> bool {
        self.shared.healthy.load(Ordering::Acquire)
    }

    /// Number of jobs admitted to the queue since startup.
    pub fn admitted(&self) -> u64 {
        self.shared.admitted.load(Ordering::Relaxed)
    }

    /// Current queue depth.
    pub fn queue_depth(&self) -> usize {
        self.shared.queue.len()
    }

    /// Queue capacity.
    pub fn queue_capacity(&self) -> usize {
        self.config.queue_capacity
    }

    /// Close the queue and join all workers.
    pub fn shutdown(&self) {
        self.shared.queue.close();
        let mut workers = self.workers.lock();
        for handle in workers.drain(..) {
            if handle.join().is_err() {
                warn!("worker panicked during shutdown");
            }
        }
        info!("scheduler stopped");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shared.queue.close();
    }
}

fn worker_loop(idx: usize, mut model: Box<dyn SpeechSynthesizer + Send>, shared: Arc<Shared>) {
    debug!(worker = idx, model = model.model_name(), "worker ready");

    while let Some(job) = shared.queue.pop() {
        shared.metrics.set_queue_size(shared.queue.len() as f64);

        // After a fatal error the model cannot be trusted; drain instead of run.
        if !shared.healthy.load(Ordering::Acquire) {
            let _ = job
                .reply
                .send(Err(TtsError::unavailable("scheduler is unhealthy")));
            continue;
        }

        if job.is_expired() {
            debug!(
                worker = idx,
                request_id = %job.request.id,
                waited_ms = job.wait_time().as_millis() as u64,
                "dropping expired job"
            );
            let ms = job.wait_time().as_millis() as u64;
            let _ = job.reply.send(Err(TtsError::Timeout { ms }));
            continue;
        }

        let start = Instant::now();
        let result = model.synthesize(&job.request);
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        match &result {
            Ok(audio) => {
                shared.metrics.request_completed();
                shared.metrics.record_inference_latency(elapsed_ms);
                let duration_ms = audio.duration_ms() as f64;
                if duration_ms > 0.0 {
                    shared.metrics.record_rtf(elapsed_ms / duration_ms);
                }
                debug!(
                    worker = idx,
                    request_id = %job.request.id,
                    inference_ms = elapsed_ms,
                    audio_ms = duration_ms,
                    "job completed"
                );
            }
            Err(e) => {
                shared.metrics.request_failed();
                if e.is_fatal() {
                    shared.healthy.store(false, Ordering::Release);
                    error!(
                        worker = idx,
                        request_id = %job.request.id,
                        error = %e,
                        "fatal model error, marking scheduler unhealthy"
                    );
                } else {
                    warn!(
                        worker = idx,
                        request_id = %job.request.id,
                        text_chars = job.request.text.chars().count(),
                        error = %e,
                        "job failed"
                    );
                }
            }
        }

        if job.reply.send(result).is_err() {
            // Caller hit its deadline and detached; the result is discarded.
            debug!(worker = idx, "caller detached before completion");
        }
    }

    debug!(worker = idx, "worker exiting");
}
