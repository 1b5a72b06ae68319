//! Integration tests for the synthesis scheduler.
//!
//! These use purpose-built test voices instead of a real model so timing
//! and failure modes are controllable.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use habla_core::{
    AudioBuffer, SchedulerConfig, SpeechSynthesizer, SynthesisRequest, TtsError, TtsResult,
};
use habla_runtime::{Scheduler, TtsMetrics};

/// Test voice with a configurable inference delay; records processed texts.
struct SlowVoice {
    delay: Duration,
    processed: Arc<Mutex<Vec<String>>>,
    calls: Arc<AtomicUsize>,
}

impl SlowVoice {
    fn new(delay: Duration) -> (Self, Arc<Mutex<Vec<String>>>, Arc<AtomicUsize>) {
        let processed = Arc::new(Mutex::new(Vec::new()));
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                delay,
                processed: Arc::clone(&processed),
                calls: Arc::clone(&calls),
            },
            processed,
            calls,
        )
    }
}

impl SpeechSynthesizer for SlowVoice {
    fn synthesize(&mut self, request: &SynthesisRequest) -> TtsResult<AudioBuffer> {
        std::thread::sleep(self.delay);
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.processed.lock().push(request.text.clone());
        Ok(AudioBuffer::mono(vec![0.1; 2205], 22_050))
    }

    fn sample_rate(&self) -> u32 {
        22_050
    }

    fn model_name(&self) -> &str {
        "slow-test-voice"
    }
}

/// Test voice whose first call fails fatally (simulated device loss).
struct DyingVoice {
    calls: Arc<AtomicUsize>,
}

impl SpeechSynthesizer for DyingVoice {
    fn synthesize(&mut self, _request: &SynthesisRequest) -> TtsResult<AudioBuffer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TtsError::unavailable("device lost"))
    }

    fn sample_rate(&self) -> u32 {
        22_050
    }

    fn model_name(&self) -> &str {
        "dying-test-voice"
    }
}

fn scheduler_with(
    voice: impl SpeechSynthesizer + Send + 'static,
    config: SchedulerConfig,
) -> Scheduler {
    Scheduler::start(vec![Box::new(voice)], config, TtsMetrics::noop()).unwrap()
}

#[tokio::test]
async fn test_submit_returns_audio() {
    let (voice, _, _) = SlowVoice::new(Duration::from_millis(5));
    let scheduler = scheduler_with(voice, SchedulerConfig::default());

    let audio = scheduler
        .submit(SynthesisRequest::new("Hola"))
        .await
        .unwrap();
    assert!(audio.num_samples() > 0);
    assert_eq!(audio.sample_rate, 22_050);
    assert_eq!(scheduler.admitted(), 1);
}

#[tokio::test]
async fn test_fifo_completion_order() {
    let (voice, processed, _) = SlowVoice::new(Duration::from_millis(40));
    let scheduler = Arc::new(scheduler_with(voice, SchedulerConfig::default()));

    let a = {
        let s = Arc::clone(&scheduler);
        async move {
            let r = s.submit(SynthesisRequest::new("primero")).await;
            (Instant::now(), r)
        }
    };
    let b = {
        let s = Arc::clone(&scheduler);
        async move {
            let r = s.submit(SynthesisRequest::new("segundo")).await;
            (Instant::now(), r)
        }
    };

    // join! polls in order, so "primero" is admitted before "segundo".
    let ((t_a, r_a), (t_b, r_b)) = tokio::join!(a, b);
    r_a.unwrap();
    r_b.unwrap();

    assert!(t_a <= t_b, "first-admitted job must complete first");
    assert_eq!(*processed.lock(), vec!["primero", "segundo"]);
}

#[tokio::test]
async fn test_overload_rejects_excess_submissions() {
    let (voice, _, _) = SlowVoice::new(Duration::from_millis(400));
    let config = SchedulerConfig {
        queue_capacity: 2,
        ..SchedulerConfig::default()
    };
    let scheduler = Arc::new(scheduler_with(voice, config));

    // First job occupies the worker once popped.
    let first = {
        let s = Arc::clone(&scheduler);
        tokio::spawn(async move { s.submit(SynthesisRequest::new("ocupado")).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Two more fill the queue.
    let queued: Vec<_> = (0..2)
        .map(|i| {
            let s = Arc::clone(&scheduler);
            tokio::spawn(async move { s.submit(SynthesisRequest::new(format!("cola {i}"))).await })
        })
        .collect();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(scheduler.queue_depth(), 2);

    // The next submission must be rejected immediately, not queued.
    let start = Instant::now();
    let err = scheduler
        .submit(SynthesisRequest::new("desbordado"))
        .await
        .unwrap_err();
    assert!(matches!(err, TtsError::Overload { capacity: 2 }));
    assert!(start.elapsed() < Duration::from_millis(100));

    // Everything that was admitted still completes.
    first.await.unwrap().unwrap();
    for handle in queued {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(scheduler.admitted(), 3);
}

#[tokio::test]
async fn test_timeout_while_queued() {
    let (voice, processed, _) = SlowVoice::new(Duration::from_millis(400));
    let scheduler = Arc::new(scheduler_with(voice, SchedulerConfig::default()));

    let first = {
        let s = Arc::clone(&scheduler);
        tokio::spawn(async move { s.submit(SynthesisRequest::new("lento")).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    // This job's deadline elapses while it waits behind the slow one.
    let start = Instant::now();
    let err = scheduler
        .submit(SynthesisRequest::new("impaciente").with_timeout_ms(80))
        .await
        .unwrap_err();
    let elapsed = start.elapsed();

    assert!(matches!(err, TtsError::Timeout { .. }));
    assert!(
        elapsed >= Duration::from_millis(80) && elapsed < Duration::from_millis(300),
        "timeout must fire near the deadline, took {elapsed:?}"
    );

    first.await.unwrap().unwrap();

    // Give the worker time to observe and skip the expired job.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(
        !processed.lock().iter().any(|t| t == "impaciente"),
        "expired job must not run inference"
    );
}

#[tokio::test]
async fn test_fatal_error_marks_scheduler_unhealthy() {
    let calls = Arc::new(AtomicUsize::new(0));
    let voice = DyingVoice {
        calls: Arc::clone(&calls),
    };
    let scheduler = scheduler_with(voice, SchedulerConfig::default());

    let err = scheduler
        .submit(SynthesisRequest::new("primera"))
        .await
        .unwrap_err();
    assert!(matches!(err, TtsError::Unavailable(_)));

    // Wait for the worker to latch the health flag.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!scheduler.is_healthy());

    // Subsequent submissions are rejected without touching the model.
    let err = scheduler
        .submit(SynthesisRequest::new("segunda"))
        .await
        .unwrap_err();
    assert!(matches!(err, TtsError::Unavailable(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.admitted(), 1);
}

#[tokio::test]
async fn test_parallel_workers_use_independent_replicas() {
    let (voice_a, _, calls_a) = SlowVoice::new(Duration::from_millis(100));
    let (voice_b, _, calls_b) = SlowVoice::new(Duration::from_millis(100));
    let config = SchedulerConfig {
        workers: 2,
        ..SchedulerConfig::default()
    };
    let scheduler = Arc::new(
        Scheduler::start(
            vec![Box::new(voice_a), Box::new(voice_b)],
            config,
            TtsMetrics::noop(),
        )
        .unwrap(),
    );

    let start = Instant::now();
    let jobs: Vec<_> = (0..2)
        .map(|i| {
            let s = Arc::clone(&scheduler);
            tokio::spawn(async move { s.submit(SynthesisRequest::new(format!("par {i}"))).await })
        })
        .collect();
    for handle in jobs {
        handle.await.unwrap().unwrap();
    }

    // Two 100ms jobs across two replicas overlap instead of serializing.
    assert!(start.elapsed() < Duration::from_millis(190));
    assert_eq!(
        calls_a.load(Ordering::SeqCst) + calls_b.load(Ordering::SeqCst),
        2
    );
}

#[tokio::test]
async fn test_shutdown_joins_workers() {
    let (voice, _, _) = SlowVoice::new(Duration::from_millis(5));
    let scheduler = scheduler_with(voice, SchedulerConfig::default());

    scheduler
        .submit(SynthesisRequest::new("adios"))
        .await
        .unwrap();
    scheduler.shutdown();

    // After shutdown nothing can be admitted.
    let err = scheduler
        .submit(SynthesisRequest::new("tarde"))
        .await
        .unwrap_err();
    assert!(matches!(err, TtsError::Overload { .. } | TtsError::Unavailable(_)));
}

#[tokio::test]
async fn test_scheduler_requires_replicas() {
    let result = Scheduler::start(Vec::new(), SchedulerConfig::default(), TtsMetrics::noop());
    assert!(result.is_err());
}
