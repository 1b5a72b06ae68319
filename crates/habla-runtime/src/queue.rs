//! Bounded FIFO job queue.
//!
//! Admission order is the service's ordering guarantee: with a single
//! worker, jobs complete strictly oldest-first. The queue is bounded so a
//! backlog of long texts cannot grow memory without limit; a full queue
//! rejects the push and the caller surfaces backpressure immediately.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio::sync::oneshot;

use habla_core::{AudioBuffer, SynthesisRequest, TtsResult};

/// A queued unit of synthesis work plus its completion channel.
#[derive(Debug)]
pub struct Job {
    /// The validated synthesis request.
    pub request: SynthesisRequest,
    /// When the job was admitted.
    pub queued_at: Instant,
    /// Absolute deadline; jobs past it are not run.
    pub deadline: Instant,
    /// Channel the worker answers on. Exactly one terminal result is sent;
    /// if the caller has already detached, the send is a no-op.
    pub reply: oneshot::Sender<TtsResult<AudioBuffer>>,
}

impl Job {
    /// Create a job expiring `timeout` from now.
    pub fn new(
        request: SynthesisRequest,
        timeout: Duration,
        reply: oneshot::Sender<TtsResult<AudioBuffer>>,
    ) -> Self {
        let now = Instant::now();
        Self {
            request,
            queued_at: now,
            deadline: now + timeout,
            reply,
        }
    }

    /// Whether the deadline has passed.
    pub fn is_expired(&self) -> bool {
        Instant::now() > self.deadline
    }

    /// Time spent waiting since admission.
    pub fn wait_time(&self) -> Duration {
        self.queued_at.elapsed()
    }
}

struct Inner {
    jobs: VecDeque<Job>,
    closed: bool,
}

/// Bounded FIFO queue shared between submitters and worker threads.
pub struct JobQueue {
    inner: Mutex<Inner>,
    available: Condvar,
    capacity: usize,
}

impl JobQueue {
    /// Create a queue holding at most `capacity` pending jobs.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                jobs: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            available: Condvar::new(),
            capacity,
        }
    }

    /// Append a job, failing when the queue is at capacity or closed.
    /// The job is handed back so the caller keeps its reply channel.
    pub fn push(&self, job: Job) -> Result<(), Job> {
        let mut inner = self.inner.lock();
        if inner.closed || inner.jobs.len() >= self.capacity {
            return Err(job);
        }
        inner.jobs.push_back(job);
        drop(inner);
        self.available.notify_one();
        Ok(())
    }

    /// Remove the oldest job, blocking until one is available.
    /// Returns `None` once the queue is closed and drained.
    pub fn pop(&self) -> Option<Job> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(job) = inner.jobs.pop_front() {
                return Some(job);
            }
            if inner.closed {
                return None;
            }
            self.available.wait(&mut inner);
        }
    }

    /// Close the queue and wake all waiting workers. Jobs still queued are
    /// drained by workers before they exit.
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.available.notify_all();
    }

    /// Current number of pending jobs.
    pub fn len(&self) -> usize {
        self.inner.lock().jobs.len()
    }

    /// Whether the queue has no pending jobs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the queue is at capacity.
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Whether the queue has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Maximum number of pending jobs.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
