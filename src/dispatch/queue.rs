//! Bounded job queue
//!
//! FIFO queue between the ingestion path and the worker pool. Pushes never
//! block; a full queue resolves through the configured overflow policy. The
//! lock is held only across the push/pop itself, never across an analysis
//! call.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

use super::types::{AnalysisJob, OverflowPolicy};

/// What happened to a pushed job
#[derive(Debug)]
pub enum PushOutcome {
    /// Job accepted
    Queued,

    /// Queue full; the new job was rejected
    RejectedNewest(AnalysisJob),

    /// Queue full; the oldest queued job was evicted to make room
    EvictedOldest(AnalysisJob),

    /// Queue closed; the job was rejected
    Closed(AnalysisJob),
}

/// Bounded FIFO queue of analysis jobs
pub struct JobQueue {
    jobs: Mutex<VecDeque<AnalysisJob>>,
    capacity: usize,
    policy: OverflowPolicy,
    closed: AtomicBool,
    notify: Notify,
}

impl JobQueue {
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            jobs: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            policy,
            closed: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Push without blocking; a full queue resolves through the overflow policy
    pub fn push(&self, job: AnalysisJob) -> PushOutcome {
        if self.closed.load(Ordering::Acquire) {
            return PushOutcome::Closed(job);
        }

        let outcome = {
            let mut jobs = self.jobs.lock();
            if jobs.len() < self.capacity {
                jobs.push_back(job);
                PushOutcome::Queued
            } else {
                match self.policy {
                    OverflowPolicy::DropNewest => PushOutcome::RejectedNewest(job),
                    OverflowPolicy::DropOldest => {
                        let evicted = jobs.pop_front();
                        jobs.push_back(job);
                        match evicted {
                            Some(oldest) => PushOutcome::EvictedOldest(oldest),
                            // Capacity is at least 1, so a full queue always
                            // has a head to evict.
                            None => PushOutcome::Queued,
                        }
                    }
                }
            }
        };

        if matches!(outcome, PushOutcome::Queued | PushOutcome::EvictedOldest(_)) {
            self.notify.notify_one();
        }
        outcome
    }

    /// Await the next job; `None` once the queue is closed and drained
    pub async fn pop(&self) -> Option<AnalysisJob> {
        loop {
            let notified = self.notify.notified();

            if let Some(job) = self.jobs.lock().pop_front() {
                return Some(job);
            }
            if self.closed.load(Ordering::Acquire) {
                // Pass the shutdown wakeup along to the next waiter.
                self.notify.notify_one();
                return None;
            }

            notified.await;
        }
    }

    /// Refuse further pushes; waiting consumers drain what remains
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    /// Drop all queued jobs, returning how many were discarded
    pub fn clear(&self) -> usize {
        let mut jobs = self.jobs.lock();
        let discarded = jobs.len();
        jobs.clear();
        discarded
    }

    /// Jobs currently waiting
    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }
}
