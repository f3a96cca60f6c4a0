//! Job queue seam between a tiered index and the worker pool.
//!
//! The queue stores jobs and nothing else. Threads, scheduling and retry
//! policy belong to whoever drains it.

use super::job::{Job, JobReport};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::Duration;

/// Linearizable job queue shared by writers and workers.
pub trait JobQueue: Send + Sync {
    /// Enqueue a job.
    fn submit(&self, job: Job);

    /// Dequeue the next job, if any.
    fn pop(&self) -> Option<Job>;

    /// Number of queued jobs.
    fn len(&self) -> usize;

    /// Check if the queue is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// First-in first-out queue.
#[derive(Debug, Default)]
pub struct FifoJobQueue {
    jobs: Mutex<VecDeque<Job>>,
    ready: Condvar,
}

impl FifoJobQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Dequeue the next job, waiting up to `timeout` for one to arrive.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<Job> {
        let mut jobs = self.jobs.lock();
        if jobs.is_empty() {
            self.ready.wait_for(&mut jobs, timeout);
        }
        jobs.pop_front()
    }
}

impl JobQueue for FifoJobQueue {
    fn submit(&self, job: Job) {
        self.jobs.lock().push_back(job);
        self.ready.notify_one();
    }

    fn pop(&self) -> Option<Job> {
        self.jobs.lock().pop_front()
    }

    fn len(&self) -> usize {
        self.jobs.lock().len()
    }
}

/// Pop one job and execute it.
///
/// Returns `None` when the queue is empty. Failures are already logged by
/// the index that ran the job.
pub fn drain_one(queue: &dyn JobQueue) -> Option<JobReport> {
    let job = queue.pop()?;
    let result = job.execute();
    Some(JobReport { job, result })
}

/// Execute jobs until the queue is empty, returning every report.
///
/// Failed jobs are not resubmitted.
pub fn drain_all(queue: &dyn JobQueue) -> Vec<JobReport> {
    std::iter::from_fn(|| drain_one(queue)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiered::job::{JobKind, JobOutcome};
    use crate::vector::Label;
    use std::sync::{Arc, Weak};
    use std::thread;

    fn job(seq: u64) -> Job {
        Job::new(JobKind::Insert(Label(seq)), seq, Weak::new())
    }

    #[test]
    fn test_fifo_order() {
        let queue = FifoJobQueue::new();
        queue.submit(job(1));
        queue.submit(job(2));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.pop().unwrap().seq(), 1);
        assert_eq!(queue.pop().unwrap().seq(), 2);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_drain_reports_outcomes() {
        let queue = FifoJobQueue::new();
        queue.submit(job(1));
        queue.submit(job(2));

        let reports = drain_all(&queue);
        assert_eq!(reports.len(), 2);
        assert!(reports
            .iter()
            .all(|r| matches!(r.result, Ok(JobOutcome::IndexDropped))));
        assert!(drain_one(&queue).is_none());
    }

    #[test]
    fn test_pop_timeout_wakes_on_submit() {
        let queue = Arc::new(FifoJobQueue::new());
        assert!(queue.pop_timeout(Duration::from_millis(5)).is_none());

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.submit(job(9)))
        };
        let popped = queue.pop_timeout(Duration::from_secs(5));
        producer.join().unwrap();

        // The submit may land before or after the wait starts
        let popped = popped.or_else(|| queue.pop());
        assert_eq!(popped.unwrap().seq(), 9);
    }
}
