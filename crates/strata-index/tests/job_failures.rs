//! Integration tests for backend failures during job execution.
//!
//! A wrapper backend injects insert and remove failures on demand, and the
//! tests check that failed jobs leave data pending and searchable and that
//! retrying them converges.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use strata_index::tiered::{drain_all, drain_one, FifoJobQueue, JobKind, JobOutcome, JobQueue};
use strata_index::vector::{
    Algorithm, CommonParams, FlatIndex, FlatParams, IndexBackend, IndexInfo, InternalId, Label,
    LabelFilter, SearchHit, VectorIndex, VectorMetric,
};
use strata_index::{IndexError, IndexResult, TieredIndex};

const NEVER: usize = usize::MAX;

/// Flat backend that fails one insert (or remove) after a given number of
/// successful ones.
struct FlakyBackend {
    inner: FlatIndex,
    inserts_before_failure: Arc<AtomicUsize>,
    removes_before_failure: Arc<AtomicUsize>,
}

/// Count down one call; the call that finds zero fails and disarms.
fn call_fails(countdown: &AtomicUsize) -> bool {
    let prev = countdown.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
        NEVER => None,
        0 => Some(NEVER),
        n => Some(n - 1),
    });
    prev == Ok(0)
}

impl IndexBackend for FlakyBackend {
    fn algorithm(&self) -> Algorithm {
        self.inner.algorithm()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn metric(&self) -> VectorMetric {
        self.inner.metric()
    }

    fn is_multi(&self) -> bool {
        self.inner.is_multi()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn label_count(&self) -> usize {
        self.inner.label_count()
    }

    fn count_label(&self, label: Label) -> usize {
        self.inner.count_label(label)
    }

    fn insert(&mut self, label: Label, vector: &[f32]) -> IndexResult<InternalId> {
        if call_fails(&self.inserts_before_failure) {
            return Err(IndexError::backend("injected insert failure"));
        }
        self.inner.insert(label, vector)
    }

    fn remove(&mut self, label: Label) -> IndexResult<usize> {
        if call_fails(&self.removes_before_failure) {
            return Err(IndexError::backend("injected remove failure"));
        }
        self.inner.remove(label)
    }

    fn top_k(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&LabelFilter<'_>>,
    ) -> IndexResult<Vec<SearchHit>> {
        self.inner.top_k(query, k, filter)
    }

    fn range(
        &self,
        query: &[f32],
        radius: f32,
        filter: Option<&LabelFilter<'_>>,
    ) -> IndexResult<Vec<SearchHit>> {
        self.inner.range(query, radius, filter)
    }

    fn memory_usage(&self) -> usize {
        self.inner.memory_usage()
    }

    fn info(&self) -> IndexInfo {
        self.inner.info()
    }
}

struct Harness {
    index: Arc<TieredIndex>,
    queue: Arc<FifoJobQueue>,
    inserts_before_failure: Arc<AtomicUsize>,
    removes_before_failure: Arc<AtomicUsize>,
}

impl Harness {
    fn fail_insert_after(&self, successes: usize) {
        self.inserts_before_failure.store(successes, Ordering::SeqCst);
    }

    fn fail_remove_after(&self, successes: usize) {
        self.removes_before_failure.store(successes, Ordering::SeqCst);
    }
}

fn harness(swap_threshold: usize) -> Harness {
    let inserts_before_failure = Arc::new(AtomicUsize::new(NEVER));
    let removes_before_failure = Arc::new(AtomicUsize::new(NEVER));
    let backend = FlakyBackend {
        inner: FlatIndex::new(&FlatParams::new(
            CommonParams::new(2).with_metric(VectorMetric::L2),
        )),
        inserts_before_failure: Arc::clone(&inserts_before_failure),
        removes_before_failure: Arc::clone(&removes_before_failure),
    };
    let queue = Arc::new(FifoJobQueue::new());
    let index = TieredIndex::with_backend(Box::new(backend), swap_threshold, queue.clone());
    Harness {
        index,
        queue,
        inserts_before_failure,
        removes_before_failure,
    }
}

#[test]
fn test_failed_insert_keeps_label_pending_and_retry_migrates() {
    let h = harness(0);
    h.index.add_vector(Label(1), &[1.0, 0.0]).unwrap();
    h.fail_insert_after(0);

    let report = drain_one(h.queue.as_ref()).unwrap();
    assert!(report.is_failure());
    assert!(matches!(report.error(), Some(IndexError::Backend { .. })));

    // Still searchable from the frontend
    assert_eq!(h.index.pending_count(), 1);
    assert_eq!(h.index.top_k(&[1.0, 0.0], 1).unwrap()[0].label, Label(1));
    assert_eq!(h.index.job_stats().failed, 1);

    h.queue.submit(report.job.clone());
    let retry = drain_one(h.queue.as_ref()).unwrap();
    assert_eq!(retry.result.unwrap(), JobOutcome::Migrated { vectors: 1 });
    assert_eq!(h.index.pending_count(), 0);
    assert_eq!(h.index.len(), 1);
}

#[test]
fn test_partial_swap_retires_only_inserted_prefix() {
    let h = harness(3);
    for i in 0..3u64 {
        h.index.add_vector(Label(i), &[i as f32, 0.0]).unwrap();
    }
    // Rides along with the scheduled swap
    h.index.add_vector(Label(3), &[3.0, 0.0]).unwrap();

    // Two superseded inserts, then the swap
    drain_one(h.queue.as_ref()).unwrap();
    drain_one(h.queue.as_ref()).unwrap();
    let swap = h.queue.pop().unwrap();
    assert_eq!(swap.kind(), JobKind::Swap);
    assert_eq!(h.index.pending_count(), 4);

    h.fail_insert_after(1);
    assert!(swap.execute().is_err());

    let info = h.index.tiered_info();
    assert_eq!(info.backend.size, 1);
    assert_eq!(info.pending_vectors, 3);
    assert!(!info.swap_scheduled);
    assert_eq!(h.index.len(), 4);
    assert_eq!(h.index.job_stats().failed, 1);

    // Still at the threshold, so one new swap covers the rest
    assert_eq!(h.index.reschedule_pending(), 1);
    let reports = drain_all(h.queue.as_ref());
    assert_eq!(reports.len(), 1);
    assert_eq!(
        reports[0].result.as_ref().unwrap(),
        &JobOutcome::Migrated { vectors: 3 }
    );
    assert_eq!(h.index.pending_count(), 0);
    assert_eq!(h.index.tiered_info().backend.size, 4);
}

#[test]
fn test_reschedule_below_threshold_submits_inserts() {
    let h = harness(0);
    h.index.add_vector(Label(1), &[1.0, 0.0]).unwrap();
    h.index.add_vector(Label(2), &[2.0, 0.0]).unwrap();
    h.fail_insert_after(0);

    // Drop the failed job instead of resubmitting it
    let reports = drain_all(h.queue.as_ref());
    assert_eq!(reports.iter().filter(|r| r.is_failure()).count(), 1);
    assert_eq!(h.index.pending_count(), 1);

    assert_eq!(h.index.reschedule_pending(), 1);
    drain_all(h.queue.as_ref());
    assert_eq!(h.index.pending_count(), 0);
    assert_eq!(h.index.len(), 2);
}

#[test]
fn test_failed_repair_keeps_label_hidden() {
    let h = harness(0);
    h.index.add_vector(Label(5), &[5.0, 0.0]).unwrap();
    drain_all(h.queue.as_ref());

    h.index.delete_vector(Label(5)).unwrap();
    h.fail_remove_after(0);
    let report = drain_one(h.queue.as_ref()).unwrap();
    assert!(report.is_failure());

    assert_eq!(h.index.tombstone_count(), 1);
    assert!(h.index.top_k(&[5.0, 0.0], 3).unwrap().is_empty());
    assert!(h.index.is_empty());

    h.queue.submit(report.job);
    let retry = drain_one(h.queue.as_ref()).unwrap();
    assert_eq!(retry.result.unwrap(), JobOutcome::Repaired { removed: 1 });
    assert_eq!(h.index.tombstone_count(), 0);
    assert_eq!(h.index.tiered_info().backend.size, 0);
}

#[test]
fn test_reschedule_rearms_dropped_repairs() {
    let h = harness(0);
    h.index.add_vector(Label(8), &[8.0, 0.0]).unwrap();
    h.index.add_vector(Label(9), &[9.0, 0.0]).unwrap();
    drain_all(h.queue.as_ref());

    h.index.delete_vector(Label(8)).unwrap();
    h.index.add_vector(Label(10), &[10.0, 0.0]).unwrap();
    h.fail_remove_after(0);
    h.fail_insert_after(0);
    let reports = drain_all(h.queue.as_ref());
    assert_eq!(reports.iter().filter(|r| r.is_failure()).count(), 2);

    // One repair plus one insert
    assert_eq!(h.index.reschedule_pending(), 2);
    let reports = drain_all(h.queue.as_ref());
    assert!(reports.iter().all(|r| !r.is_failure()));
    assert_eq!(h.index.tombstone_count(), 0);
    assert_eq!(h.index.pending_count(), 0);
    assert_eq!(h.index.len(), 2);
}

#[test]
fn test_reschedule_replaces_lost_swap() {
    let h = harness(2);
    h.index.add_vector(Label(1), &[1.0, 0.0]).unwrap();
    h.index.add_vector(Label(2), &[2.0, 0.0]).unwrap();
    assert!(h.index.tiered_info().swap_scheduled);

    // The swap never reaches a worker
    while h.queue.pop().is_some() {}
    h.index.add_vector(Label(3), &[3.0, 0.0]).unwrap();
    assert!(h.queue.is_empty());

    assert_eq!(h.index.reschedule_pending(), 1);
    let reports = drain_all(h.queue.as_ref());
    assert_eq!(reports.len(), 1);
    assert_eq!(
        reports[0].result.as_ref().unwrap(),
        &JobOutcome::Migrated { vectors: 3 }
    );
    assert_eq!(h.index.pending_count(), 0);
    assert!(!h.index.tiered_info().swap_scheduled);

    // Later writes schedule their own jobs again
    h.index.add_vector(Label(4), &[4.0, 0.0]).unwrap();
    assert_eq!(h.queue.len(), 1);
    drain_all(h.queue.as_ref());
    assert_eq!(h.index.pending_count(), 0);
    assert_eq!(h.index.tiered_info().backend.size, 4);
}

#[test]
fn test_reschedule_below_threshold_clears_lost_swap() {
    let h = harness(2);
    h.index.add_vector(Label(1), &[1.0, 0.0]).unwrap();
    h.index.add_vector(Label(2), &[2.0, 0.0]).unwrap();
    while h.queue.pop().is_some() {}

    // Back under the threshold before recovery
    h.index.delete_vector(Label(2)).unwrap();
    assert_eq!(h.index.reschedule_pending(), 1);
    assert!(!h.index.tiered_info().swap_scheduled);
    drain_all(h.queue.as_ref());
    assert_eq!(h.index.pending_count(), 0);

    h.index.add_vector(Label(5), &[5.0, 0.0]).unwrap();
    let report = drain_one(h.queue.as_ref()).unwrap();
    assert_eq!(report.result.unwrap(), JobOutcome::Migrated { vectors: 1 });
    assert_eq!(h.index.len(), 2);
}
