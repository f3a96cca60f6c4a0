//! Tiered index: a flat write buffer in front of a slower backend.
//!
//! Writes land in the frontend [`FlatIndex`] and return immediately. Each
//! write submits a [`Job`] that a caller-owned worker pool later executes to
//! move the data into the backend (or to physically remove deleted data
//! from it). Searches query both tiers and merge the results.
//!
//! ## Locking
//!
//! - The frontend lock guards the buffer, the tombstones and the swap flag.
//!   Searches take it shared, writes exclusively, and jobs take it
//!   upgradable so searches keep running while the backend is mutated.
//! - The backend lock guards the backend.
//! - Order is always frontend then backend. A job releases the backend
//!   before upgrading the frontend lock to retire migrated entries.
//!
//! Only one job runs at a time (upgradable locks exclude each other), so
//! jobs for the same label take effect in submission order.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use strata_index::tiered::{drain_all, FifoJobQueue, JobQueue};
//! use strata_index::vector::{new_tiered_index, CommonParams, FlatParams, Label, TieredParams, VectorIndex};
//!
//! let queue = Arc::new(FifoJobQueue::new());
//! let params = TieredParams::new(FlatParams::new(CommonParams::new(2)).into());
//! let index = new_tiered_index(&params, queue.clone())?;
//!
//! index.add_vector(Label(1), &[1.0, 0.0])?;
//! assert_eq!(index.pending_count(), 1);
//!
//! drain_all(queue.as_ref());
//! assert_eq!(index.pending_count(), 0);
//! assert_eq!(index.top_k(&[1.0, 0.0], 1)?[0].label, Label(1));
//! # Ok::<(), strata_index::IndexError>(())
//! ```

mod job;
mod merge;
mod queue;

pub use job::{Job, JobKind, JobOutcome, JobReport, SkipReason};
pub use queue::{drain_all, drain_one, FifoJobQueue, JobQueue};

use crate::error::{IndexError, IndexResult};
use crate::vector::{
    frontend_params, validate_radius, validate_vector, Algorithm, CommonParams, FlatIndex,
    IndexBackend, IndexInfo, InternalId, Label, SearchHit, VectorIndex, VectorMetric,
    VectorRecord,
};
use merge::merge_hits;
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::mem::size_of;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, trace, warn};

/// State guarded by the frontend lock.
struct Frontend {
    flat: FlatIndex,
    /// Backend vector count of each tombstoned label at tombstoning time.
    tombstones: HashMap<Label, usize>,
    swap_scheduled: bool,
    /// Sequence number of the last scheduled swap.
    swap_seq: u64,
}

#[derive(Debug, Default)]
struct JobCounters {
    submitted: AtomicU64,
    executed: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    migrated: AtomicU64,
    repaired: AtomicU64,
}

impl JobCounters {
    fn snapshot(&self) -> JobStats {
        JobStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            executed: self.executed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            migrated_vectors: self.migrated.load(Ordering::Relaxed),
            repaired_vectors: self.repaired.load(Ordering::Relaxed),
        }
    }
}

/// Job counters since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStats {
    pub submitted: u64,
    /// Jobs that ran to completion, no-ops included.
    pub executed: u64,
    pub skipped: u64,
    pub failed: u64,
    pub migrated_vectors: u64,
    pub repaired_vectors: u64,
}

/// Tiered-specific statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TieredInfo {
    /// Labels held only by the frontend.
    pub pending_labels: usize,
    /// Vectors held by the frontend.
    pub pending_vectors: usize,
    /// Distinct labels visible to searches across both tiers.
    pub live_labels: usize,
    /// Labels whose backend copies await repair.
    pub tombstones: usize,
    /// Backend vectors hidden by tombstones.
    pub tombstoned_vectors: usize,
    /// Jobs waiting in the queue (all indexes sharing it).
    pub queued_jobs: usize,
    pub swap_threshold: usize,
    pub swap_scheduled: bool,
    /// Whether background work is outstanding.
    pub background_indexing: bool,
    pub jobs: JobStats,
    pub frontend: IndexInfo,
    pub backend: IndexInfo,
}

/// Flat write buffer plus a backend, coordinated through background jobs.
pub struct TieredIndex {
    dimension: usize,
    metric: VectorMetric,
    multi: bool,
    swap_threshold: usize,

    frontend: RwLock<Frontend>,
    backend: RwLock<Box<dyn IndexBackend>>,

    queue: Arc<dyn JobQueue>,
    next_seq: AtomicU64,
    counters: JobCounters,
    this: Weak<TieredIndex>,
}

impl TieredIndex {
    /// Put a frontend buffer in front of `backend`.
    ///
    /// The buffer copies the backend's dimension, metric and multi-value mode.
    pub fn with_backend(
        backend: Box<dyn IndexBackend>,
        swap_threshold: usize,
        queue: Arc<dyn JobQueue>,
    ) -> Arc<Self> {
        let frontend = frontend_params(
            &CommonParams::new(backend.dimension())
                .with_metric(backend.metric())
                .with_multi(backend.is_multi()),
            swap_threshold,
        );
        Self::build(backend, frontend, swap_threshold, queue)
    }

    pub(crate) fn build(
        backend: Box<dyn IndexBackend>,
        frontend: CommonParams,
        swap_threshold: usize,
        queue: Arc<dyn JobQueue>,
    ) -> Arc<Self> {
        debug!(
            "Creating tiered index over {} backend (dimension={}, swapThreshold={})",
            backend.algorithm(),
            backend.dimension(),
            swap_threshold
        );

        Arc::new_cyclic(|this| Self {
            dimension: backend.dimension(),
            metric: backend.metric(),
            multi: backend.is_multi(),
            swap_threshold,
            frontend: RwLock::new(Frontend {
                flat: FlatIndex::from_common(&frontend),
                tombstones: HashMap::new(),
                swap_scheduled: false,
                swap_seq: 0,
            }),
            backend: RwLock::new(backend),
            queue,
            next_seq: AtomicU64::new(0),
            counters: JobCounters::default(),
            this: this.clone(),
        })
    }

    /// Labels held only by the frontend.
    pub fn pending_count(&self) -> usize {
        self.frontend.read().flat.label_count()
    }

    /// Labels whose backend copies await repair.
    pub fn tombstone_count(&self) -> usize {
        self.frontend.read().tombstones.len()
    }

    /// Configured swap threshold.
    pub fn swap_threshold(&self) -> usize {
        self.swap_threshold
    }

    /// Job counters since construction.
    pub fn job_stats(&self) -> JobStats {
        self.counters.snapshot()
    }

    /// Submit migration jobs for every pending label and repair jobs for
    /// every tombstone.
    ///
    /// Use after failed jobs were dropped instead of resubmitted. A swap that
    /// was scheduled earlier may be among them, so a fresh one is always
    /// submitted when the buffer is at the threshold. Returns the number of
    /// jobs submitted.
    pub fn reschedule_pending(&self) -> usize {
        let mut front = self.frontend.write();

        let mut tombstoned: Vec<Label> = front.tombstones.keys().copied().collect();
        tombstoned.sort_unstable();
        for &label in &tombstoned {
            self.submit(JobKind::Repair(label));
        }
        let mut submitted = tombstoned.len();

        let batch = self.swap_threshold > 0 && front.flat.len() >= self.swap_threshold;
        if batch {
            self.schedule_swap(&mut front);
            submitted += 1;
        } else {
            // Per-label inserts cover the buffer; later writes schedule again
            front.swap_scheduled = false;
            let labels = front.flat.labels();
            for &label in &labels {
                self.submit(JobKind::Insert(label));
            }
            submitted += labels.len();
        }

        debug!("Rescheduled {} jobs", submitted);
        submitted
    }

    /// Tiered statistics snapshot.
    pub fn tiered_info(&self) -> TieredInfo {
        // Upgradable excludes running jobs, so no half-migrated state is seen
        let front = self.frontend.upgradable_read();
        let backend = self.backend.read();

        // Tombstoned labels always still exist in the backend
        let backend_live = backend.label_count().saturating_sub(front.tombstones.len());
        let frontend_only = front
            .flat
            .labels()
            .into_iter()
            .filter(|label| front.tombstones.contains_key(label) || backend.count_label(*label) == 0)
            .count();

        TieredInfo {
            pending_labels: front.flat.label_count(),
            live_labels: backend_live + frontend_only,
            pending_vectors: front.flat.len(),
            tombstones: front.tombstones.len(),
            tombstoned_vectors: front.tombstones.values().sum(),
            queued_jobs: self.queue.len(),
            swap_threshold: self.swap_threshold,
            swap_scheduled: front.swap_scheduled,
            background_indexing: !front.flat.is_empty() || !front.tombstones.is_empty(),
            jobs: self.counters.snapshot(),
            frontend: front.flat.info(),
            backend: backend.info(),
        }
    }

    fn submit(&self, kind: JobKind) {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        trace!("Submitting job #{} {}", seq, kind);
        self.queue.submit(Job::new(kind, seq, self.this.clone()));
    }

    fn schedule_swap(&self, front: &mut Frontend) {
        front.swap_scheduled = true;
        front.swap_seq = self.next_seq.load(Ordering::SeqCst);
        debug!(
            "Pending buffer reached {} vectors, scheduling swap",
            front.flat.len()
        );
        self.submit(JobKind::Swap);
    }

    fn tombstone(&self, front: &mut Frontend, label: Label, backend_count: usize) {
        front.tombstones.insert(label, backend_count);
        self.submit(JobKind::Repair(label));
    }

    // ------------------------------------------------------------------------
    // Job execution
    // ------------------------------------------------------------------------

    pub(crate) fn execute_job(&self, job: &Job) -> IndexResult<JobOutcome> {
        let result = match job.kind() {
            JobKind::Insert(label) => self.run_insert(job.seq(), label),
            JobKind::Repair(label) => self.run_repair(label),
            JobKind::Swap => self.run_swap(),
        };

        match &result {
            Ok(outcome) => {
                self.counters.executed.fetch_add(1, Ordering::Relaxed);
                match outcome {
                    JobOutcome::Skipped(reason) => {
                        self.counters.skipped.fetch_add(1, Ordering::Relaxed);
                        trace!("Job {} skipped: {}", job, reason);
                    }
                    JobOutcome::Migrated { vectors } => {
                        self.counters
                            .migrated
                            .fetch_add(*vectors as u64, Ordering::Relaxed);
                    }
                    JobOutcome::Repaired { removed } => {
                        self.counters
                            .repaired
                            .fetch_add(*removed as u64, Ordering::Relaxed);
                    }
                    JobOutcome::IndexDropped => {}
                }
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!("Job {} failed, data stays pending: {}", job, e);
            }
        }
        result
    }

    fn run_insert(&self, seq: u64, label: Label) -> IndexResult<JobOutcome> {
        let front = self.frontend.upgradable_read();
        if front.swap_scheduled && seq < front.swap_seq {
            return Ok(JobOutcome::Skipped(SkipReason::Superseded));
        }

        let pending = front.flat.vectors_of(label);
        if pending.is_empty() {
            return Ok(JobOutcome::Skipped(SkipReason::NotPending));
        }
        let stale = front.tombstones.contains_key(&label);
        let records: Vec<VectorRecord> = pending.iter().map(|(_, r)| r.clone()).collect();

        let batch = {
            let mut backend = self.backend.write();
            if stale {
                backend.remove(label)?;
            }
            backend.insert_batch(&records)
        };

        let mut front = RwLockUpgradableReadGuard::upgrade(front);
        if stale {
            front.tombstones.remove(&label);
        }
        let migrated: Vec<InternalId> = pending[..batch.inserted]
            .iter()
            .map(|(id, _)| *id)
            .collect();
        front.flat.remove_slots(migrated);

        match batch.error {
            Some(e) => Err(e),
            None => {
                trace!("Migrated label {} ({} vectors)", label, batch.inserted);
                Ok(JobOutcome::Migrated {
                    vectors: batch.inserted,
                })
            }
        }
    }

    fn run_repair(&self, label: Label) -> IndexResult<JobOutcome> {
        let front = self.frontend.upgradable_read();
        if !front.tombstones.contains_key(&label) {
            return Ok(JobOutcome::Skipped(SkipReason::NotTombstoned));
        }

        let removed = self.backend.write().remove(label)?;

        let mut front = RwLockUpgradableReadGuard::upgrade(front);
        front.tombstones.remove(&label);
        trace!("Repaired label {} ({} vectors)", label, removed);
        Ok(JobOutcome::Repaired { removed })
    }

    fn run_swap(&self) -> IndexResult<JobOutcome> {
        let front = self.frontend.upgradable_read();
        let pending = front.flat.records();
        if pending.is_empty() {
            let mut front = RwLockUpgradableReadGuard::upgrade(front);
            front.swap_scheduled = false;
            return Ok(JobOutcome::Skipped(SkipReason::NothingPending));
        }

        let mut stale: Vec<Label> = pending
            .iter()
            .map(|(_, r)| r.label)
            .filter(|label| front.tombstones.contains_key(label))
            .collect();
        stale.sort_unstable();
        stale.dedup();

        let records: Vec<VectorRecord> = pending.iter().map(|(_, r)| r.clone()).collect();
        let mut cleared: Vec<Label> = Vec::with_capacity(stale.len());
        let (inserted, error) = {
            let mut backend = self.backend.write();
            let mut failure: Option<IndexError> = None;
            for &label in &stale {
                match backend.remove(label) {
                    Ok(_) => cleared.push(label),
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
            match failure {
                Some(e) => (0, Some(e)),
                None => {
                    let batch = backend.insert_batch(&records);
                    (batch.inserted, batch.error)
                }
            }
        };

        let mut front = RwLockUpgradableReadGuard::upgrade(front);
        for label in &cleared {
            front.tombstones.remove(label);
        }
        let migrated: Vec<InternalId> = pending[..inserted].iter().map(|(id, _)| *id).collect();
        front.flat.remove_slots(migrated);
        front.swap_scheduled = false;

        match error {
            Some(e) => Err(e),
            None => {
                info!("Swap migrated {} vectors into the backend", inserted);
                Ok(JobOutcome::Migrated { vectors: inserted })
            }
        }
    }
}

impl VectorIndex for TieredIndex {
    fn add_vector(&self, label: Label, vector: &[f32]) -> IndexResult<usize> {
        validate_vector(self.dimension, vector)?;

        let mut front = self.frontend.write();
        let was_pending = front.flat.contains(label);

        // A single-value backend copy is replaced, so it gets tombstoned
        let replaced_in_backend =
            if self.multi || was_pending || front.tombstones.contains_key(&label) {
                0
            } else {
                self.backend.read().count_label(label)
            };

        front.flat.insert(label, vector)?;

        let mut added = if !self.multi && was_pending { 0 } else { 1 };
        if replaced_in_backend > 0 {
            self.tombstone(&mut front, label, replaced_in_backend);
            added = 0;
        }

        if front.swap_scheduled {
            // The scheduled swap picks this write up
        } else if self.swap_threshold > 0 && front.flat.len() >= self.swap_threshold {
            self.schedule_swap(&mut front);
        } else if !was_pending {
            self.submit(JobKind::Insert(label));
        }

        Ok(added)
    }

    fn delete_vector(&self, label: Label) -> IndexResult<usize> {
        let mut front = self.frontend.write();
        let mut removed = front.flat.remove(label)?;

        if !front.tombstones.contains_key(&label) {
            let in_backend = self.backend.read().count_label(label);
            if in_backend > 0 {
                self.tombstone(&mut front, label, in_backend);
                removed += in_backend;
            }
        }

        trace!("Deleted label {} ({} vectors)", label, removed);
        Ok(removed)
    }

    fn top_k(&self, query: &[f32], k: usize) -> IndexResult<Vec<SearchHit>> {
        validate_vector(self.dimension, query)?;
        trace!("Tiered top-k search, k={}", k);

        let front = self.frontend.read();
        let frontend_hits = front.flat.top_k(query, k, None)?;
        let backend_hits = {
            let backend = self.backend.read();
            if front.tombstones.is_empty() {
                backend.top_k(query, k, None)?
            } else {
                let tombstones = &front.tombstones;
                let live = |label: Label| !tombstones.contains_key(&label);
                backend.top_k(query, k, Some(&live))?
            }
        };
        drop(front);

        Ok(merge_hits(frontend_hits, backend_hits, self.multi, Some(k)))
    }

    fn range(&self, query: &[f32], radius: f32) -> IndexResult<Vec<SearchHit>> {
        validate_vector(self.dimension, query)?;
        validate_radius(radius)?;

        let front = self.frontend.read();
        let frontend_hits = front.flat.range(query, radius, None)?;
        let backend_hits = {
            let backend = self.backend.read();
            if front.tombstones.is_empty() {
                backend.range(query, radius, None)?
            } else {
                let tombstones = &front.tombstones;
                let live = |label: Label| !tombstones.contains_key(&label);
                backend.range(query, radius, Some(&live))?
            }
        };
        drop(front);

        Ok(merge_hits(frontend_hits, backend_hits, self.multi, None))
    }

    fn info(&self) -> IndexInfo {
        let tiered = self.tiered_info();
        let front = &tiered.frontend;
        let back = &tiered.backend;

        let mut details = BTreeMap::new();
        details.insert("pendingLabels".to_string(), tiered.pending_labels.into());
        details.insert("pendingVectors".to_string(), tiered.pending_vectors.into());
        details.insert("tombstones".to_string(), tiered.tombstones.into());
        details.insert(
            "tombstonedVectors".to_string(),
            tiered.tombstoned_vectors.into(),
        );
        details.insert("queuedJobs".to_string(), tiered.queued_jobs.into());
        details.insert("swapThreshold".to_string(), tiered.swap_threshold.into());
        details.insert("swapScheduled".to_string(), tiered.swap_scheduled.into());
        details.insert(
            "backgroundIndexing".to_string(),
            tiered.background_indexing.into(),
        );
        details.insert("jobs".to_string(), serde_json::json!(tiered.jobs));
        details.insert("frontend".to_string(), serde_json::json!(front));
        details.insert("backend".to_string(), serde_json::json!(back));

        IndexInfo {
            algorithm: Algorithm::Tiered,
            dimension: self.dimension,
            metric: self.metric,
            multi: self.multi,
            size: (front.size + back.size).saturating_sub(tiered.tombstoned_vectors),
            label_count: tiered.live_labels,
            memory_bytes: front.memory_bytes + back.memory_bytes + size_of::<Self>(),
            details,
        }
    }

    fn len(&self) -> usize {
        let front = self.frontend.upgradable_read();
        let stale: usize = front.tombstones.values().sum();
        (front.flat.len() + self.backend.read().len()).saturating_sub(stale)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> VectorMetric {
        self.metric
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{FlatParams, HnswParams, TieredParams};

    fn tiered(swap_threshold: usize) -> (Arc<TieredIndex>, Arc<FifoJobQueue>) {
        let queue = Arc::new(FifoJobQueue::new());
        let params = TieredParams::new(
            FlatParams::new(CommonParams::new(2).with_metric(VectorMetric::L2)).into(),
        )
        .with_swap_threshold(swap_threshold);
        let index = crate::vector::new_tiered_index(&params, queue.clone()).unwrap();
        (index, queue)
    }

    fn backend_count(index: &TieredIndex, label: Label) -> usize {
        index.backend.read().count_label(label)
    }

    #[test]
    fn test_add_is_pending_until_drained() {
        let (index, queue) = tiered(0);
        assert_eq!(index.add_vector(Label(1), &[1.0, 0.0]).unwrap(), 1);
        assert_eq!(index.pending_count(), 1);
        assert_eq!(queue.len(), 1);
        assert_eq!(index.top_k(&[1.0, 0.0], 1).unwrap()[0].label, Label(1));

        let report = drain_one(queue.as_ref()).unwrap();
        assert_eq!(report.result.unwrap(), JobOutcome::Migrated { vectors: 1 });
        assert_eq!(index.pending_count(), 0);
        assert_eq!(backend_count(&index, Label(1)), 1);
        assert_eq!(index.top_k(&[1.0, 0.0], 5).unwrap().len(), 1);
    }

    #[test]
    fn test_readd_pending_label_submits_nothing() {
        let (index, queue) = tiered(0);
        index.add_vector(Label(1), &[1.0, 0.0]).unwrap();
        assert_eq!(index.add_vector(Label(1), &[2.0, 0.0]).unwrap(), 0);
        assert_eq!(queue.len(), 1);

        drain_all(queue.as_ref());
        let hits = index.top_k(&[2.0, 0.0], 1).unwrap();
        assert_eq!(hits, vec![SearchHit::new(1u64, -0.0)]);
    }

    #[test]
    fn test_readd_migrated_label_tombstones_backend_copy() {
        let (index, queue) = tiered(0);
        index.add_vector(Label(1), &[1.0, 0.0]).unwrap();
        drain_all(queue.as_ref());

        assert_eq!(index.add_vector(Label(1), &[5.0, 0.0]).unwrap(), 0);
        assert_eq!(index.tombstone_count(), 1);
        assert_eq!(index.len(), 1);

        // Only the new copy is visible
        let hits = index.top_k(&[1.0, 0.0], 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert!((hits[0].score + 4.0).abs() < 1e-6);

        drain_all(queue.as_ref());
        assert_eq!(index.tombstone_count(), 0);
        assert_eq!(backend_count(&index, Label(1)), 1);
        assert_eq!(index.pending_count(), 0);
    }

    #[test]
    fn test_delete_counts_both_tiers() {
        let (index, queue) = tiered(0);
        index.add_vector(Label(1), &[1.0, 0.0]).unwrap();
        drain_all(queue.as_ref());

        assert_eq!(index.delete_vector(Label(1)).unwrap(), 1);
        assert_eq!(index.delete_vector(Label(1)).unwrap(), 0);
        assert_eq!(queue.len(), 1);
        assert!(index.is_empty());
    }

    #[test]
    fn test_swap_supersedes_inserts() {
        let (index, queue) = tiered(3);
        for i in 0..3u64 {
            index.add_vector(Label(i), &[i as f32, 0.0]).unwrap();
        }
        assert!(index.tiered_info().swap_scheduled);

        // Writes after the swap was scheduled ride along with it
        index.add_vector(Label(9), &[9.0, 0.0]).unwrap();
        assert_eq!(queue.len(), 3);

        let outcomes: Vec<JobOutcome> = drain_all(queue.as_ref())
            .into_iter()
            .map(|r| r.result.unwrap())
            .collect();
        assert_eq!(
            outcomes,
            vec![
                JobOutcome::Skipped(SkipReason::Superseded),
                JobOutcome::Skipped(SkipReason::Superseded),
                JobOutcome::Migrated { vectors: 4 },
            ]
        );
        assert_eq!(index.pending_count(), 0);
        assert!(!index.tiered_info().swap_scheduled);
    }

    #[test]
    fn test_reschedule_pending() {
        let (index, queue) = tiered(0);
        index.add_vector(Label(1), &[1.0, 0.0]).unwrap();
        index.add_vector(Label(2), &[2.0, 0.0]).unwrap();
        while queue.pop().is_some() {}

        assert_eq!(index.reschedule_pending(), 2);
        drain_all(queue.as_ref());
        assert_eq!(index.pending_count(), 0);
        assert_eq!(index.reschedule_pending(), 0);
    }

    #[test]
    fn test_info_reports_tiers() {
        let queue: Arc<dyn JobQueue> = Arc::new(FifoJobQueue::new());
        let params = TieredParams::new(
            HnswParams::new(CommonParams::new(2)).with_seed(3).into(),
        );
        let index = crate::vector::new_tiered_index(&params, queue.clone()).unwrap();
        index.add_vector(Label(1), &[1.0, 0.0]).unwrap();
        index.add_vector(Label(2), &[0.0, 1.0]).unwrap();
        drain_one(queue.as_ref());

        let info = index.info();
        assert_eq!(info.algorithm, Algorithm::Tiered);
        assert_eq!(info.size, 2);
        assert_eq!(info.label_count, 2);
        assert_eq!(info.details["pendingLabels"], 1);
        assert_eq!(info.details["backgroundIndexing"], true);
        assert_eq!(info.details["backend"]["algorithm"], "hnsw");
        assert_eq!(info.details["jobs"]["migratedVectors"], 1);

        let tiered = index.tiered_info();
        assert_eq!(tiered.queued_jobs, 1);
        assert_eq!(tiered.jobs.submitted, 2);
    }

    #[test]
    fn test_label_count_is_distinct_across_tiers() {
        let queue = Arc::new(FifoJobQueue::new());
        let params = TieredParams::new(
            FlatParams::new(CommonParams::new(2).with_multi(true)).into(),
        )
        .with_swap_threshold(0);
        let index = crate::vector::new_tiered_index(&params, queue.clone()).unwrap();

        index.add_vector(Label(1), &[1.0, 0.0]).unwrap();
        drain_all(queue.as_ref());
        index.add_vector(Label(1), &[0.5, 0.5]).unwrap();
        index.add_vector(Label(2), &[0.0, 1.0]).unwrap();

        let info = index.info();
        assert_eq!(info.size, 3);
        assert_eq!(info.label_count, 2);
        assert_eq!(index.tiered_info().live_labels, 2);

        // A hidden backend copy does not count twice either
        index.delete_vector(Label(1)).unwrap();
        assert_eq!(index.info().label_count, 1);
    }

    #[test]
    fn test_rejects_bad_input_without_jobs() {
        let (index, queue) = tiered(0);
        assert!(matches!(
            index.add_vector(Label(1), &[1.0]),
            Err(IndexError::DimensionMismatch { .. })
        ));
        assert!(index.add_vector(Label(1), &[f32::NAN, 0.0]).is_err());
        assert!(index.range(&[0.0, 0.0], -1.0).is_err());
        assert!(queue.is_empty());
        assert!(index.is_empty());
    }
}
