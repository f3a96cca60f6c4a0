//! Background jobs submitted by a tiered index.
//!
//! A job is an immutable description of work. It carries no vector data:
//! everything it does is derived from the index's live state when it runs,
//! so a job that lost its purpose (label deleted, already migrated, swept up
//! by a swap) degrades to a reported no-op.

use super::TieredIndex;
use crate::error::{IndexError, IndexResult};
use crate::vector::Label;
use std::fmt;
use std::sync::Weak;

/// What a job does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// Move the label's pending vectors into the backend.
    Insert(Label),
    /// Physically remove a tombstoned label from the backend.
    Repair(Label),
    /// Move every pending vector into the backend in one batch.
    Swap,
}

impl JobKind {
    /// Label targeted by this job, if any.
    pub fn label(&self) -> Option<Label> {
        match self {
            JobKind::Insert(label) | JobKind::Repair(label) => Some(*label),
            JobKind::Swap => None,
        }
    }

    /// Short name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Insert(_) => "insert",
            JobKind::Repair(_) => "repair",
            JobKind::Swap => "swap",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Insert(label) => write!(f, "insert({})", label),
            JobKind::Repair(label) => write!(f, "repair({})", label),
            JobKind::Swap => write!(f, "swap"),
        }
    }
}

/// A unit of background work.
///
/// Jobs are cheap to clone; a worker may resubmit a failed job as is.
#[derive(Debug, Clone)]
pub struct Job {
    kind: JobKind,
    seq: u64,
    index: Weak<TieredIndex>,
}

impl Job {
    pub(crate) fn new(kind: JobKind, seq: u64, index: Weak<TieredIndex>) -> Self {
        Self { kind, seq, index }
    }

    /// What this job does.
    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// Creation order within the owning index.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Run the job against its index.
    ///
    /// Failures leave the index consistent: affected labels stay pending in
    /// the frontend and remain searchable.
    pub fn execute(&self) -> IndexResult<JobOutcome> {
        match self.index.upgrade() {
            Some(index) => index.execute_job(self),
            None => Ok(JobOutcome::IndexDropped),
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.seq, self.kind)
    }
}

/// Why a job had nothing to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The label has no pending vectors (deleted or already migrated).
    NotPending,
    /// The label is no longer tombstoned.
    NotTombstoned,
    /// A swap scheduled after this job covers its label.
    Superseded,
    /// The frontend was empty when the swap ran.
    NothingPending,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::NotPending => "label not pending",
            SkipReason::NotTombstoned => "label not tombstoned",
            SkipReason::Superseded => "superseded by swap",
            SkipReason::NothingPending => "nothing pending",
        };
        f.write_str(reason)
    }
}

/// Effect of a successfully executed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Vectors moved from the frontend into the backend.
    Migrated { vectors: usize },
    /// Backend vectors physically removed.
    Repaired { removed: usize },
    /// The job was a no-op.
    Skipped(SkipReason),
    /// The index was dropped before the job ran.
    IndexDropped,
}

/// A popped job together with its result.
#[derive(Debug)]
pub struct JobReport {
    /// The executed job, kept so the caller can resubmit it.
    pub job: Job,

    /// Result of execution.
    pub result: IndexResult<JobOutcome>,
}

impl JobReport {
    /// Whether execution failed.
    pub fn is_failure(&self) -> bool {
        self.result.is_err()
    }

    /// Execution error, if any.
    pub fn error(&self) -> Option<&IndexError> {
        self.result.as_ref().err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropped_index_is_noop() {
        let job = Job::new(JobKind::Swap, 3, Weak::new());
        assert_eq!(job.execute().unwrap(), JobOutcome::IndexDropped);
        assert_eq!(job.to_string(), "#3 swap");
    }

    #[test]
    fn test_kind_label() {
        assert_eq!(JobKind::Insert(Label(4)).label(), Some(Label(4)));
        assert_eq!(JobKind::Repair(Label(5)).to_string(), "repair(5)");
        assert_eq!(JobKind::Swap.label(), None);
    }
}
