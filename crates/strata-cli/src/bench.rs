//! Synthetic benchmark: ingest, delete, settle, then measure recall.
//!
//! The benchmarked index is fed random vectors alongside an exact flat index
//! holding the same data. For tiered indexes a rayon pool runs the job
//! workers while the main thread ingests, so migration overlaps writes the
//! way it does in a real deployment.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use strata_index::tiered::{FifoJobQueue, Job, JobQueue, TieredInfo};
use strata_index::vector::{
    new_index, new_tiered_index, Algorithm, FlatParams, IndexInfo, IndexParams, Label, VectorIndex,
    VectorMetric,
};
use strata_index::TieredIndex;

use crate::ui::StepTree;

/// How long an idle worker waits for a job before checking for shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Consecutive idle polls with work still pending before jobs are rescheduled.
const STALL_POLLS: u32 = 20;

/// Benchmark knobs.
#[derive(Debug, Clone)]
pub struct BenchOptions {
    pub vectors: usize,
    pub queries: usize,
    pub k: usize,
    pub workers: usize,
    pub delete_ratio: f64,
    pub seed: u64,
    pub max_retries: u32,
    pub settle_timeout: Duration,
}

/// Job worker counters.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerStats {
    pub executed: u64,
    pub retried: u64,
    pub dropped: u64,
    pub rescheduled: u64,
}

/// Benchmark results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchReport {
    pub algorithm: Algorithm,
    pub dimension: usize,
    pub metric: VectorMetric,
    pub vectors: usize,
    pub deleted: usize,
    pub live: usize,
    pub queries: usize,
    pub k: usize,
    pub recall: f64,
    pub ingest_secs: f64,
    pub settle_secs: f64,
    pub search_secs: f64,
    pub workers: WorkerStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tiered: Option<TieredInfo>,
    pub info: IndexInfo,
}

impl BenchReport {
    pub fn ingest_duration(&self) -> Duration {
        Duration::from_secs_f64(self.ingest_secs)
    }

    /// Search wall time.
    pub fn search_duration(&self) -> Duration {
        Duration::from_secs_f64(self.search_secs)
    }
}

// ============================================================================
// Workers
// ============================================================================

struct Workers<'a> {
    queue: &'a FifoJobQueue,
    max_retries: u32,
    stop: AtomicBool,
    executed: AtomicU64,
    retried: AtomicU64,
    dropped: AtomicU64,
}

impl<'a> Workers<'a> {
    fn new(queue: &'a FifoJobQueue, max_retries: u32) -> Self {
        Self {
            queue,
            max_retries,
            stop: AtomicBool::new(false),
            executed: AtomicU64::new(0),
            retried: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    fn run(&self, id: usize) {
        debug!("Worker {} started", id);
        while !self.stop.load(Ordering::Acquire) {
            if let Some(job) = self.queue.pop_timeout(POLL_INTERVAL) {
                self.execute(&job);
            }
        }
        debug!("Worker {} stopped", id);
    }

    fn execute(&self, job: &Job) {
        let mut attempt = 0;
        loop {
            match job.execute() {
                Ok(_) => {
                    self.executed.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    self.retried.fetch_add(1, Ordering::Relaxed);
                    debug!("Retrying job {} (attempt {}): {}", job, attempt, e);
                    thread::sleep(backoff(attempt));
                }
                Err(e) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!("Dropping job {} after {} attempts: {}", job, attempt + 1, e);
                    return;
                }
            }
        }
    }

    fn shutdown(&self) {
        self.stop.store(true, Ordering::Release);
    }

    fn stats(&self, rescheduled: u64) -> WorkerStats {
        WorkerStats {
            executed: self.executed.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            rescheduled,
        }
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis((1u64 << attempt.min(6)).min(50))
}

// ============================================================================
// Benchmark
// ============================================================================

struct Phases {
    ingest: Duration,
    settle: Duration,
    rescheduled: u64,
}

/// Run the benchmark described by `params` and `opts`.
pub fn run(params: &IndexParams, opts: &BenchOptions, steps: &mut StepTree) -> Result<BenchReport> {
    let common = params.common().clone();
    let queue = Arc::new(FifoJobQueue::new());

    let (index, tiered): (Arc<dyn VectorIndex>, Option<Arc<TieredIndex>>) = match params {
        IndexParams::Tiered(p) => {
            let tiered = new_tiered_index(p, queue.clone())?;
            let index: Arc<dyn VectorIndex> = tiered.clone();
            (index, Some(tiered))
        }
        _ => (new_index(params, None)?, None),
    };
    let exact_params: IndexParams = FlatParams::new(common.clone()).into();
    let exact = new_index(&exact_params, None)?;

    let mut rng = StdRng::seed_from_u64(opts.seed);
    let data = random_vectors(&mut rng, opts.vectors, common.dimension);
    let queries = random_vectors(&mut rng, opts.queries, common.dimension);
    let delete_count = ((opts.vectors as f64 * opts.delete_ratio).round() as usize).min(opts.vectors);
    let doomed = rand::seq::index::sample(&mut rng, opts.vectors, delete_count).into_vec();

    let worker_count = opts.workers.max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(worker_count)
        .thread_name(|i| format!("strata-worker-{}", i))
        .build()
        .context("Failed to start the job worker pool")?;
    let workers = Workers::new(queue.as_ref(), opts.max_retries);

    let phases = pool.in_place_scope(|scope| {
        for id in 0..worker_count {
            let workers = &workers;
            scope.spawn(move |_| workers.run(id));
        }

        let phases = ingest_and_settle(
            index.as_ref(),
            exact.as_ref(),
            tiered.as_deref(),
            queue.as_ref(),
            &data,
            &doomed,
            opts.settle_timeout,
            steps,
        );
        workers.shutdown();
        phases
    })?;

    steps.step("Measuring recall");
    let started = Instant::now();
    let results = queries
        .iter()
        .map(|q| index.top_k(q, opts.k))
        .collect::<Result<Vec<_>, _>>()?;
    let search = started.elapsed();

    let mut expected = 0usize;
    let mut matched = 0usize;
    for (query, found) in queries.iter().zip(&results) {
        let truth: HashSet<Label> = exact.top_k(query, opts.k)?.iter().map(|h| h.label).collect();
        expected += truth.len();
        matched += found.iter().filter(|h| truth.contains(&h.label)).count();
    }
    let recall = if expected == 0 {
        1.0
    } else {
        matched as f64 / expected as f64
    };
    steps.finish_last_step();

    info!(
        "Benchmark finished: {} live vectors, recall@{}={:.4}",
        index.len(),
        opts.k,
        recall
    );

    Ok(BenchReport {
        algorithm: params.algorithm(),
        dimension: common.dimension,
        metric: common.metric,
        vectors: opts.vectors,
        deleted: doomed.len(),
        live: index.len(),
        queries: queries.len(),
        k: opts.k,
        recall,
        ingest_secs: phases.ingest.as_secs_f64(),
        settle_secs: phases.settle.as_secs_f64(),
        search_secs: search.as_secs_f64(),
        workers: workers.stats(phases.rescheduled),
        tiered: tiered.as_ref().map(|t| t.tiered_info()),
        info: index.info(),
    })
}

#[allow(clippy::too_many_arguments)]
fn ingest_and_settle(
    index: &dyn VectorIndex,
    exact: &dyn VectorIndex,
    tiered: Option<&TieredIndex>,
    queue: &FifoJobQueue,
    data: &[Vec<f32>],
    doomed: &[usize],
    settle_timeout: Duration,
    steps: &mut StepTree,
) -> Result<Phases> {
    steps.step("Ingesting vectors");
    let started = Instant::now();
    for (i, vector) in data.iter().enumerate() {
        let label = Label(i as u64);
        index.add_vector(label, vector)?;
        exact.add_vector(label, vector)?;
        if i % 1024 == 0 {
            steps.note(&format!("{}/{}", i, data.len()));
        }
    }
    for &i in doomed {
        let label = Label(i as u64);
        index.delete_vector(label)?;
        exact.delete_vector(label)?;
    }
    let ingest = started.elapsed();

    let Some(tiered) = tiered else {
        return Ok(Phases {
            ingest,
            settle: Duration::ZERO,
            rescheduled: 0,
        });
    };

    steps.step("Waiting for migration");
    let started = Instant::now();
    let rescheduled = wait_until_settled(tiered, queue, settle_timeout, steps)?;
    Ok(Phases {
        ingest,
        settle: started.elapsed(),
        rescheduled,
    })
}

/// Block until the tiered index has no pending labels and no tombstones.
///
/// Work left behind by dropped jobs is rescheduled once the queue has been
/// idle for a while. Returns the number of rescheduled jobs.
fn wait_until_settled(
    tiered: &TieredIndex,
    queue: &FifoJobQueue,
    timeout: Duration,
    steps: &StepTree,
) -> Result<u64> {
    let deadline = Instant::now() + timeout;
    let mut idle_polls = 0;
    let mut rescheduled = 0u64;

    loop {
        let pending = tiered.pending_count();
        let tombstones = tiered.tombstone_count();
        if pending == 0 && tombstones == 0 {
            return Ok(rescheduled);
        }
        if Instant::now() >= deadline {
            bail!(
                "index did not settle within {:?}: {} labels pending, {} tombstones",
                timeout,
                pending,
                tombstones
            );
        }

        steps.note(&format!("{} pending, {} queued", pending, queue.len()));
        if queue.is_empty() {
            idle_polls += 1;
            if idle_polls >= STALL_POLLS {
                let submitted = tiered.reschedule_pending();
                warn!("Migration stalled, rescheduled {} jobs", submitted);
                rescheduled += submitted as u64;
                idle_polls = 0;
            }
        } else {
            idle_polls = 0;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

fn random_vectors(rng: &mut StdRng, count: usize, dimension: usize) -> Vec<Vec<f32>> {
    (0..count)
        .map(|_| (0..dimension).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect()
}
