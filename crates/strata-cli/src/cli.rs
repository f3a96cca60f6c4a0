//! CLI definition and command dispatch for strata.
//!
//! This module defines the command-line interface using `clap` and provides
//! the `run()` function that dispatches commands to the index library.
//!
//! ## Parameter Precedence
//!
//! Index parameters are resolved with the following precedence (highest to lowest):
//! 1. Parameter file (`--config` or `STRATA_CONFIG`), which replaces all index flags
//! 2. Index flags (`--algorithm`, `--dimension`, ...)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::bench::{self, BenchOptions, BenchReport};
use crate::ui::{format, table, ColorMode, MessageType, ProgressMode, StepTree, Style};

use strata_index::vector::{
    available_algorithms, estimate_element_size, estimate_initial_size, Algorithm, CommonParams,
    FlatParams, HnswParams, IndexInfo, IvfParams, IvfPqParams, TieredParams,
    DEFAULT_BLOCK_SIZE, DEFAULT_HNSW_EF_CONSTRUCTION, DEFAULT_HNSW_EF_RUNTIME, DEFAULT_HNSW_M,
    DEFAULT_IVF_LISTS, DEFAULT_IVF_PROBES, DEFAULT_PQ_CENTROIDS, DEFAULT_PQ_SUBSPACES,
    DEFAULT_SWAP_THRESHOLD,
};
use strata_index::{IndexError, IndexParams, VectorMetric};

// ============================================================================
// CLI Definition
// ============================================================================

/// Version string including git commit hash
const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

/// strata – tiered in-memory vector indexes
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, env = "STRATA_VERBOSE")]
    pub verbose: bool,

    /// Suppress progress and informational messages
    #[arg(short, long, global = true, env = "STRATA_QUIET")]
    pub quiet: bool,

    /// Index parameter file (YAML or JSON); overrides the index flags
    #[arg(long, global = true, env = "STRATA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Color output mode: always, never, or auto (default: auto)
    #[arg(long, global = true, env = "STRATA_COLOR", default_value = "auto")]
    pub color: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the index algorithms compiled into this build
    #[command(after_help = r#"EXAMPLES:
    # Show algorithms
    strata algorithms

    # As JSON for scripting
    strata algorithms --json
"#)]
    Algorithms {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Estimate the memory an index will allocate
    #[command(after_help = r#"EXAMPLES:
    # Default tiered HNSW index, 128 dimensions
    strata estimate --dimension 128

    # Projected size after one million vectors
    strata estimate --dimension 128 --vectors 1000000

    # From a parameter file
    strata estimate --config index.yaml --json
"#)]
    Estimate {
        #[command(flatten)]
        index: IndexArgs,

        /// Project the total size after this many vectors
        #[arg(long)]
        vectors: Option<usize>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Build an index from random vectors and measure recall
    #[command(after_help = r#"EXAMPLES:
    # Tiered HNSW with two migration workers
    strata bench

    # Larger run with a custom swap threshold
    strata bench --vectors 100000 --swap-threshold 4096 --workers 4

    # Standalone IVF, no deletes, JSON report
    strata bench --algorithm ivf_flat --delete-ratio 0 --json

    # Tiered over product-quantized IVF
    strata bench --primary ivf_pq --pq-subspaces 16 --lists 32
"#)]
    Bench {
        #[command(flatten)]
        index: IndexArgs,

        /// Vectors to ingest
        #[arg(long, default_value_t = 10_000)]
        vectors: usize,

        /// Queries used to measure recall
        #[arg(long, default_value_t = 100)]
        queries: usize,

        /// Neighbors per query
        #[arg(short = 'k', long = "top-k", default_value_t = 10)]
        k: usize,

        /// Migration worker threads (tiered indexes only)
        #[arg(long, default_value_t = 2)]
        workers: usize,

        /// Fraction of ingested vectors to delete afterwards
        #[arg(long, default_value_t = 0.1)]
        delete_ratio: f64,

        /// Seed for generated vectors
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Retries per failed job before it is dropped
        #[arg(long, default_value_t = 3)]
        max_retries: u32,

        /// Seconds to wait for migration to finish
        #[arg(long, default_value_t = 120)]
        settle_timeout_secs: u64,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

/// Index algorithm as accepted on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmArg {
    Flat,
    Hnsw,
    #[value(name = "ivf_flat")]
    IvfFlat,
    #[value(name = "ivf_pq")]
    IvfPq,
    Tiered,
}

/// Index shape flags shared by `estimate` and `bench`.
#[derive(Args, Debug, Clone)]
pub struct IndexArgs {
    /// Index algorithm
    #[arg(long, value_enum, default_value_t = AlgorithmArg::Tiered)]
    pub algorithm: AlgorithmArg,

    /// Backend algorithm of a tiered index
    #[arg(long, value_enum, default_value_t = AlgorithmArg::Hnsw)]
    pub primary: AlgorithmArg,

    /// Vector dimension
    #[arg(long, default_value_t = 32)]
    pub dimension: usize,

    /// Distance metric: cosine, dot or l2
    #[arg(long, default_value = "cosine", value_parser = parse_metric)]
    pub metric: VectorMetric,

    /// Allow several vectors per label
    #[arg(long)]
    pub multi: bool,

    /// Vectors reserved per allocation block
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    pub block_size: usize,

    /// HNSW neighbors per node
    #[arg(long, default_value_t = DEFAULT_HNSW_M)]
    pub m: usize,

    /// HNSW candidate list size during construction
    #[arg(long, default_value_t = DEFAULT_HNSW_EF_CONSTRUCTION)]
    pub ef_construction: usize,

    /// HNSW candidate list size during search
    #[arg(long, default_value_t = DEFAULT_HNSW_EF_RUNTIME)]
    pub ef_runtime: usize,

    /// IVF inverted lists
    #[arg(long, default_value_t = DEFAULT_IVF_LISTS)]
    pub lists: usize,

    /// IVF lists probed per query
    #[arg(long, default_value_t = DEFAULT_IVF_PROBES)]
    pub probes: usize,

    /// IVF-PQ subspaces per vector (must divide the dimension)
    #[arg(long, default_value_t = DEFAULT_PQ_SUBSPACES)]
    pub pq_subspaces: usize,

    /// IVF-PQ codebook entries per subspace (at most 256)
    #[arg(long, default_value_t = DEFAULT_PQ_CENTROIDS)]
    pub pq_centroids: usize,

    /// Pending vectors that trigger a batch swap (0 disables batching)
    #[arg(long, default_value_t = DEFAULT_SWAP_THRESHOLD)]
    pub swap_threshold: usize,

    /// Seed for randomized index construction
    #[arg(long)]
    pub index_seed: Option<u64>,
}

fn parse_metric(s: &str) -> Result<VectorMetric, String> {
    VectorMetric::from_str(s).map_err(|e| e.to_string())
}

impl IndexArgs {
    /// Build index parameters from the flags.
    pub fn to_params(&self) -> Result<IndexParams> {
        match self.algorithm {
            AlgorithmArg::Tiered => {
                if self.primary == AlgorithmArg::Tiered {
                    bail!("--primary must be flat, hnsw, ivf_flat or ivf_pq");
                }
                let primary = self.standalone_params(self.primary);
                Ok(TieredParams::new(primary)
                    .with_swap_threshold(self.swap_threshold)
                    .into())
            }
            algorithm => Ok(self.standalone_params(algorithm)),
        }
    }

    fn standalone_params(&self, algorithm: AlgorithmArg) -> IndexParams {
        let common = CommonParams::new(self.dimension)
            .with_metric(self.metric)
            .with_multi(self.multi)
            .with_block_size(self.block_size);

        match algorithm {
            AlgorithmArg::Hnsw => {
                let mut params = HnswParams::new(common)
                    .with_m(self.m)
                    .with_ef_construction(self.ef_construction)
                    .with_ef_runtime(self.ef_runtime);
                if let Some(seed) = self.index_seed {
                    params = params.with_seed(seed);
                }
                params.into()
            }
            AlgorithmArg::IvfFlat => {
                let mut params = IvfParams::new(common)
                    .with_lists(self.lists)
                    .with_probes(self.probes);
                if let Some(seed) = self.index_seed {
                    params = params.with_seed(seed);
                }
                params.into()
            }
            AlgorithmArg::IvfPq => {
                let mut params = IvfPqParams::new(common)
                    .with_lists(self.lists)
                    .with_probes(self.probes)
                    .with_subspaces(self.pq_subspaces)
                    .with_centroids(self.pq_centroids);
                if let Some(seed) = self.index_seed {
                    params = params.with_seed(seed);
                }
                params.into()
            }
            AlgorithmArg::Flat | AlgorithmArg::Tiered => FlatParams::new(common).into(),
        }
    }
}

// ============================================================================
// Entry Point
// ============================================================================

/// Run the CLI application.
///
/// # Returns
///
/// Returns `ExitCode::SUCCESS` on success, or `ExitCode::FAILURE` on error.
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Warnings always reach stderr; debug output only with --verbose
    let log_level = if cli.verbose { "debug" } else { "warn" };
    let filter = format!("strata_index={},strata_cli={}", log_level, log_level);

    tracing_subscriber::fmt()
        .with_env_filter(&filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let color_mode = ColorMode::from_str(&cli.color).unwrap_or(ColorMode::Auto);
    let style = Style::new(color_mode);

    let result = match &cli.command {
        Command::Algorithms { json } => handle_algorithms(&style, *json),
        Command::Estimate {
            index,
            vectors,
            json,
        } => handle_estimate(&style, cli.config.as_deref(), index, *vectors, *json),
        Command::Bench {
            index,
            vectors,
            queries,
            k,
            workers,
            delete_ratio,
            seed,
            max_retries,
            settle_timeout_secs,
            json,
        } => {
            let opts = BenchOptions {
                vectors: *vectors,
                queries: *queries,
                k: *k,
                workers: *workers,
                delete_ratio: *delete_ratio,
                seed: *seed,
                max_retries: *max_retries,
                settle_timeout: Duration::from_secs(*settle_timeout_secs),
            };
            let mode = ProgressMode::detect(cli.quiet, *json, color_mode);
            handle_bench(&style, cli.config.as_deref(), index, &opts, mode, *json)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let cause = e.chain().nth(1).map(|c| c.to_string());
            let hint = e.downcast_ref::<IndexError>().and_then(error_hint);
            eprintln!(
                "{}",
                style.error_with_context(&e.to_string(), cause.as_deref(), hint)
            );
            ExitCode::FAILURE
        }
    }
}

fn error_hint(err: &IndexError) -> Option<&'static str> {
    match err {
        IndexError::UnsupportedAlgorithm { .. } => {
            Some("Run `strata algorithms` to list the algorithms in this build")
        }
        IndexError::ParamsIo { .. } | IndexError::Yaml(_) | IndexError::Json(_) => {
            Some("Check the parameter file passed with --config or STRATA_CONFIG")
        }
        IndexError::InvalidParams { .. } => {
            Some("See `strata estimate --help` for the accepted index flags")
        }
        _ => None,
    }
}

/// Resolve index parameters from the parameter file or the flags.
fn resolve_params(config: Option<&Path>, args: &IndexArgs) -> Result<IndexParams> {
    match config {
        Some(path) => IndexParams::from_path(path)
            .with_context(|| format!("Failed to load parameters from {}", path.display())),
        None => args.to_params(),
    }
}

// ============================================================================
// Command handlers
// ============================================================================

#[derive(Debug, Serialize)]
struct AlgorithmEntry {
    name: &'static str,
    search: &'static str,
    description: &'static str,
}

fn describe(algorithm: Algorithm) -> AlgorithmEntry {
    let (search, description) = match algorithm {
        Algorithm::Flat => ("exact", "Brute-force scan over a contiguous arena"),
        Algorithm::Hnsw => ("approximate", "Hierarchical navigable small world graph"),
        Algorithm::IvfFlat => ("approximate", "K-means inverted lists with flat storage"),
        Algorithm::IvfPq => ("approximate", "K-means inverted lists of product-quantized codes"),
        Algorithm::Tiered => ("mixed", "Flat write buffer migrating into a backend index"),
    };
    AlgorithmEntry {
        name: algorithm.as_str(),
        search,
        description,
    }
}

fn handle_algorithms(style: &Style, json: bool) -> Result<()> {
    let entries: Vec<AlgorithmEntry> = available_algorithms().into_iter().map(describe).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let rows: Vec<table::AlgorithmRow> = entries
        .iter()
        .map(|e| table::AlgorithmRow {
            name: style.algorithm(e.name),
            search: e.search,
            description: e.description,
        })
        .collect();
    println!("{}", table::render_algorithms_table(&rows));
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EstimateReport {
    algorithm: Algorithm,
    dimension: usize,
    metric: VectorMetric,
    initial_bytes: usize,
    element_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    vectors: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    projected_bytes: Option<usize>,
    warnings: Vec<String>,
}

fn handle_estimate(
    style: &Style,
    config: Option<&Path>,
    args: &IndexArgs,
    vectors: Option<usize>,
    json: bool,
) -> Result<()> {
    let params = resolve_params(config, args)?;
    let warnings = params.validate().context("Invalid index parameters")?;

    let initial_bytes = estimate_initial_size(&params)?;
    let element_bytes = estimate_element_size(&params)?;
    let report = EstimateReport {
        algorithm: params.algorithm(),
        dimension: params.dimension(),
        metric: params.common().metric,
        initial_bytes,
        element_bytes,
        vectors,
        projected_bytes: vectors
            .map(|n| initial_bytes.saturating_add(element_bytes.saturating_mul(n))),
        warnings,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", style.section("ESTIMATE"));
    println!();
    println!(
        "  {}",
        style.key_value("Algorithm", &style.algorithm(report.algorithm.as_str()))
    );
    if let IndexParams::Tiered(tiered) = &params {
        println!(
            "  {}",
            style.key_value("Backend", &style.algorithm(tiered.primary.algorithm().as_str()))
        );
    }
    println!(
        "  {}",
        style.key_value(
            "Dimension",
            &format!("{} ({})", report.dimension, report.metric)
        )
    );
    println!();

    let mut metrics = vec![
        ("Initial size", format::format_bytes(initial_bytes as u64)),
        ("Per vector", format::format_bytes(element_bytes as u64)),
    ];
    if let (Some(n), Some(total)) = (report.vectors, report.projected_bytes) {
        metrics.push((
            "Projected",
            format!(
                "{} for {} vectors",
                format::format_bytes(total as u64),
                format::format_thousands(n as u64)
            ),
        ));
    }
    println!("{}", table::render_metrics_table(&metrics));

    for warning in &report.warnings {
        println!("{}", style.message(MessageType::Warn, warning));
    }
    Ok(())
}

fn handle_bench(
    style: &Style,
    config: Option<&Path>,
    args: &IndexArgs,
    opts: &BenchOptions,
    mode: ProgressMode,
    json: bool,
) -> Result<()> {
    if !(0.0..=1.0).contains(&opts.delete_ratio) {
        bail!("--delete-ratio must be between 0 and 1");
    }
    let params = resolve_params(config, args)?;

    if mode != ProgressMode::Silent {
        println!(
            "{}",
            style.message(
                MessageType::Info,
                &format!(
                    "Benchmarking {} index: {} vectors, {} queries, k={}",
                    params.algorithm(),
                    format::format_thousands(opts.vectors as u64),
                    opts.queries,
                    opts.k
                )
            )
        );
    }

    let mut steps = StepTree::new(mode);
    let report = bench::run(&params, opts, &mut steps).context("Benchmark failed")?;
    drop(steps);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_bench_report(style, &report, opts);
    Ok(())
}

fn print_bench_report(style: &Style, report: &BenchReport, opts: &BenchOptions) {
    println!();
    println!("{}", style.section("BENCHMARK"));
    println!();
    println!(
        "  {}",
        style.key_value("Algorithm", &style.algorithm(report.algorithm.as_str()))
    );
    println!(
        "  {}",
        style.key_value(
            "Dimension",
            &format!("{} ({})", report.dimension, report.metric)
        )
    );
    println!(
        "  {}",
        style.key_value(
            "Vectors",
            &format!(
                "{} ingested, {} deleted ({}), {} live",
                format::format_thousands(report.vectors as u64),
                format::format_thousands(report.deleted as u64),
                format::format_percent(opts.delete_ratio),
                format::format_thousands(report.live as u64)
            )
        )
    );
    println!();

    let ingest = report.ingest_duration();
    let search = report.search_duration();
    let mut metrics = vec![
        ("Ingest", format::format_duration(ingest)),
        ("Ingest rate", format::format_rate(report.vectors, ingest)),
    ];
    if report.tiered.is_some() {
        metrics.push((
            "Settle",
            format::format_duration(Duration::from_secs_f64(report.settle_secs)),
        ));
    }
    metrics.push(("Search", format::format_duration(search)));
    metrics.push(("Queries/s", format::format_rate(report.queries, search)));
    println!("{}", table::render_metrics_table(&metrics));
    println!();

    let rows = match &report.tiered {
        Some(tiered) => vec![
            tier_row("frontend", &tiered.frontend),
            tier_row("backend", &tiered.backend),
        ],
        None => vec![tier_row("index", &report.info)],
    };
    println!("{}", table::render_tiers_table(&rows));

    if let Some(tiered) = &report.tiered {
        println!();
        println!(
            "  {}",
            style.key_value(
                "Jobs",
                &format!(
                    "{} executed, {} skipped, {} retried, {} dropped, {} rescheduled",
                    report.workers.executed,
                    tiered.jobs.skipped,
                    report.workers.retried,
                    report.workers.dropped,
                    report.workers.rescheduled
                )
            )
        );
    }

    println!();
    println!(
        "{}",
        style.message(
            MessageType::Ok,
            &format!("Recall@{}: {}", report.k, style.recall(report.recall))
        )
    );
    if report.recall < 0.9 && report.algorithm != Algorithm::Flat {
        println!(
            "{}",
            style.message(
                MessageType::Hint,
                "Raise --ef-runtime or --probes to trade speed for recall"
            )
        );
    }
}

fn tier_row(tier: &str, info: &IndexInfo) -> table::TierRow {
    table::TierRow {
        tier: tier.to_string(),
        algorithm: info.algorithm.as_str().to_string(),
        vectors: info.size as u64,
        labels: info.label_count as u64,
        memory_bytes: info.memory_bytes as u64,
    }
}
