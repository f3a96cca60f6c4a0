//! Table rendering for CLI output using comfy-table.
//!
//! | Command | Table Function |
//! |---------|----------------|
//! | `strata algorithms` | `render_algorithms_table()` |
//! | `strata estimate` | `render_metrics_table()` |
//! | `strata bench` | `render_metrics_table()`, `render_tiers_table()` |

use comfy_table::presets::NOTHING;
use comfy_table::{Cell, CellAlignment, ColumnConstraint, Table, Width};

use super::format::{format_bytes, format_thousands};

/// One compiled-in algorithm.
#[derive(Debug, Clone)]
pub struct AlgorithmRow {
    /// Name as used in parameter files
    pub name: String,
    /// Exact or approximate search
    pub search: &'static str,
    /// One-line description
    pub description: &'static str,
}

/// One sub-index of a (possibly tiered) index.
#[derive(Debug, Clone)]
pub struct TierRow {
    /// Tier name ("frontend", "backend", "index")
    pub tier: String,
    /// Algorithm name
    pub algorithm: String,
    /// Live vectors
    pub vectors: u64,
    /// Distinct labels
    pub labels: u64,
    /// Approximate bytes held
    pub memory_bytes: u64,
}

/// Render the algorithm list for `strata algorithms`.
///
/// ```text
/// ALGORITHM  SEARCH       DESCRIPTION
/// flat       exact        Brute-force scan over a contiguous arena
/// hnsw       approximate  Hierarchical navigable small world graph
/// ```
pub fn render_algorithms_table(rows: &[AlgorithmRow]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_header(vec!["ALGORITHM", "SEARCH", "DESCRIPTION"]);
    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(10)), // ALGORITHM
        ColumnConstraint::LowerBoundary(Width::Fixed(12)), // SEARCH
    ]);

    for row in rows {
        table.add_row(vec![
            Cell::new(&row.name),
            Cell::new(row.search),
            Cell::new(row.description),
        ]);
    }

    table.trim_fmt().to_string()
}

/// Render per-tier statistics after a benchmark.
///
/// ```text
/// TIER      ALGORITHM  VECTORS  LABELS  MEMORY
/// frontend  flat             0       0  1.2 KB
/// backend   hnsw        10,000  10,000  6.1 MB
/// ```
pub fn render_tiers_table(rows: &[TierRow]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_header(vec![
        Cell::new("TIER"),
        Cell::new("ALGORITHM"),
        Cell::new("VECTORS").set_alignment(CellAlignment::Right),
        Cell::new("LABELS").set_alignment(CellAlignment::Right),
        Cell::new("MEMORY").set_alignment(CellAlignment::Right),
    ]);
    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(8)),  // TIER
        ColumnConstraint::LowerBoundary(Width::Fixed(9)),  // ALGORITHM
        ColumnConstraint::LowerBoundary(Width::Fixed(8)),  // VECTORS
        ColumnConstraint::LowerBoundary(Width::Fixed(8)),  // LABELS
        ColumnConstraint::LowerBoundary(Width::Fixed(10)), // MEMORY
    ]);

    for row in rows {
        table.add_row(vec![
            Cell::new(&row.tier),
            Cell::new(&row.algorithm),
            Cell::new(format_thousands(row.vectors)).set_alignment(CellAlignment::Right),
            Cell::new(format_thousands(row.labels)).set_alignment(CellAlignment::Right),
            Cell::new(format_bytes(row.memory_bytes)).set_alignment(CellAlignment::Right),
        ]);
    }

    table.trim_fmt().to_string()
}

/// Render a simple key-value metrics table.
///
/// ```text
/// METRIC              VALUE
/// Initial size       4.1 MB
/// Per vector          612 B
/// ```
pub fn render_metrics_table(metrics: &[(&str, String)]) -> String {
    if metrics.is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_header(vec![
        Cell::new("METRIC"),
        Cell::new("VALUE").set_alignment(CellAlignment::Right),
    ]);
    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(18)), // METRIC
        ColumnConstraint::LowerBoundary(Width::Fixed(12)), // VALUE
    ]);

    for (key, value) in metrics {
        table.add_row(vec![
            Cell::new(*key),
            Cell::new(value).set_alignment(CellAlignment::Right),
        ]);
    }

    table.trim_fmt().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithms_table() {
        let output = render_algorithms_table(&[AlgorithmRow {
            name: "hnsw".to_string(),
            search: "approximate",
            description: "graph",
        }]);
        assert!(output.contains("ALGORITHM"));
        assert!(output.contains("hnsw"));
        assert!(output.contains("approximate"));
    }

    #[test]
    fn test_tiers_table() {
        let output = render_tiers_table(&[
            TierRow {
                tier: "frontend".to_string(),
                algorithm: "flat".to_string(),
                vectors: 12,
                labels: 12,
                memory_bytes: 2048,
            },
            TierRow {
                tier: "backend".to_string(),
                algorithm: "hnsw".to_string(),
                vectors: 12_500,
                labels: 12_000,
                memory_bytes: 3 * 1024 * 1024,
            },
        ]);
        assert!(output.contains("frontend"));
        assert!(output.contains("12,500"));
        assert!(output.contains("3.0 MB"));
    }

    #[test]
    fn test_metrics_table() {
        let output = render_metrics_table(&[("Recall@10", "0.9800".to_string())]);
        assert!(output.contains("METRIC"));
        assert!(output.contains("Recall@10"));
        assert!(output.contains("0.9800"));
    }

    #[test]
    fn test_empty_tables() {
        assert_eq!(render_algorithms_table(&[]), "");
        assert_eq!(render_tiers_table(&[]), "");
        assert_eq!(render_metrics_table(&[]), "");
    }
}
