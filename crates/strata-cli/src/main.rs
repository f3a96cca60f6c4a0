//! # strata CLI
//!
//! Command-line front end for the `strata-index` library: lists algorithms,
//! estimates index sizes and benchmarks tiered migration.
//! Run `strata --help` for usage information.

mod bench;
mod cli;
pub mod ui;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}
