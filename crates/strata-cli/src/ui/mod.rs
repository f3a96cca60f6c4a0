//! # CLI UI Module
//!
//! Styling and formatting layer for strata CLI output.
//!
//! Human output is prefixed, aligned and colored when the terminal allows it;
//! `--json` output bypasses this module entirely.
//!
//! ## Module Structure
//!
//! - `color`: Color mode detection and terminal capability checks
//! - `style`: Message types, prefixes, and styling functions
//! - `format`: Utility formatters (bytes, counts, durations, rates)
//! - `table`: Table rendering with comfy-table
//! - `progress`: Step trees for long operations

pub mod color;
pub mod format;
pub mod progress;
pub mod style;
pub mod table;

pub use color::ColorMode;
pub use progress::{ProgressMode, StepTree};
pub use style::{MessageType, Style};
