//! Progress indicators for long-running CLI operations.
//!
//! Step spinners come from `indicatif`. They are hidden when stdout is
//! not a TTY, with `--quiet`, and with `--json`.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

use super::color::ColorMode;
use super::format::format_duration;

/// Progress feedback mode based on output context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    /// Interactive TTY: animated spinners and bars
    Interactive,
    /// Non-TTY or quiet: final results only
    Quiet,
    /// Machine-readable output: nothing at all
    Silent,
}

impl ProgressMode {
    /// Detect the appropriate mode from environment and flags.
    pub fn detect(quiet: bool, json: bool, color_mode: ColorMode) -> Self {
        if json {
            Self::Silent
        } else if quiet || !atty::is(atty::Stream::Stdout) || color_mode == ColorMode::Never {
            Self::Quiet
        } else {
            Self::Interactive
        }
    }

    /// Check if progress should be shown.
    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Interactive)
    }
}

/// Spinner tick characters (Braille-based).
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

fn spinner_style(template: &str) -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(SPINNER_CHARS)
}

/// Step-tree progress for multi-phase operations.
///
/// ```text
/// ├─ ⠋ Ingesting vectors... (0.2s)   <- animated while running
/// ├─ Ingesting vectors done (0.2s)   <- after completion
/// └─ Measuring recall done (0.5s)
/// ```
pub struct StepTree {
    mode: ProgressMode,
    current: Option<(String, Instant, Option<ProgressBar>)>,
}

impl StepTree {
    /// Create an empty step tree.
    pub fn new(mode: ProgressMode) -> Self {
        Self {
            mode,
            current: None,
        }
    }

    /// Start a new step, finishing the previous one.
    pub fn step(&mut self, name: &str) {
        self.finish_current(false);

        let bar = self.mode.is_interactive().then(|| {
            let bar = ProgressBar::new_spinner();
            bar.set_style(spinner_style("├─ {spinner:.cyan} {msg}"));
            bar.set_message(format!("{}...", name));
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        self.current = Some((name.to_string(), Instant::now(), bar));
    }

    /// Update the running step's message.
    pub fn note(&self, detail: &str) {
        if let Some((name, _, Some(bar))) = &self.current {
            bar.set_message(format!("{}... {}", name, detail));
        }
    }

    /// Finish the current step, marking it as the last one.
    pub fn finish_last_step(&mut self) {
        self.finish_current(true);
    }

    fn finish_current(&mut self, is_last: bool) {
        let Some((name, started, bar)) = self.current.take() else {
            return;
        };
        if let Some(bar) = bar {
            bar.finish_and_clear();
        }
        if self.mode.is_interactive() {
            let prefix = if is_last { "└─" } else { "├─" };
            println!(
                "{} {} done ({})",
                prefix,
                name,
                format_duration(started.elapsed())
            );
        }
    }
}

impl Drop for StepTree {
    fn drop(&mut self) {
        if let Some((_, _, Some(bar))) = self.current.take() {
            bar.finish_and_clear();
        }
    }
}
