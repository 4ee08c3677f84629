//! Output formatting
//!
//! Every command prints through [`Formatter`] so `--json`, `--quiet` and
//! `--no-color` behave the same everywhere.

mod formatter;

pub use formatter::Formatter;

/// Global output switches shared by all commands
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Emit strict JSON on stdout
    pub json: bool,
    /// Disable ANSI colors
    pub no_color: bool,
    /// Suppress everything except errors
    pub quiet: bool,
}
