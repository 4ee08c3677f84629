//! Human and JSON rendering for command results
//!
//! In JSON mode stdout carries exactly one document per command and errors
//! go to stderr as `{"error": ...}`. Human mode adds status glyphs and color.

use console::Style;
use serde::Serialize;

use super::OutputConfig;

/// What a piece of text represents, which decides its color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Size,
    Key,
    Url,
    Name,
    Ok,
    Failed,
    Caution,
}

impl Tone {
    fn style(self) -> Style {
        match self {
            Tone::Size | Tone::Ok => Style::new().green(),
            Tone::Key => Style::new().cyan(),
            Tone::Url => Style::new().cyan().underlined(),
            Tone::Name => Style::new().bold(),
            Tone::Failed => Style::new().red(),
            Tone::Caution => Style::new().yellow(),
        }
    }
}

/// Prints command output according to `--json`, `--quiet` and `--no-color`
#[derive(Debug, Clone, Copy)]
pub struct Formatter {
    config: OutputConfig,
}

impl Formatter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn is_json(&self) -> bool {
        self.config.json
    }

    /// JSON output is never colored
    pub fn colors_enabled(&self) -> bool {
        !(self.config.no_color || self.config.json)
    }

    /// Progress bars are drawn only for interactive human output
    pub fn progress_enabled(&self) -> bool {
        !(self.config.json || self.config.quiet)
    }

    fn paint(&self, tone: Tone, text: &str) -> String {
        if self.colors_enabled() {
            tone.style().apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Human output lines are dropped in quiet and JSON mode
    fn human(&self) -> bool {
        !(self.config.quiet || self.config.json)
    }

    pub fn style_size(&self, text: &str) -> String {
        self.paint(Tone::Size, text)
    }

    pub fn style_key(&self, text: &str) -> String {
        self.paint(Tone::Key, text)
    }

    pub fn style_url(&self, text: &str) -> String {
        self.paint(Tone::Url, text)
    }

    pub fn style_name(&self, text: &str) -> String {
        self.paint(Tone::Name, text)
    }

    /// `✓ message` on stdout; JSON callers report success via the exit code
    pub fn success(&self, message: &str) {
        if self.human() {
            println!("{} {message}", self.paint(Tone::Ok, "✓"));
        }
    }

    /// Errors are printed in every mode, quiet included
    pub fn error(&self, message: &str) {
        if self.config.json {
            let body = serde_json::json!({ "error": message });
            match serde_json::to_string_pretty(&body) {
                Ok(json) => eprintln!("{json}"),
                Err(_) => eprintln!("{message}"),
            }
        } else {
            eprintln!("{} {message}", self.paint(Tone::Failed, "✗"));
        }
    }

    pub fn warning(&self, message: &str) {
        if self.human() {
            eprintln!("{} {message}", self.paint(Tone::Caution, "⚠"));
        }
    }

    /// Write `value` as the command's JSON document
    pub fn json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error serializing output: {e}"),
        }
    }

    pub fn println(&self, message: &str) {
        if !self.config.quiet {
            println!("{message}");
        }
    }
}
