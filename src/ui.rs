//! User-facing output
//!
//! Stages narrate progress through a [`Ui`]. Output is informational only
//! and never affects control flow.

use std::sync::Mutex;
use tracing::{error, info};

/// Sink for progress and error lines
pub trait Ui: Send + Sync {
    /// Report progress
    fn say(&self, message: &str);

    /// Report a problem
    fn error(&self, message: &str);
}

/// Writes to stdout/stderr and mirrors every line into the log
#[derive(Debug, Default)]
pub struct ConsoleUi;

impl Ui for ConsoleUi {
    fn say(&self, message: &str) {
        info!(target: "ui", "{}", message);
        println!("==> {message}");
    }

    fn error(&self, message: &str) {
        error!(target: "ui", "{}", message);
        eprintln!("==> {message}");
    }
}

/// A line captured by [`CapturingUi`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiLine {
    Say(String),
    Error(String),
}

/// Keeps every line in memory (useful for testing)
#[derive(Debug, Default)]
pub struct CapturingUi {
    lines: Mutex<Vec<UiLine>>,
}

impl CapturingUi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every captured line, in order
    pub fn lines(&self) -> Vec<UiLine> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Only the error lines
    pub fn errors(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter_map(|line| match line {
                UiLine::Error(msg) => Some(msg),
                UiLine::Say(_) => None,
            })
            .collect()
    }

    fn push(&self, line: UiLine) {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).push(line);
    }
}

impl Ui for CapturingUi {
    fn say(&self, message: &str) {
        self.push(UiLine::Say(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.push(UiLine::Error(message.to_string()));
    }
}
