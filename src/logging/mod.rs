//! Diagnostic output control
//!
//! This module provides the [`Logger`] used for every diagnostic line the
//! program emits. Diagnostics go to stderr so that stdout carries nothing but
//! the JSON report. The logger supports quiet and verbose modes and prefixes
//! verbose lines with the time elapsed since the run started.

use std::io::{self, Write};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Debug,
    Verbose,
    Info,
    Warning,
    Notice,
    Error,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Verbose | Level::Info => "INFO",
            Level::Warning | Level::Notice => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Logger responsible for all diagnostic output
#[derive(Debug, Clone)]
pub struct Logger {
    pub verbose: bool,
    pub quiet: bool,
    pub start_time: Option<Instant>,
}

impl Logger {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            quiet: false,
            start_time: Some(Instant::now()),
        }
    }

    pub fn new_quiet() -> Self {
        Self {
            verbose: false,
            quiet: true,
            start_time: Some(Instant::now()),
        }
    }

    pub fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    pub fn verbose(&self, message: &str) {
        self.log(Level::Verbose, message);
    }

    /// Information message
    pub fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    /// Warning message
    pub fn warning(&self, message: &str) {
        self.log(Level::Warning, message);
    }

    /// Warning that must reach the user even in quiet mode
    pub fn notice(&self, message: &str) {
        self.log(Level::Notice, message);
    }

    /// Error message, printed even in quiet mode
    pub fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }

    /// Key-value pair summary display
    pub fn summary_kv(&self, title: &str, items: &[(&str, String)]) {
        if self.quiet {
            return;
        }

        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "--- {} ---", title);
        for (key, value) in items {
            let _ = writeln!(stderr, "  {}: {}", key, value);
        }
    }

    /// Format duration in human-readable format
    pub fn format_duration(&self, duration: Duration) -> String {
        let secs = duration.as_secs();
        if secs < 60 {
            format!("{:.3}s", duration.as_secs_f64())
        } else if secs < 3600 {
            format!("{}m{:02}s", secs / 60, secs % 60)
        } else {
            format!("{}h{:02}m{:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
        }
    }

    fn enabled(&self, level: Level) -> bool {
        match level {
            Level::Debug | Level::Verbose => self.verbose && !self.quiet,
            Level::Info | Level::Warning => !self.quiet,
            Level::Notice | Level::Error => true,
        }
    }

    fn log(&self, level: Level, message: &str) {
        if self.enabled(level) {
            self.emit(level.label(), message);
        }
    }

    fn emit(&self, level: &str, message: &str) {
        let line = self.render(level, message);
        let _ = writeln!(io::stderr().lock(), "{}", line);
    }

    fn render(&self, level: &str, message: &str) -> String {
        match (self.verbose, self.start_time) {
            (true, Some(start)) => format!(
                "[{:8.3}s] {:<5} {}",
                start.elapsed().as_secs_f64(),
                level,
                message
            ),
            _ => format!("{:<5} {}", level, message),
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(false)
    }
}
