//! Structured JSON logger
//!
//! Each event is written as a single JSON line: `event`, then `severity`,
//! then the caller's fields sorted by key. ERROR and FATAL go to stderr,
//! everything else to stdout.
//!
//! The minimum severity is read once from `SPILLSET_LOG`
//! (`trace`, `info`, `warn`, `error`, `fatal`); the default is `info`.

use std::io::{self, Write};
use std::sync::OnceLock;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Trace,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Severity {
    /// Upper-case name as written to the log
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    /// Parse a severity name, case-insensitively
    pub fn parse(name: &str) -> Option<Self> {
        [
            Severity::Trace,
            Severity::Info,
            Severity::Warn,
            Severity::Error,
            Severity::Fatal,
        ]
        .into_iter()
        .find(|s| s.as_str().eq_ignore_ascii_case(name.trim()))
    }

    fn to_stderr(self) -> bool {
        self >= Severity::Error
    }
}

static THRESHOLD: OnceLock<Severity> = OnceLock::new();

fn threshold() -> Severity {
    *THRESHOLD.get_or_init(|| {
        std::env::var("SPILLSET_LOG")
            .ok()
            .and_then(|v| Severity::parse(&v))
            .unwrap_or(Severity::Info)
    })
}

/// Render one event as a JSON line, newline included.
fn render(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let mut sorted: Vec<&(&str, &str)> = fields.iter().collect();
    sorted.sort_by_key(|(key, _)| *key);

    let mut line = format!(
        "{{\"event\":{},\"severity\":\"{}\"",
        quote(event),
        severity.as_str()
    );
    for (key, value) in sorted {
        line.push(',');
        line.push_str(&quote(key));
        line.push(':');
        line.push_str(&quote(value));
    }
    line.push_str("}\n");
    line
}

fn quote(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

/// Spill event logger
pub struct Logger;

impl Logger {
    /// Log an event with the given severity and fields
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if severity < threshold() {
            return;
        }
        let line = render(severity, event, fields);
        // Write failures are ignored
        let _ = if severity.to_stderr() {
            io::stderr().lock().write_all(line.as_bytes())
        } else {
            io::stdout().lock().write_all(line.as_bytes())
        };
    }

    pub fn trace(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Trace, event, fields);
    }

    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }
}
