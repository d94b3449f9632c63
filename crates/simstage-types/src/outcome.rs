//! Validation outcomes.

use std::fmt;

/// Severity of a single check result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Ok,
    /// Reported, but does not stop the pipeline.
    Warning,
    /// Stops the pipeline; nothing gets staged.
    Error,
}

impl Severity {
    /// Status glyph used when printing outcomes.
    pub fn glyph(self) -> char {
        match self {
            Severity::Ok => '\u{2714}',
            Severity::Warning => '?',
            Severity::Error => '\u{2718}',
        }
    }

    pub fn is_error(self) -> bool {
        matches!(self, Severity::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Ok => "ok",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(label)
    }
}

/// The result of one validation check: a severity and a message for the
/// user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub severity: Severity,
    pub message: String,
}

impl ValidationOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Ok,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity.is_error()
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.severity.glyph(), self.message)
    }
}
