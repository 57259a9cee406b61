//! Findings produced by the validators and the verdict derived from them.

use serde::{Deserialize, Serialize};

/// Severity of a single finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub message: String,
}

impl Issue {
    pub fn error(message: impl Into<String>) -> Self {
        Self { severity: Severity::Error, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { severity: Severity::Warning, message: message.into() }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self { severity: Severity::Info, message: message.into() }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Overall verdict, shared by SPF, DKIM and DMARC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Warning,
    Fail,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Pass => write!(f, "pass"),
            Status::Warning => write!(f, "warning"),
            Status::Fail => write!(f, "fail"),
        }
    }
}

/// Fail if any Error or `forced_fail`, else Warning if any Warning, else Pass.
pub fn aggregate_status(issues: &[Issue], forced_fail: bool) -> Status {
    if forced_fail || issues.iter().any(Issue::is_error) {
        Status::Fail
    } else if issues.iter().any(|i| i.severity == Severity::Warning) {
        Status::Warning
    } else {
        Status::Pass
    }
}
