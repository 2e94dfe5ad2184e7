use std::fmt::{self, Display};

use serde::Serialize;

use crate::error::SuiteError;

/// Failure class of a step. Value mismatches and contract (schema) mismatches
/// are reported under separate kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    Status,
    FieldMismatch,
    MissingIdentifier,
    SchemaMismatch,
    Timeout,
    Setup,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Transport => "transport",
            FailureKind::Status => "status",
            FailureKind::FieldMismatch => "field_mismatch",
            FailureKind::MissingIdentifier => "missing_identifier",
            FailureKind::SchemaMismatch => "schema_mismatch",
            FailureKind::Timeout => "timeout",
            FailureKind::Setup => "setup",
        }
    }
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn setup(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Setup, message)
    }
}

impl Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl From<SuiteError> for Failure {
    fn from(err: SuiteError) -> Self {
        let kind = match err {
            SuiteError::Transport(_) => FailureKind::Transport,
            _ => FailureKind::Setup,
        };
        Failure::new(kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_keep_their_kind() {
        let failure: Failure = SuiteError::Transport("connection refused".into()).into();
        assert_eq!(failure.kind, FailureKind::Transport);
        assert!(failure.message.contains("connection refused"));
    }

    #[test]
    fn other_errors_are_setup_failures() {
        let failure: Failure = SuiteError::Config("bad header".into()).into();
        assert_eq!(failure.kind, FailureKind::Setup);
    }

    #[test]
    fn display_includes_kind() {
        let failure = Failure::new(FailureKind::Status, "expected 200, got 500");
        assert_eq!(failure.to_string(), "[status] expected 200, got 500");
    }
}
