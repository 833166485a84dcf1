//! Error types for extraction and synchronization.

use std::fmt;
use std::path::PathBuf;

use trr_client::ApiError;

/// Kind of remote or reference entity a lookup failed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Project,
    Suite,
    Section,
    Plan,
    Run,
    Test,
    Status,
    Milestone,
    Priority,
    CaseType,
    CaseField,
    CaseFieldOption,
    Configuration,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Project => "project",
            Self::Suite => "test suite",
            Self::Section => "section",
            Self::Plan => "test plan",
            Self::Run => "test run",
            Self::Test => "test",
            Self::Status => "status",
            Self::Milestone => "milestone",
            Self::Priority => "priority",
            Self::CaseType => "case type",
            Self::CaseField => "custom field",
            Self::CaseFieldOption => "custom field option",
            Self::Configuration => "configuration",
        };
        f.write_str(name)
    }
}

/// Reporter errors.
#[derive(Debug, thiserror::Error)]
pub enum ReporterError {
    /// Named entity is absent remotely or in the project snapshot.
    #[error("{kind} not found: {name}")]
    NotFound { kind: EntityKind, name: String },

    /// A run with the same name and configuration exists and overwrite was not requested.
    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("unknown action: {action}")]
    UnknownAction { action: String },

    /// A descending action has no nested action list.
    #[error("nested action list '{action}' is missing")]
    ActionIsMissed { action: String },

    /// Mandatory record field evaluated to nothing.
    #[error("mandatory field '{field}' is missing")]
    FieldIsMissed { field: String },

    #[error("attribute '{name}' is missing on <{tag}>")]
    AttributeMissing { tag: String, name: String },

    /// Pattern-extract must match exactly once.
    #[error("pattern '{pattern}' matched {count} times in '{input}'")]
    AmbiguousMatch {
        pattern: String,
        count: usize,
        input: String,
    },

    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Malformed report or unsupported report type.
    #[error("report error: {message}")]
    Report { message: String },

    /// Malformed map, template or check list.
    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ReporterError {
    pub fn not_found(kind: EntityKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn report(message: impl Into<String>) -> Self {
        Self::Report {
            message: message.into(),
        }
    }

    pub fn field_missed(field: impl Into<String>) -> Self {
        Self::FieldIsMissed {
            field: field.into(),
        }
    }

    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => 2,
            Self::Conflict { .. } => 3,
            Self::Api(e) => e.exit_code(),
            _ => 1,
        }
    }
}

/// Result type for reporter operations.
pub type Result<T> = std::result::Result<T, ReporterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = ReporterError::not_found(EntityKind::Milestone, "MOSK 24.1");
        assert_eq!(err.to_string(), "milestone not found: MOSK 24.1");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            ReporterError::Conflict {
                message: "run exists".into()
            }
            .exit_code(),
            3
        );
        assert_eq!(ReporterError::config("bad map").exit_code(), 1);
        let api = ReporterError::from(ApiError::RateLimited { retry_after: None });
        assert_eq!(api.exit_code(), 5);
    }
}
