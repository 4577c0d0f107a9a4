use std::fmt;

use crate::position::PositionError;

/// Machine-readable error codes for callers that branch on failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    InvalidRequest,
    ItemNotFound,
    ProjectNotFound,
    SprintNotFound,
    Forbidden,
    ConflictRetryable,
    InvariantViolation,
    StorageFailure,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::InvalidRequest => "E2001",
            Self::ItemNotFound => "E2002",
            Self::ProjectNotFound => "E2003",
            Self::SprintNotFound => "E2004",
            Self::Forbidden => "E2005",
            Self::ConflictRetryable => "E3001",
            Self::InvariantViolation => "E3002",
            Self::StorageFailure => "E5001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Backlog not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidRequest => "Invalid request",
            Self::ItemNotFound => "Item not found",
            Self::ProjectNotFound => "Project not found",
            Self::SprintNotFound => "Sprint not found",
            Self::Forbidden => "Target scope not reachable",
            Self::ConflictRetryable => "Concurrent update conflict",
            Self::InvariantViolation => "Position invariant violated",
            Self::StorageFailure => "Item store failure",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `bl init` to initialize this directory."),
            Self::ConfigParseError => Some("Fix syntax in .backlog/config.toml and retry."),
            Self::InvalidRequest => {
                Some("Send the full visible order with the dropped item id included.")
            }
            Self::ItemNotFound | Self::ProjectNotFound => None,
            Self::SprintNotFound => Some("Use `bl sprint list` to see sprints of the project."),
            Self::Forbidden => Some("Pick a sprint owned by or shared with the item's project."),
            Self::ConflictRetryable => Some("Retry once the other writer has committed."),
            Self::InvariantViolation => {
                Some("Run `bl rebuild-positions` and report a bug with logs.")
            }
            Self::StorageFailure => Some("Check disk space and write permissions."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Kind of entity a [`BacklogError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Item,
    Project,
    Sprint,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Item => "item",
            Self::Project => "project",
            Self::Sprint => "sprint",
        })
    }
}

/// Errors surfaced by every position-affecting operation.
///
/// `InvalidRequest`, `NotFound` and `Forbidden` are rejections: nothing was
/// written. `ConflictRetryable` is only surfaced once the bounded internal
/// retry budget is spent. `InvariantViolation` means a contiguity break was
/// detected before commit and the transaction was rolled back.
#[derive(Debug, thiserror::Error)]
pub enum BacklogError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: i64 },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("concurrent update conflict (gave up after {attempts} attempt(s))")]
    ConflictRetryable { attempts: u32 },

    #[error("position invariant violated: {0}")]
    InvariantViolation(#[from] PositionError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("item store error: {0}")]
    Storage(rusqlite::Error),
}

impl BacklogError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub(crate) fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidRequest(_) => ErrorCode::InvalidRequest,
            Self::NotFound { kind, .. } => match kind {
                EntityKind::Item => ErrorCode::ItemNotFound,
                EntityKind::Project => ErrorCode::ProjectNotFound,
                EntityKind::Sprint => ErrorCode::SprintNotFound,
            },
            Self::Forbidden(_) => ErrorCode::Forbidden,
            Self::ConflictRetryable { .. } => ErrorCode::ConflictRetryable,
            Self::InvariantViolation(_) => ErrorCode::InvariantViolation,
            Self::Config(_) => ErrorCode::ConfigParseError,
            Self::Storage(_) => ErrorCode::StorageFailure,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }

    /// Whether the operation may succeed if simply run again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConflictRetryable { .. })
    }
}

impl From<rusqlite::Error> for BacklogError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _)
                if matches!(
                    inner.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                Self::ConflictRetryable { attempts: 0 }
            }
            _ => Self::Storage(err),
        }
    }
}
