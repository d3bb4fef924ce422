/// Errors surfaced by the orchestrators and backend adapters
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // A required lookup (organization, project) yielded nothing
    #[error("Configuration error: {0}")]
    Configuration(String),

    // A created resource is missing a derived field
    #[error("Dependency not ready: {0}")]
    DependencyNotReady(String),

    #[error("Unexpected response format: {0}")]
    UnexpectedResponseFormat(String),

    // Any non-2xx, non-404 answer from a backend
    #[error("{backend} request failed with status {status}: {body}")]
    BackendRequestFailed {
        backend: &'static str,
        status: u16,
        body: String,
    },

    // Transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    // Site build or publish subprocess failed
    #[error("Build error: {0}")]
    Build(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A deletion batch ran to the end but at least one call failed
    #[error("deleted {deleted} resources before failing: {source}")]
    PartialDeletion {
        deleted: usize,
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    pub fn backend(backend: &'static str, status: u16, body: impl Into<String>) -> Self {
        AppError::BackendRequestFailed {
            backend,
            status,
            body: body.into(),
        }
    }
}

// Convenient conversions from common error types

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::UnexpectedResponseFormat(err.to_string())
        } else {
            AppError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Build(err.to_string())
    }
}

/// Result type alias used across the crate
pub type AppResult<T> = Result<T, AppError>;

/// Outcome of a delete-by-id call. A not-found answer counts as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyAbsent,
}

impl DeleteOutcome {
    /// Map an HTTP status of a delete call onto an outcome
    pub fn from_status(backend: &'static str, status: u16, body: &str) -> AppResult<Self> {
        match status {
            200..=299 => Ok(DeleteOutcome::Deleted),
            404 => Ok(DeleteOutcome::AlreadyAbsent),
            _ => Err(AppError::backend(backend, status, body)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deleted => "deleted",
            Self::AlreadyAbsent => "already_absent",
        }
    }
}
