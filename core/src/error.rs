use thiserror::Error;

/// Every failure the tracker surfaces to a user.
///
/// Validation errors are raised before any remote call. Store and AI errors
/// come back from the backend traits and never leave the cached collection
/// partially updated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FitlogError {
    /// Invalid credentials, duplicate registration, or no active session.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Any failed create/read/update/delete against the record store.
    #[error("Record store error: {0}")]
    Store(String),

    /// The completion request failed or returned unusable content.
    #[error("AI service error: {0}")]
    AiService(String),

    /// Malformed numeric input, bad handle format, short secret.
    #[error("{0}")]
    Validation(String),
}

pub type Result<T, E = FitlogError> = std::result::Result<T, E>;
