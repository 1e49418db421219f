use thiserror::Error;

/// Errors surfaced by a browser-session backend.
///
/// Presence misses are NOT errors: `Backend::wait_for` reports them as
/// `Ok(false)`. Everything here is either a bounded operation giving up
/// (navigation timeout) or the session itself becoming unusable.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Navigation to {url} timed out after {ms}ms")]
    NavigationTimeout { url: String, ms: u64 },

    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("Script execution error: {0}")]
    ScriptError(String),

    #[error("Session not ready")]
    NotReady,

    #[error("Session lost: {0}")]
    SessionLost(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Other: {0}")]
    Other(String),
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Serialization(err.to_string())
    }
}
