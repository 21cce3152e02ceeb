//! Error types for the feed responder.

use std::time::Duration;

/// Top-level error type for the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),

    #[error("Dedup store error: {0}")]
    Dedup(#[from] DedupError),

    #[error("Monitor error: {0}")]
    Monitor(#[from] MonitorError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// How a backend failure affects the active credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Quota, billing, rate limiting or rejected credential. The active
    /// credential cannot serve further requests.
    Critical,
    /// Anything else. Not retried.
    Transient,
}

/// A single failed call to the generation backend.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{backend} call failed ({class:?}): {message}")]
pub struct BackendError {
    pub backend: String,
    pub class: FailureClass,
    pub message: String,
}

impl BackendError {
    pub fn critical(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            class: FailureClass::Critical,
            message: message.into(),
        }
    }

    pub fn transient(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            class: FailureClass::Transient,
            message: message.into(),
        }
    }

    pub fn is_critical(&self) -> bool {
        self.class == FailureClass::Critical
    }
}

/// Errors surfaced by `GenerationClient::generate`.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Engine is stopping; generation skipped")]
    Stopped,

    #[error("All {pool_size} credential(s) exhausted")]
    Exhausted { pool_size: usize },

    #[error("Generation failed: {0}")]
    Failed(#[source] BackendError),
}

/// Errors raised by the automation surface.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SurfaceError {
    #[error("Element not found: {0}")]
    ElementMissing(String),

    #[error("Stale element: {0}")]
    Stale(String),

    #[error("Submission not confirmed within {waited:?}")]
    ConfirmTimeout { waited: Duration },

    #[error("Driver error: {0}")]
    Driver(String),
}

/// Durable dedup storage errors.
#[derive(Debug, thiserror::Error)]
pub enum DedupError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Cycle-level failures caught at the loop boundary.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Failed to collect feed items: {0}")]
    Collect(#[source] SurfaceError),

    #[error("Feed advancement failed: {0}")]
    Advance(#[source] SurfaceError),
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;
