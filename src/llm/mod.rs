//! Text generation with credential failover.
//!
//! `GenerationClient` wraps a `CompletionBackend` and a `CredentialPool`.
//! Critical failures (quota, billing, rate limiting, rejected keys) rotate
//! to the next credential and retry the same prompt; anything else fails
//! immediately. Coming back around to the credential the call started on
//! means every key is spent, which stops the engine.

pub mod credentials;
pub mod gemini;

pub use credentials::CredentialPool;
pub use gemini::GeminiBackend;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use tracing::{error, info, warn};

use crate::error::{BackendError, FailureClass, GenerationError};
use crate::stop::StopSignal;

/// Pause after switching to a new credential.
pub const ROTATION_PAUSE: Duration = Duration::from_secs(1);

/// Lower-cased fragments that mark a failure as critical.
const CRITICAL_MARKERS: &[&str] = &[
    "quota",
    "billing",
    "429",
    "rate limit",
    "resource_exhausted",
    "api key",
    "permission denied",
    "unauthenticated",
    "invalid credential",
];

/// Classify a raw backend error message.
pub fn classify_failure(message: &str) -> FailureClass {
    let lower = message.to_lowercase();
    if CRITICAL_MARKERS.iter().any(|m| lower.contains(m)) {
        FailureClass::Critical
    } else {
        FailureClass::Transient
    }
}

/// A single blocking text-generation call.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Complete `prompt` using `credential`.
    async fn complete(
        &self,
        credential: &SecretString,
        prompt: &str,
    ) -> Result<String, BackendError>;
}

/// Where one `generate` call is in its rotation sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RotationState {
    /// First attempt, on the credential active when the call began.
    Attempting { start: usize },
    /// Retrying after at least one critical failure.
    Rotated { start: usize },
    /// Rotation wrapped back to `start`.
    Exhausted,
}

/// Generation client bound to a credential pool.
pub struct GenerationClient {
    backend: Box<dyn CompletionBackend>,
    pool: CredentialPool,
    stop: StopSignal,
    rotation_pause: Duration,
}

impl GenerationClient {
    pub fn new(
        backend: Box<dyn CompletionBackend>,
        pool: CredentialPool,
        stop: StopSignal,
    ) -> Self {
        Self {
            backend,
            pool,
            stop,
            rotation_pause: ROTATION_PAUSE,
        }
    }

    pub fn with_rotation_pause(mut self, pause: Duration) -> Self {
        self.rotation_pause = pause;
        self
    }

    pub fn pool(&self) -> &CredentialPool {
        &self.pool
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    /// Generate text for `prompt`.
    ///
    /// Makes at most one backend attempt per credential in the pool.
    pub async fn generate(&mut self, prompt: &str) -> Result<String, GenerationError> {
        let mut state = RotationState::Attempting {
            start: self.pool.index(),
        };

        loop {
            let start = match state {
                RotationState::Attempting { start } | RotationState::Rotated { start } => start,
                RotationState::Exhausted => {
                    error!(
                        pool_size = self.pool.len(),
                        "Every credential failed critically; stopping engine"
                    );
                    self.stop.trigger();
                    return Err(GenerationError::Exhausted {
                        pool_size: self.pool.len(),
                    });
                }
            };

            if self.stop.is_stopped() {
                return Err(GenerationError::Stopped);
            }

            match self.backend.complete(self.pool.current(), prompt).await {
                Ok(text) => return Ok(clean_reply(&text)),
                Err(e) if e.is_critical() => {
                    warn!(
                        backend = self.backend.name(),
                        credential = self.pool.index() + 1,
                        error = %e,
                        "Critical generation error"
                    );
                    self.pool.rotate();
                    state = if self.pool.index() == start {
                        RotationState::Exhausted
                    } else {
                        info!(
                            credential = self.pool.index() + 1,
                            pool_size = self.pool.len(),
                            "Switched to next credential"
                        );
                        tokio::time::sleep(self.rotation_pause).await;
                        RotationState::Rotated { start }
                    };
                }
                Err(e) => {
                    warn!(
                        backend = self.backend.name(),
                        error = %e,
                        "Non-critical generation error"
                    );
                    return Err(GenerationError::Failed(e));
                }
            }
        }
    }
}

/// Trim whitespace and any wrapping double quotes.
fn clean_reply(raw: &str) -> String {
    raw.trim().trim_matches('"').to_string()
}
