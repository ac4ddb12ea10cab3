use flurry_auth::AuthError;

use crate::config::ConfigError;
use crate::result::StatementHandle;
use crate::transport::TransportError;

/// Errors surfaced by the execution coordinator.
#[derive(Debug, thiserror::Error)]
pub enum StatementError {
    /// Credential issuance failed; needs a valid key pair, never retried.
    #[error("Credential error: {0}")]
    Auth(#[from] AuthError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Network or connection failure, passed through untouched.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The service rejected the request or the statement failed.
    #[error("Service error {code}: {message}")]
    Service {
        code: String,
        message: String,
        sql_state: Option<String>,
    },

    /// A status outside the documented contract.
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    /// The wait loop spent its whole probe budget on a running statement.
    #[error("Statement {handle} still running after {attempts} attempts")]
    RetriesExhausted {
        handle: StatementHandle,
        attempts: u32,
    },

    #[error("Service reported a running statement without a handle")]
    MissingHandle,

    /// A success-class response whose body is not the expected JSON.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl StatementError {
    /// Whether the caller may reasonably try again: only transport failures
    /// and an exhausted wait budget qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StatementError::Transport(_) | StatementError::RetriesExhausted { .. }
        )
    }
}
