use thiserror::Error;

/// Errors raised while issuing a key-pair credential.
///
/// None of these are retryable: the caller has to supply a different key pair.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// PEM could not be decoded, or the container is not the one required
    /// (PKCS#8 `PRIVATE KEY` / SubjectPublicKeyInfo `PUBLIC KEY`).
    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    /// The key decoded fine but it is not an RSA key.
    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),
}
