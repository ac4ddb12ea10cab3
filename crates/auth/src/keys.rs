//! PEM key handling for key-pair authentication.
//!
//! The private key signs the JWT; the public key is only used to derive the
//! fingerprint the service matches against the key registered for the user.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use jsonwebtoken::{DecodingKey, EncodingKey};
use sha2::{Digest, Sha256};

use crate::error::AuthError;

/// PEM label of an unencrypted PKCS#8 private key.
const PKCS8_PRIVATE_KEY_TAG: &str = "PRIVATE KEY";

/// Decoded key pair: the RS256 signing key plus the public-key fingerprint.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: EncodingKey,
    fingerprint: String,
}

impl KeyPair {
    /// Decode both halves of the pair from PEM text.
    pub fn from_pem(private_key_pem: &str, public_key_pem: &str) -> Result<Self, AuthError> {
        let signing_key = parse_private_key(private_key_pem)?;
        let fingerprint = fingerprint(public_key_pem)?;
        Ok(Self {
            signing_key,
            fingerprint,
        })
    }

    /// `SHA256:<base64>` fingerprint of the public key.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub(crate) fn signing_key(&self) -> &EncodingKey {
        &self.signing_key
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("signing_key", &"<redacted>")
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

/// Compute `SHA256:` + base64(sha256(DER)) over the decoded public key.
pub fn fingerprint(public_key_pem: &str) -> Result<String, AuthError> {
    let block = pem::parse(public_key_pem)
        .map_err(|e| AuthError::InvalidKeyFormat(format!("public key: {e}")))?;

    if !block.tag().ends_with("PUBLIC KEY") || block.contents().is_empty() {
        return Err(AuthError::InvalidKeyFormat(format!(
            "public key: expected a PUBLIC KEY block, found \"{}\"",
            block.tag()
        )));
    }

    let raw = public_key_pem.as_bytes();
    if DecodingKey::from_rsa_pem(raw).is_err() {
        if DecodingKey::from_ec_pem(raw).is_ok() {
            return Err(AuthError::UnsupportedKeyType("public key is EC, not RSA".into()));
        }
        if DecodingKey::from_ed_pem(raw).is_ok() {
            return Err(AuthError::UnsupportedKeyType("public key is Ed25519, not RSA".into()));
        }
        return Err(AuthError::InvalidKeyFormat(
            "public key: not a decodable RSA public key".into(),
        ));
    }

    let digest = Sha256::digest(block.contents());
    Ok(format!("SHA256:{}", STANDARD.encode(digest)))
}

fn parse_private_key(private_key_pem: &str) -> Result<EncodingKey, AuthError> {
    let block = pem::parse(private_key_pem)
        .map_err(|e| AuthError::InvalidKeyFormat(format!("private key: {e}")))?;

    if block.tag() != PKCS8_PRIVATE_KEY_TAG {
        return Err(AuthError::InvalidKeyFormat(format!(
            "private key: expected PKCS#8 \"{PKCS8_PRIVATE_KEY_TAG}\" block, found \"{}\"",
            block.tag()
        )));
    }

    let raw = private_key_pem.as_bytes();
    match EncodingKey::from_rsa_pem(raw) {
        Ok(key) => Ok(key),
        Err(e) => {
            if EncodingKey::from_ec_pem(raw).is_ok() {
                Err(AuthError::UnsupportedKeyType("private key is EC, not RSA".into()))
            } else if EncodingKey::from_ed_pem(raw).is_ok() {
                Err(AuthError::UnsupportedKeyType("private key is Ed25519, not RSA".into()))
            } else {
                Err(AuthError::InvalidKeyFormat(format!("private key: {e}")))
            }
        }
    }
}
