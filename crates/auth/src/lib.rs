pub mod clock;
pub mod error;
pub mod keys;
pub mod token;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::AuthError;
pub use keys::{fingerprint, KeyPair};
pub use token::{
    issue, normalize_account, normalize_user, Claims, Credential, CredentialProvider,
    TokenConfig, TokenIssuer, AUDIENCE, DEFAULT_VALIDITY_SECS,
};
