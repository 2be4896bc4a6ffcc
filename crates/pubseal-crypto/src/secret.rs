//! Publication secrets: generated once at publish time, handed to the
//! publisher, never persisted.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroize;

use crate::error::{CryptoError, CryptoResult};

/// Random bytes behind a generated secret.
pub const SECRET_BYTES: usize = 32;

/// A secret that unlocks exactly one publication.
///
/// Wraps a [`SecretString`]; the `Debug` impl never prints the value.
pub struct PublicationSecret(SecretString);

impl PublicationSecret {
    /// Draw 256 bits from the OS RNG and encode them URL-safe (43 chars).
    pub fn generate() -> Self {
        let mut bytes = [0u8; SECRET_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let encoded = URL_SAFE_NO_PAD.encode(bytes);
        bytes.zeroize();
        Self(SecretString::from(encoded))
    }

    /// Accept a secret typed or pasted by a caller.
    ///
    /// Surrounding whitespace is dropped. The text is not otherwise
    /// validated: a well-formed but wrong secret fails at verification.
    pub fn from_user_input(raw: &str) -> CryptoResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CryptoError::InvalidInput("empty secret".into()));
        }
        Ok(Self(SecretString::from(trimmed.to_string())))
    }

    /// The secret text, for display to the publisher exactly once.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Bytes fed to the KDF and the fingerprint.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.expose_secret().as_bytes()
    }
}

impl Clone for PublicationSecret {
    fn clone(&self) -> Self {
        Self(SecretString::from(self.expose().to_string()))
    }
}

impl std::fmt::Debug for PublicationSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PublicationSecret([REDACTED])")
    }
}
