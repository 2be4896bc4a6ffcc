use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

#[derive(Debug, Error)]
pub enum CryptoError {
    /// Empty secret, empty or short salt, empty digest input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Wrong key, modified ciphertext, or an envelope this build cannot read.
    #[error("integrity check failed: {0}")]
    Integrity(String),

    #[error("key derivation failed: {0}")]
    Kdf(String),

    #[error("encryption failed: {0}")]
    Cipher(String),
}
