//! XChaCha20-Poly1305 sealing of whole publication files
//!
//! Envelope format (binary):
//! ```text
//! [1 byte: format version][24 bytes: random nonce][N bytes: ciphertext][16 bytes: Poly1305 tag]
//! AAD = format version byte
//! ```
//!
//! A fresh nonce per call means sealing the same file twice under the same
//! key yields different envelopes, so two publications never share a
//! content address.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};
use crate::kdf::DerivedKey;
use crate::{NONCE_SIZE, TAG_SIZE};

/// Envelope format written by [`encrypt`].
pub const FORMAT_VERSION: u8 = 1;

/// Bytes added to every plaintext: version + nonce + tag.
pub const OVERHEAD: usize = 1 + NONCE_SIZE + TAG_SIZE;

/// Encrypt a plaintext under `key`.
///
/// Returns: `[version][24-byte nonce][ciphertext][16-byte tag]`
pub fn encrypt(key: &DerivedKey, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);

    let aad = [FORMAT_VERSION];
    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad: &aad,
            },
        )
        .map_err(|e| CryptoError::Cipher(e.to_string()))?;

    let mut result = Vec::with_capacity(1 + NONCE_SIZE + ciphertext.len());
    result.push(FORMAT_VERSION);
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Decrypt an envelope produced by [`encrypt`].
///
/// Any failure (wrong key, flipped bit, truncation, unknown version) is a
/// [`CryptoError::Integrity`]; no partial plaintext is ever returned.
pub fn decrypt(key: &DerivedKey, sealed: &[u8]) -> CryptoResult<Vec<u8>> {
    if sealed.len() < OVERHEAD {
        return Err(CryptoError::Integrity(format!(
            "envelope too short: {} bytes (minimum {OVERHEAD})",
            sealed.len()
        )));
    }

    let (version, rest) = sealed.split_at(1);
    if version[0] != FORMAT_VERSION {
        return Err(CryptoError::Integrity(format!(
            "unsupported envelope version {}",
            version[0]
        )));
    }

    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_SIZE);
    let nonce = XNonce::from_slice(nonce_bytes);
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

    cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad: version,
            },
        )
        .map_err(|_| {
            CryptoError::Integrity("authentication failed: wrong key or corrupted data".into())
        })
}
