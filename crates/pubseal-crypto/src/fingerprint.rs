//! One-way fingerprint of a publication secret, checked in constant time
//!
//! The registry keeps only this digest. It gates the access path: nothing
//! is fetched or decrypted before [`verify`] succeeds.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::{CryptoError, CryptoResult};

const FINGERPRINT_DOMAIN: &[u8] = b"pubseal/key-fingerprint/v1";

fn digest(secret: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(FINGERPRINT_DOMAIN);
    hasher.update(secret);
    hasher.finalize().into()
}

/// Compute the hex-encoded fingerprint of `secret`.
pub fn fingerprint(secret: &[u8]) -> CryptoResult<String> {
    if secret.is_empty() {
        return Err(CryptoError::InvalidInput("empty secret".into()));
    }
    Ok(hex::encode(digest(secret)))
}

/// Check `secret` against a stored fingerprint.
///
/// The comparison time does not depend on where a mismatch occurs. A
/// malformed stored digest or an empty secret never verifies.
pub fn verify(secret: &[u8], stored_hex: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    let Ok(expected) = hex::decode(stored_hex) else {
        return false;
    };
    if expected.len() != 32 {
        return false;
    }
    digest(secret).ct_eq(expected.as_slice()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fingerprint_verifies() {
        let fp = fingerprint(b"the-secret").unwrap();
        assert_eq!(fp.len(), 64);
        assert!(verify(b"the-secret", &fp));
    }

    #[test]
    fn test_fingerprint_is_not_plain_sha256() {
        let plain = hex::encode(Sha256::digest(b"the-secret"));
        assert_ne!(fingerprint(b"the-secret").unwrap(), plain);
    }

    #[test]
    fn test_one_char_change_fails() {
        let fp = fingerprint(b"abcdefgh").unwrap();
        assert!(!verify(b"abcdefgX", &fp));
        assert!(!verify(b"Abcdefgh", &fp));
    }

    #[test]
    fn test_empty_secret() {
        assert!(matches!(
            fingerprint(b"").unwrap_err(),
            CryptoError::InvalidInput(_)
        ));
        let fp = fingerprint(b"x").unwrap();
        assert!(!verify(b"", &fp));
    }

    #[test]
    fn test_malformed_stored_digest() {
        assert!(!verify(b"secret", "not-hex"));
        assert!(!verify(b"secret", "abcd"));
        assert!(!verify(b"secret", ""));
    }

    proptest! {
        #[test]
        fn prop_distinct_secrets_do_not_verify(
            a in proptest::collection::vec(any::<u8>(), 1..=64),
            b in proptest::collection::vec(any::<u8>(), 1..=64),
        ) {
            prop_assume!(a != b);
            let fp = fingerprint(&a).unwrap();
            prop_assert!(verify(&a, &fp));
            prop_assert!(!verify(&b, &fp));
        }
    }
}
