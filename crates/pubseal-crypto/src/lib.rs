//! pubseal-crypto: the cryptographic core of encrypted publication
//!
//! Publish path:
//! ```text
//! Secret (256-bit random, shown to the caller once)
//!   ├── fingerprint: SHA-256(domain || secret)  → stored for verification
//!   └── Argon2id(secret, salt[16])              → 256-bit content key
//!         └── XChaCha20-Poly1305(key, nonce=random 192-bit)
//!               → [version][nonce][ciphertext || tag]  → content store
//! ```
//!
//! Access path re-derives the key from the caller's secret and the stored
//! salt, but only after the fingerprint has been verified in constant time.

pub mod cipher;
pub mod error;
pub mod fingerprint;
pub mod kdf;
pub mod secret;

pub use cipher::{decrypt, encrypt};
pub use error::{CryptoError, CryptoResult};
pub use fingerprint::{fingerprint, verify};
pub use kdf::{derive_key, generate_salt, DerivedKey, KdfParams};
pub use secret::PublicationSecret;

/// Size of a derived content key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an XChaCha20-Poly1305 nonce (192-bit)
pub const NONCE_SIZE: usize = 24;

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;

/// Size of a per-publication KDF salt
pub const SALT_SIZE: usize = 16;
