//! pubseal-service: the publication protocol
//!
//! Publish: secret + salt → Argon2id key → XChaCha20-Poly1305 → content
//! store → registry record. The secret leaves in the receipt and nowhere
//! else.
//!
//! Access: registry lookup → status → constant-time fingerprint check →
//! content store fetch → re-derive key → authenticated decrypt → atomic
//! access count bump. Plaintext is only returned once decryption has
//! fully verified.

pub mod bootstrap;
pub mod request;
pub mod retry;
pub mod service;

pub use bootstrap::open_service;
pub use request::{AccessGrant, PublishReceipt, PublishRequest};
pub use retry::{with_retry, RetryPolicy};
pub use service::PublicationService;
