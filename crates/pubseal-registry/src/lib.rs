//! pubseal-registry: durable publication metadata
//!
//! Records never carry a secret or plaintext. Counter updates happen under
//! a single write lock per call so concurrent accesses are never lost.
//!
//! Two backends:
//!   - [`InMemoryRegistry`]: tests and ephemeral daemons.
//!   - [`JsonFileRegistry`]: whole catalog in memory, written through to a
//!     JSON file atomically (temp + rename) on every mutation.

pub mod catalog;
pub mod error;
pub mod json;
pub mod memory;

use async_trait::async_trait;
use pubseal_core::{Publication, PublicationId, SearchQuery};

pub use error::{RegistryError, RegistryResult};
pub use json::JsonFileRegistry;
pub use memory::InMemoryRegistry;

/// Metadata store consumed by the publication service.
#[async_trait]
pub trait PublicationRegistry: Send + Sync {
    /// Persist a new record. Fails with `Duplicate` if the id is taken.
    async fn insert(&self, publication: Publication) -> RegistryResult<()>;

    async fn get(&self, id: &PublicationId) -> RegistryResult<Option<Publication>>;

    /// Atomically add one to `access_count`, returning the new value.
    async fn increment_access(&self, id: &PublicationId) -> RegistryResult<u64>;

    /// Atomically add one to `failed_access_count`, returning the new value.
    async fn increment_failed_access(&self, id: &PublicationId) -> RegistryResult<u64>;

    /// Active publications matching `query`, newest first, at most `limit`.
    async fn search(&self, query: &SearchQuery, limit: usize) -> RegistryResult<Vec<Publication>>;

    /// Mark a publication revoked and return the updated record.
    ///
    /// Revoking an already revoked record leaves `revoked_at` untouched.
    async fn revoke(&self, id: &PublicationId, at: u64) -> RegistryResult<Publication>;

    /// Every publication (any status) owned by `owner_id`, newest first.
    async fn list_by_owner(&self, owner_id: &str) -> RegistryResult<Vec<Publication>>;
}
