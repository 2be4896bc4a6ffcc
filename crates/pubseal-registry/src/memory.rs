use async_trait::async_trait;
use pubseal_core::{Publication, PublicationId, SearchQuery};
use tokio::sync::RwLock;
use tracing::debug;

use crate::catalog::Catalog;
use crate::error::RegistryResult;
use crate::PublicationRegistry;

/// Process-local registry. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    catalog: RwLock<Catalog>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.catalog.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.catalog.read().await.is_empty()
    }
}

#[async_trait]
impl PublicationRegistry for InMemoryRegistry {
    async fn insert(&self, publication: Publication) -> RegistryResult<()> {
        let id = publication.id.clone();
        self.catalog.write().await.insert(publication)?;
        debug!(%id, "publication registered");
        Ok(())
    }

    async fn get(&self, id: &PublicationId) -> RegistryResult<Option<Publication>> {
        Ok(self.catalog.read().await.get(id).cloned())
    }

    async fn increment_access(&self, id: &PublicationId) -> RegistryResult<u64> {
        self.catalog.write().await.increment_access(id)
    }

    async fn increment_failed_access(&self, id: &PublicationId) -> RegistryResult<u64> {
        self.catalog.write().await.increment_failed_access(id)
    }

    async fn search(&self, query: &SearchQuery, limit: usize) -> RegistryResult<Vec<Publication>> {
        Ok(self.catalog.read().await.search(query, limit))
    }

    async fn revoke(&self, id: &PublicationId, at: u64) -> RegistryResult<Publication> {
        let (publication, _) = self.catalog.write().await.revoke(id, at)?;
        Ok(publication)
    }

    async fn list_by_owner(&self, owner_id: &str) -> RegistryResult<Vec<Publication>> {
        Ok(self.catalog.read().await.list_by_owner(owner_id))
    }
}
