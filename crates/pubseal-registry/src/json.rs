//! JSON-file registry: whole catalog in memory, written through on every
//! mutation with an atomic temp + rename.
//!
//! A mutation whose flush fails is rolled back in memory, so a record is
//! only ever visible once it is durable.

use async_trait::async_trait;
use pubseal_core::{Publication, PublicationId, SearchQuery};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::error::RegistryResult;
use crate::PublicationRegistry;

pub struct JsonFileRegistry {
    path: PathBuf,
    catalog: Mutex<Catalog>,
}

impl JsonFileRegistry {
    /// Load or create a registry at the given path.
    /// If the file doesn't exist, starts empty.
    pub async fn open(path: &Path) -> RegistryResult<Self> {
        let catalog = match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let entries: HashMap<PublicationId, Publication> = serde_json::from_str(&content)?;
                Catalog::from_entries(entries)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Catalog::default(),
            Err(e) => return Err(e.into()),
        };

        info!(path = %path.display(), publications = catalog.len(), "registry opened");

        Ok(Self {
            path: path.to_path_buf(),
            catalog: Mutex::new(catalog),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, catalog: &Catalog) -> RegistryResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(catalog.entries())?;

        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, &json).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        debug!(path = %self.path.display(), publications = catalog.len(), "registry flushed");
        Ok(())
    }
}

#[async_trait]
impl PublicationRegistry for JsonFileRegistry {
    async fn insert(&self, publication: Publication) -> RegistryResult<()> {
        let id = publication.id.clone();
        let mut catalog = self.catalog.lock().await;
        catalog.insert(publication)?;
        if let Err(e) = self.flush(&catalog).await {
            catalog.remove(&id);
            return Err(e);
        }
        Ok(())
    }

    async fn get(&self, id: &PublicationId) -> RegistryResult<Option<Publication>> {
        Ok(self.catalog.lock().await.get(id).cloned())
    }

    async fn increment_access(&self, id: &PublicationId) -> RegistryResult<u64> {
        let mut catalog = self.catalog.lock().await;
        let count = catalog.increment_access(id)?;
        if let Err(e) = self.flush(&catalog).await {
            catalog.decrement_access(id);
            return Err(e);
        }
        Ok(count)
    }

    async fn increment_failed_access(&self, id: &PublicationId) -> RegistryResult<u64> {
        let mut catalog = self.catalog.lock().await;
        let count = catalog.increment_failed_access(id)?;
        if let Err(e) = self.flush(&catalog).await {
            catalog.decrement_failed_access(id);
            return Err(e);
        }
        Ok(count)
    }

    async fn search(&self, query: &SearchQuery, limit: usize) -> RegistryResult<Vec<Publication>> {
        Ok(self.catalog.lock().await.search(query, limit))
    }

    async fn revoke(&self, id: &PublicationId, at: u64) -> RegistryResult<Publication> {
        let mut catalog = self.catalog.lock().await;
        let (publication, changed) = catalog.revoke(id, at)?;
        if changed {
            if let Err(e) = self.flush(&catalog).await {
                catalog.unrevoke(id);
                return Err(e);
            }
        }
        Ok(publication)
    }

    async fn list_by_owner(&self, owner_id: &str) -> RegistryResult<Vec<Publication>> {
        Ok(self.catalog.lock().await.list_by_owner(owner_id))
    }
}
