//! Backend-independent record map shared by both registry implementations.

use pubseal_core::{Publication, PublicationId, PublicationStatus, SearchQuery};
use std::collections::HashMap;

use crate::error::{RegistryError, RegistryResult};

#[derive(Debug, Default, Clone)]
pub struct Catalog {
    entries: HashMap<PublicationId, Publication>,
}

impl Catalog {
    pub fn from_entries(entries: HashMap<PublicationId, Publication>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &HashMap<PublicationId, Publication> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, publication: Publication) -> RegistryResult<()> {
        if self.entries.contains_key(&publication.id) {
            return Err(RegistryError::Duplicate(publication.id.to_string()));
        }
        self.entries.insert(publication.id.clone(), publication);
        Ok(())
    }

    pub fn remove(&mut self, id: &PublicationId) -> Option<Publication> {
        self.entries.remove(id)
    }

    pub fn get(&self, id: &PublicationId) -> Option<&Publication> {
        self.entries.get(id)
    }

    fn get_mut(&mut self, id: &PublicationId) -> RegistryResult<&mut Publication> {
        self.entries
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    pub fn increment_access(&mut self, id: &PublicationId) -> RegistryResult<u64> {
        let p = self.get_mut(id)?;
        p.access_count = p.access_count.saturating_add(1);
        Ok(p.access_count)
    }

    pub fn decrement_access(&mut self, id: &PublicationId) {
        if let Ok(p) = self.get_mut(id) {
            p.access_count = p.access_count.saturating_sub(1);
        }
    }

    pub fn increment_failed_access(&mut self, id: &PublicationId) -> RegistryResult<u64> {
        let p = self.get_mut(id)?;
        p.failed_access_count = p.failed_access_count.saturating_add(1);
        Ok(p.failed_access_count)
    }

    pub fn decrement_failed_access(&mut self, id: &PublicationId) {
        if let Ok(p) = self.get_mut(id) {
            p.failed_access_count = p.failed_access_count.saturating_sub(1);
        }
    }

    /// Returns the updated record and whether anything changed.
    pub fn revoke(&mut self, id: &PublicationId, at: u64) -> RegistryResult<(Publication, bool)> {
        let p = self.get_mut(id)?;
        if p.status == PublicationStatus::Revoked {
            return Ok((p.clone(), false));
        }
        p.status = PublicationStatus::Revoked;
        p.revoked_at = Some(at);
        Ok((p.clone(), true))
    }

    pub fn unrevoke(&mut self, id: &PublicationId) {
        if let Ok(p) = self.get_mut(id) {
            p.status = PublicationStatus::Active;
            p.revoked_at = None;
        }
    }

    pub fn search(&self, query: &SearchQuery, limit: usize) -> Vec<Publication> {
        let mut hits: Vec<&Publication> = self
            .entries
            .values()
            .filter(|p| p.is_active() && query.matches(p))
            .collect();
        newest_first(&mut hits);
        hits.into_iter().take(limit).cloned().collect()
    }

    pub fn list_by_owner(&self, owner_id: &str) -> Vec<Publication> {
        let mut owned: Vec<&Publication> = self
            .entries
            .values()
            .filter(|p| p.owner_id == owner_id)
            .collect();
        newest_first(&mut owned);
        owned.into_iter().cloned().collect()
    }
}

/// Newest first; ties broken by id so output order is stable.
fn newest_first(items: &mut [&Publication]) {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}
