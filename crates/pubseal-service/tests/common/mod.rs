//! Shared fixtures: in-memory collaborators and fault-injecting wrappers.

#![allow(dead_code)]

use async_trait::async_trait;
use opendal::Operator;
use pubseal_core::{
    ContentAddress, KdfSettings, Publication, PublicationId, PublicationMetadata, SearchQuery,
};
use pubseal_registry::{InMemoryRegistry, PublicationRegistry, RegistryError, RegistryResult};
use pubseal_service::{PublicationService, PublishRequest, RetryPolicy};
use pubseal_storage::{ContentStore, ObjectContentStore, StoreError, StoreResult};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PREFIX: &str = "it";

pub fn memory_operator() -> Operator {
    Operator::new(opendal::services::Memory::default())
        .expect("memory operator")
        .finish()
}

pub fn fast_kdf() -> KdfSettings {
    KdfSettings {
        mem_cost_kib: 1024,
        time_cost: 1,
        parallelism: 1,
    }
}

pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        attempt_timeout: Duration::from_secs(5),
    }
}

pub fn paper_request() -> PublishRequest {
    PublishRequest {
        metadata: PublicationMetadata {
            title: "T".into(),
            description: String::new(),
            domain: "AI".into(),
            keywords: Vec::new(),
        },
        owner_id: "owner-1".into(),
        owner_name: Some("Ada".into()),
        file_name: "paper.pdf".into(),
        file_type: None,
        bytes: b"ABCDEFGHIJ".to_vec(),
    }
}

pub fn request(title: &str, domain: &str, keywords: &[&str], owner: &str) -> PublishRequest {
    PublishRequest {
        metadata: PublicationMetadata {
            title: title.into(),
            description: format!("about {title}"),
            domain: domain.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        },
        owner_id: owner.into(),
        owner_name: None,
        file_name: "doc.txt".into(),
        file_type: Some("text/plain".into()),
        bytes: title.as_bytes().to_vec(),
    }
}

/// Store wrapper that injects transient failures and records deletes.
pub struct FaultyStore {
    inner: ObjectContentStore,
    pub put_failures: AtomicU32,
    pub get_failures: AtomicU32,
    pub puts: AtomicU32,
    pub gets: AtomicU32,
    pub deleted: Mutex<Vec<ContentAddress>>,
}

impl FaultyStore {
    pub fn new(inner: ObjectContentStore) -> Self {
        Self {
            inner,
            put_failures: AtomicU32::new(0),
            get_failures: AtomicU32::new(0),
            puts: AtomicU32::new(0),
            gets: AtomicU32::new(0),
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn operator(&self) -> &Operator {
        self.inner.operator()
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ContentStore for FaultyStore {
    async fn put(&self, bytes: Vec<u8>) -> StoreResult<ContentAddress> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.put_failures) {
            return Err(StoreError::Unavailable("injected put failure".into()));
        }
        self.inner.put(bytes).await
    }

    async fn get(&self, address: &ContentAddress) -> StoreResult<Vec<u8>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.get_failures) {
            return Err(StoreError::Unavailable("injected get failure".into()));
        }
        self.inner.get(address).await
    }

    async fn delete(&self, address: &ContentAddress) -> StoreResult<()> {
        self.deleted.lock().unwrap().push(address.clone());
        self.inner.delete(address).await
    }

    async fn check_health(&self) -> StoreResult<()> {
        self.inner.check_health().await
    }
}

/// Registry whose writes always fail; reads go to an empty in-memory registry.
#[derive(Default)]
pub struct FailingRegistry {
    inner: InMemoryRegistry,
}

#[async_trait]
impl PublicationRegistry for FailingRegistry {
    async fn insert(&self, _publication: Publication) -> RegistryResult<()> {
        Err(RegistryError::Io(std::io::Error::other("disk full")))
    }

    async fn get(&self, id: &PublicationId) -> RegistryResult<Option<Publication>> {
        self.inner.get(id).await
    }

    async fn increment_access(&self, id: &PublicationId) -> RegistryResult<u64> {
        self.inner.increment_access(id).await
    }

    async fn increment_failed_access(&self, id: &PublicationId) -> RegistryResult<u64> {
        self.inner.increment_failed_access(id).await
    }

    async fn search(&self, query: &SearchQuery, limit: usize) -> RegistryResult<Vec<Publication>> {
        self.inner.search(query, limit).await
    }

    async fn revoke(&self, id: &PublicationId, at: u64) -> RegistryResult<Publication> {
        self.inner.revoke(id, at).await
    }

    async fn list_by_owner(&self, owner_id: &str) -> RegistryResult<Vec<Publication>> {
        self.inner.list_by_owner(owner_id).await
    }
}

/// Registry that forwards to an in-memory one but can misreport records
/// and stall counter writes.
#[derive(Default)]
pub struct InterposedRegistry {
    pub inner: Arc<InMemoryRegistry>,
    /// Hand out records whose salt no longer matches the sealing key
    pub flip_salt: AtomicBool,
    /// Delay applied before each failed-access increment
    pub failed_count_delay: Duration,
}

#[async_trait]
impl PublicationRegistry for InterposedRegistry {
    async fn insert(&self, publication: Publication) -> RegistryResult<()> {
        self.inner.insert(publication).await
    }

    async fn get(&self, id: &PublicationId) -> RegistryResult<Option<Publication>> {
        let mut record = self.inner.get(id).await?;
        if self.flip_salt.load(Ordering::SeqCst) {
            if let Some(record) = record.as_mut() {
                record.salt[0] ^= 0xFF;
            }
        }
        Ok(record)
    }

    async fn increment_access(&self, id: &PublicationId) -> RegistryResult<u64> {
        self.inner.increment_access(id).await
    }

    async fn increment_failed_access(&self, id: &PublicationId) -> RegistryResult<u64> {
        tokio::time::sleep(self.failed_count_delay).await;
        self.inner.increment_failed_access(id).await
    }

    async fn search(&self, query: &SearchQuery, limit: usize) -> RegistryResult<Vec<Publication>> {
        self.inner.search(query, limit).await
    }

    async fn revoke(&self, id: &PublicationId, at: u64) -> RegistryResult<Publication> {
        self.inner.revoke(id, at).await
    }

    async fn list_by_owner(&self, owner_id: &str) -> RegistryResult<Vec<Publication>> {
        self.inner.list_by_owner(owner_id).await
    }
}

pub fn service_over(registry: Arc<dyn PublicationRegistry>) -> PublicationService {
    let store = Arc::new(ObjectContentStore::new(memory_operator(), PREFIX));
    PublicationService::new(store, registry)
        .with_kdf(fast_kdf())
        .with_retry(fast_retry(4))
}

/// Failed-access counts land on a detached task; wait for them.
pub async fn wait_for_failed_count(
    registry: &InMemoryRegistry,
    id: &PublicationId,
    expected: u64,
) -> Publication {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let record = registry
            .get(id)
            .await
            .expect("registry read")
            .expect("record exists");
        if record.failed_access_count >= expected || tokio::time::Instant::now() > deadline {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub struct Harness {
    pub service: Arc<PublicationService>,
    pub store: Arc<FaultyStore>,
    pub registry: Arc<InMemoryRegistry>,
}

pub fn harness() -> Harness {
    harness_with_retry(fast_retry(4))
}

pub fn harness_with_retry(retry: RetryPolicy) -> Harness {
    let store = Arc::new(FaultyStore::new(ObjectContentStore::new(
        memory_operator(),
        PREFIX,
    )));
    let registry = Arc::new(InMemoryRegistry::new());
    let service = PublicationService::new(store.clone(), registry.clone())
        .with_kdf(fast_kdf())
        .with_retry(retry);
    Harness {
        service: Arc::new(service),
        store,
        registry,
    }
}

pub fn blob_path(address: &ContentAddress) -> String {
    let hex = address
        .as_str()
        .strip_prefix("blake3:")
        .expect("blake3 address");
    format!("{PREFIX}/blobs/{hex}")
}
