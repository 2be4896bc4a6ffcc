use std::sync::Arc;

use pubseal_core::config::PubsealConfig;
use pubseal_core::types::DEFAULT_SEARCH_LIMIT;
use pubseal_core::{
    now_unix, KdfSettings, OwnerStats, Publication, PublicationId, PublicationMetadata,
    PublicationStatus, PublicationSummary, PubsealError, PubsealResult, SearchQuery,
};
use pubseal_crypto::{
    decrypt, derive_key, encrypt, fingerprint, generate_salt, verify, CryptoError, CryptoResult,
    KdfParams, PublicationSecret,
};
use pubseal_registry::PublicationRegistry;
use pubseal_storage::{ContentStore, StoreError};
use tracing::{debug, error, info, warn};

use crate::request::{AccessGrant, PublishReceipt, PublishRequest};
use crate::retry::{with_retry, RetryPolicy};

/// Orchestrates the publish and access protocols over injected collaborators.
///
/// Holds no mutable state of its own; cheap to share behind an `Arc`.
pub struct PublicationService {
    store: Arc<dyn ContentStore>,
    registry: Arc<dyn PublicationRegistry>,
    kdf: KdfSettings,
    retry: RetryPolicy,
    max_results: usize,
}

impl PublicationService {
    pub fn new(store: Arc<dyn ContentStore>, registry: Arc<dyn PublicationRegistry>) -> Self {
        Self {
            store,
            registry,
            kdf: KdfSettings::default(),
            retry: RetryPolicy::default(),
            max_results: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn from_config(
        config: &PubsealConfig,
        store: Arc<dyn ContentStore>,
        registry: Arc<dyn PublicationRegistry>,
    ) -> Self {
        Self::new(store, registry)
            .with_kdf(config.crypto.kdf_settings())
            .with_retry(RetryPolicy::from(&config.retry))
            .with_max_results(config.search.max_results)
    }

    /// KDF parameters for new publications. Existing records keep theirs.
    pub fn with_kdf(mut self, kdf: KdfSettings) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    /// Encrypt and store a file, then record it.
    ///
    /// Fail-atomic: if the upload fails nothing is recorded; if the
    /// registry write fails the uploaded ciphertext is deleted on a best
    /// effort basis and the freshly generated secret is dropped. A retry
    /// always starts over with a new secret.
    pub async fn publish(&self, request: PublishRequest) -> PubsealResult<PublishReceipt> {
        let PublishRequest {
            metadata,
            owner_id,
            owner_name,
            file_name,
            file_type,
            bytes,
        } = request;

        let title = metadata.title.trim().to_string();
        let owner_id = owner_id.trim().to_string();
        let file_name = file_name.trim().to_string();
        if title.is_empty() {
            return Err(PubsealError::InvalidInput("title is required".into()));
        }
        if owner_id.is_empty() {
            return Err(PubsealError::InvalidInput("owner id is required".into()));
        }
        if file_name.is_empty() {
            return Err(PubsealError::InvalidInput("file name is required".into()));
        }
        if bytes.is_empty() {
            return Err(PubsealError::InvalidInput("file is empty".into()));
        }

        let file_type = file_type
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| {
                mime_guess::from_path(&file_name)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            });
        let file_size = bytes.len() as u64;

        let secret = PublicationSecret::generate();
        let salt = generate_salt();
        let kdf = self.kdf;

        let (sealed, key_fingerprint) = {
            let secret = secret.clone();
            blocking(move || {
                let key = derive_key(secret.as_bytes(), &salt, &kdf_params(kdf))?;
                let sealed = encrypt(&key, &bytes)?;
                Ok((sealed, fingerprint(secret.as_bytes())?))
            })
            .await?
        };

        let content_address = with_retry(&self.retry, "put", || {
            let store = self.store.clone();
            let sealed = sealed.clone();
            async move { store.put(sealed).await }
        })
        .await
        .map_err(|e| {
            warn!(bytes = file_size, "upload failed, nothing recorded: {e}");
            PubsealError::from(e)
        })?;

        let id = PublicationId::generate();
        let publication = Publication {
            id: id.clone(),
            title: title.clone(),
            description: metadata.description.trim().to_string(),
            domain: metadata.domain.trim().to_string(),
            keywords: clean_keywords(&metadata),
            content_address: content_address.clone(),
            salt: salt.to_vec(),
            kdf,
            key_fingerprint,
            owner_id,
            owner_name: owner_name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            file_name,
            file_size,
            file_type,
            access_count: 0,
            failed_access_count: 0,
            status: PublicationStatus::Active,
            created_at: now_unix(),
            revoked_at: None,
        };

        if let Err(e) = self.registry.insert(publication).await {
            error!(%id, address = %content_address, "registry write failed: {e}");
            self.discard_orphan(&content_address).await;
            return Err(e.into());
        }

        info!(%id, address = %content_address, bytes = file_size, "publication created");

        Ok(PublishReceipt {
            publication_id: id,
            secret,
            content_address,
            title,
        })
    }

    /// Verify a secret and return the decrypted file.
    ///
    /// Unknown ids and wrong secrets both yield `AccessDenied`. Nothing is
    /// fetched from the store until the fingerprint matches.
    pub async fn access(&self, publication_id: &str, secret: &str) -> PubsealResult<AccessGrant> {
        let secret = PublicationSecret::from_user_input(secret).map_err(crypto_error)?;

        let Ok(id) = publication_id.parse::<PublicationId>() else {
            debug!("access with blank publication id");
            return Err(PubsealError::AccessDenied);
        };

        let Some(record) = self.registry.get(&id).await? else {
            info!(%id, "access denied");
            return Err(PubsealError::AccessDenied);
        };

        if !record.is_active() {
            info!(%id, "access to revoked publication refused");
            return Err(PubsealError::Revoked);
        }

        if !verify(secret.as_bytes(), &record.key_fingerprint) {
            // Off the response path: a denial for a known id must not take
            // longer than one for an unknown id.
            self.record_failed_access(id.clone());
            info!(%id, "access denied");
            return Err(PubsealError::AccessDenied);
        }

        let address = record.content_address.clone();
        let fetched = with_retry(&self.retry, "get", || {
            let store = self.store.clone();
            let address = address.clone();
            async move { store.get(&address).await }
        })
        .await;

        let sealed = match fetched {
            Ok(bytes) => bytes,
            Err(StoreError::NotFound(_)) => {
                error!(%id, %address, "registry references content the store does not hold");
                return Err(PubsealError::StoreDivergence {
                    publication_id: id.to_string(),
                    address: address.to_string(),
                });
            }
            Err(e @ StoreError::Corrupt { .. }) => {
                error!(%id, %address, "possible tampering: stored blob fails its content hash");
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        let salt = record.salt.clone();
        let kdf = record.kdf;
        let plaintext = blocking(move || {
            let key = derive_key(secret.as_bytes(), &salt, &kdf_params(kdf))?;
            decrypt(&key, &sealed)
        })
        .await
        .inspect_err(|e| {
            if matches!(e, PubsealError::Integrity(_)) {
                error!(%id, %address, "possible tampering or corruption: authenticated decryption failed");
            }
        })?;

        let count = self.registry.increment_access(&id).await?;
        info!(%id, access_count = count, bytes = plaintext.len(), "access granted");

        Ok(AccessGrant {
            bytes: plaintext,
            file_name: record.file_name,
            file_type: record.file_type,
        })
    }

    /// Metadata-only search over active publications.
    pub async fn search(&self, query: &SearchQuery) -> PubsealResult<Vec<PublicationSummary>> {
        let limit = query.effective_limit(self.max_results);
        let hits = self.registry.search(query, limit).await?;
        debug!(hits = hits.len(), limit, "search");
        Ok(hits.iter().map(PublicationSummary::from).collect())
    }

    /// Public metadata for one publication, any status.
    pub async fn details(&self, publication_id: &str) -> PubsealResult<PublicationSummary> {
        let id: PublicationId = publication_id.parse()?;
        let record = self.lookup(&id).await?;
        Ok(PublicationSummary::from(&record))
    }

    /// Disable access to a publication. Only its owner may do this; the
    /// ciphertext stays in the store.
    pub async fn revoke(
        &self,
        publication_id: &str,
        owner_id: &str,
    ) -> PubsealResult<PublicationSummary> {
        let id: PublicationId = publication_id.parse()?;
        let record = self.lookup(&id).await?;

        if record.owner_id != owner_id.trim() {
            warn!(%id, "revoke refused: caller is not the owner");
            return Err(PubsealError::NotOwner);
        }

        let updated = self.registry.revoke(&id, now_unix()).await?;
        info!(%id, "publication revoked");
        Ok(PublicationSummary::from(&updated))
    }

    /// Every publication owned by `owner_id`, newest first.
    pub async fn list_owned(&self, owner_id: &str) -> PubsealResult<Vec<PublicationSummary>> {
        let owner_id = require_owner(owner_id)?;
        let owned = self.registry.list_by_owner(owner_id).await?;
        Ok(owned.iter().map(PublicationSummary::from).collect())
    }

    pub async fn owner_stats(&self, owner_id: &str) -> PubsealResult<OwnerStats> {
        let owner_id = require_owner(owner_id)?;
        let owned = self.registry.list_by_owner(owner_id).await?;
        Ok(OwnerStats::from_publications(&owned))
    }

    pub async fn check_health(&self) -> PubsealResult<()> {
        self.store.check_health().await.map_err(PubsealError::from)
    }

    async fn lookup(&self, id: &PublicationId) -> PubsealResult<Publication> {
        self.registry
            .get(id)
            .await?
            .ok_or_else(|| PubsealError::NotFound(id.to_string()))
    }

    /// Best-effort bump of `failed_access_count` on a detached task.
    fn record_failed_access(&self, id: PublicationId) {
        let registry = self.registry.clone();
        tokio::spawn(async move {
            if let Err(e) = registry.increment_failed_access(&id).await {
                warn!(%id, "could not record failed access: {e}");
            }
        });
    }

    /// One delete attempt for ciphertext nobody can reach any more.
    async fn discard_orphan(&self, address: &pubseal_core::ContentAddress) {
        match self.store.delete(address).await {
            Ok(()) => debug!(%address, "orphaned ciphertext deleted"),
            Err(e) => warn!(%address, "orphaned ciphertext left in store: {e}"),
        }
    }
}

fn require_owner(owner_id: &str) -> PubsealResult<&str> {
    let owner_id = owner_id.trim();
    if owner_id.is_empty() {
        return Err(PubsealError::InvalidInput("owner id is required".into()));
    }
    Ok(owner_id)
}

fn clean_keywords(metadata: &PublicationMetadata) -> Vec<String> {
    metadata
        .keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

fn kdf_params(settings: KdfSettings) -> KdfParams {
    KdfParams {
        mem_cost_kib: settings.mem_cost_kib,
        time_cost: settings.time_cost,
        parallelism: settings.parallelism,
    }
}

fn crypto_error(e: CryptoError) -> PubsealError {
    match e {
        CryptoError::InvalidInput(msg) => PubsealError::InvalidInput(msg),
        CryptoError::Integrity(msg) => PubsealError::Integrity(msg),
        other => PubsealError::Other(anyhow::Error::new(other)),
    }
}

/// Run CPU-bound crypto (Argon2id, whole-file AEAD) off the async workers.
async fn blocking<T, F>(f: F) -> PubsealResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> CryptoResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PubsealError::Other(anyhow::anyhow!("crypto task failed: {e}")))?
        .map_err(crypto_error)
}
