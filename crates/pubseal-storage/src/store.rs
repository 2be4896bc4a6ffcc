//! Content-addressed blob store
//!
//! Addresses are `blake3:<hex>` over the stored bytes. The service never
//! builds one itself: it records whatever [`ContentStore::put`] returns and
//! hands it back to [`ContentStore::get`].

use async_trait::async_trait;
use opendal::Operator;
use pubseal_core::ContentAddress;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};

const ADDRESS_SCHEME: &str = "blake3:";

/// Narrow contract the publication service needs from blob storage.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `bytes` and return the address they can be fetched by.
    async fn put(&self, bytes: Vec<u8>) -> StoreResult<ContentAddress>;

    /// Fetch the bytes stored under `address`.
    async fn get(&self, address: &ContentAddress) -> StoreResult<Vec<u8>>;

    /// Remove a blob. Missing blobs are not an error.
    async fn delete(&self, address: &ContentAddress) -> StoreResult<()>;

    async fn check_health(&self) -> StoreResult<()>;
}

/// [`ContentStore`] over any OpenDAL operator.
#[derive(Clone)]
pub struct ObjectContentStore {
    op: Operator,
    prefix: String,
}

impl ObjectContentStore {
    pub fn new(op: Operator, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into().trim_matches('/').to_string();
        Self { op, prefix }
    }

    pub fn operator(&self) -> &Operator {
        &self.op
    }

    fn blob_path(&self, hex: &str) -> String {
        if self.prefix.is_empty() {
            format!("blobs/{hex}")
        } else {
            format!("{}/blobs/{hex}", self.prefix)
        }
    }

    /// Parse `blake3:<64 hex>` into the hex digest.
    fn digest_of<'a>(address: &'a ContentAddress) -> StoreResult<&'a str> {
        let hex = address
            .as_str()
            .strip_prefix(ADDRESS_SCHEME)
            .ok_or_else(|| StoreError::NotFound(format!("unrecognised address {address}")))?;
        if hex.len() != 64 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(StoreError::NotFound(format!("unrecognised address {address}")));
        }
        Ok(hex)
    }
}

pub fn address_for(bytes: &[u8]) -> ContentAddress {
    ContentAddress::new(format!("{ADDRESS_SCHEME}{}", blake3::hash(bytes).to_hex()))
}

#[async_trait]
impl ContentStore for ObjectContentStore {
    async fn put(&self, bytes: Vec<u8>) -> StoreResult<ContentAddress> {
        let address = address_for(&bytes);
        let hex = Self::digest_of(&address)?.to_string();
        let path = self.blob_path(&hex);
        let len = bytes.len();

        // Identical bytes already stored under this address
        if self.op.exists(&path).await.unwrap_or(false) {
            debug!(%address, "blob already present");
            return Ok(address);
        }

        self.op.write(&path, bytes).await?;
        debug!(%address, bytes = len, "blob stored");
        Ok(address)
    }

    async fn get(&self, address: &ContentAddress) -> StoreResult<Vec<u8>> {
        let hex = Self::digest_of(address)?;
        let bytes = self.op.read(&self.blob_path(hex)).await?.to_vec();

        let actual = blake3::hash(&bytes).to_hex();
        if actual.as_str() != hex {
            warn!(%address, actual = %actual, "blob content does not match its address");
            return Err(StoreError::Corrupt {
                address: address.to_string(),
                actual: actual.to_string(),
            });
        }

        debug!(%address, bytes = bytes.len(), "blob fetched");
        Ok(bytes)
    }

    async fn delete(&self, address: &ContentAddress) -> StoreResult<()> {
        let hex = Self::digest_of(address)?;
        match self.op.delete(&self.blob_path(hex)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn check_health(&self) -> StoreResult<()> {
        crate::health::check_health(&self.op).await
    }
}
