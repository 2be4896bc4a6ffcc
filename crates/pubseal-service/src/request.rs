use pubseal_core::{ContentAddress, PublicationId, PublicationMetadata};
use pubseal_crypto::PublicationSecret;

/// Everything needed to publish one file.
#[derive(Clone)]
pub struct PublishRequest {
    pub metadata: PublicationMetadata,
    pub owner_id: String,
    pub owner_name: Option<String>,
    pub file_name: String,
    /// MIME type; guessed from `file_name` when absent
    pub file_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for PublishRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishRequest")
            .field("metadata", &self.metadata)
            .field("owner_id", &self.owner_id)
            .field("owner_name", &self.owner_name)
            .field("file_name", &self.file_name)
            .field("file_type", &self.file_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Returned exactly once per successful publish.
///
/// The only place the secret is ever observable outside the caller.
#[derive(Debug)]
pub struct PublishReceipt {
    pub publication_id: PublicationId,
    pub secret: PublicationSecret,
    pub content_address: ContentAddress,
    pub title: String,
}

/// Decrypted file plus its original transport metadata.
pub struct AccessGrant {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub file_type: String,
}

impl std::fmt::Debug for AccessGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGrant")
            .field("bytes", &self.bytes.len())
            .field("file_name", &self.file_name)
            .field("file_type", &self.file_type)
            .finish()
    }
}
