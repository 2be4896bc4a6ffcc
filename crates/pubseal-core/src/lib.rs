pub mod config;
pub mod error;
pub mod types;

pub use error::{ErrorKind, PubsealError, PubsealResult};
pub use types::{
    ContentAddress, KdfSettings, OwnerStats, Publication, PublicationId, PublicationMetadata,
    PublicationStatus, PublicationSummary, SearchQuery,
};

/// Current time as a Unix timestamp in seconds.
pub fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
