use pubseal_core::PubsealError;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("blob not found: {0}")]
    NotFound(String),

    /// Transient: network hiccup, throttling, timeout. Safe to retry.
    #[error("content store unavailable: {0}")]
    Unavailable(String),

    /// Fetched bytes do not hash to the address they were requested under.
    #[error("blob {address} is corrupt (content hashes to {actual})")]
    Corrupt { address: String, actual: String },

    #[error("content store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<opendal::Error> for StoreError {
    fn from(e: opendal::Error) -> Self {
        if e.kind() == opendal::ErrorKind::NotFound {
            StoreError::NotFound(e.to_string())
        } else if e.is_temporary() {
            StoreError::Unavailable(e.to_string())
        } else {
            StoreError::Backend(e.to_string())
        }
    }
}

impl From<StoreError> for PubsealError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(msg) => PubsealError::NotFound(msg),
            StoreError::Unavailable(msg) => PubsealError::StoreUnavailable(msg),
            StoreError::Corrupt { address, actual } => PubsealError::Integrity(format!(
                "blob {address} hashes to {actual}"
            )),
            StoreError::Backend(msg) => PubsealError::Other(anyhow::anyhow!(msg)),
        }
    }
}
