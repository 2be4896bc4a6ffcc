use thiserror::Error;

pub type PubsealResult<T> = Result<T, PubsealError>;

#[derive(Debug, Error)]
pub enum PubsealError {
    /// Malformed secret, salt, or empty file. A caller bug; never retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The content store stayed unreachable after the bounded retry budget.
    #[error("content store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("publication not found: {0}")]
    NotFound(String),

    /// The registry points at a content address the store does not have.
    #[error("publication {publication_id} references content {address} that the store does not hold")]
    StoreDivergence {
        publication_id: String,
        address: String,
    },

    /// Wrong secret or unknown publication id. The two are never told apart.
    #[error("access denied")]
    AccessDenied,

    #[error("publication has been revoked")]
    Revoked,

    /// Authenticated decryption or content hash verification failed.
    #[error("integrity check failed: {0}")]
    Integrity(String),

    #[error("caller does not own this publication")]
    NotOwner,

    #[error("registry error: {0}")]
    Registry(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Flat classification of [`PubsealError`] for transport mappings
/// (HTTP status codes, CLI exit codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    StoreUnavailable,
    NotFound,
    StoreDivergence,
    AccessDenied,
    Revoked,
    Integrity,
    NotOwner,
    Internal,
}

impl PubsealError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PubsealError::InvalidInput(_) => ErrorKind::InvalidInput,
            PubsealError::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            PubsealError::NotFound(_) => ErrorKind::NotFound,
            PubsealError::StoreDivergence { .. } => ErrorKind::StoreDivergence,
            PubsealError::AccessDenied => ErrorKind::AccessDenied,
            PubsealError::Revoked => ErrorKind::Revoked,
            PubsealError::Integrity(_) => ErrorKind::Integrity,
            PubsealError::NotOwner => ErrorKind::NotOwner,
            PubsealError::Registry(_)
            | PubsealError::Config(_)
            | PubsealError::Io(_)
            | PubsealError::Other(_) => ErrorKind::Internal,
        }
    }

    /// Whether retrying the whole operation from scratch may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, PubsealError::StoreUnavailable(_))
    }
}
