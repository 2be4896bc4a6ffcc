use pubseal_core::PubsealError;

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("publication not found: {0}")]
    NotFound(String),

    #[error("publication id already registered: {0}")]
    Duplicate(String),

    #[error("registry I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("registry serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<RegistryError> for PubsealError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NotFound(id) => PubsealError::NotFound(id),
            other => PubsealError::Registry(other.to_string()),
        }
    }
}
