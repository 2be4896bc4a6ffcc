//! Storage health check

use opendal::Operator;

use crate::error::{StoreError, StoreResult};

/// Verify the storage backend is reachable by listing the root
pub async fn check_health(op: &Operator) -> StoreResult<()> {
    // A list on the root is the lightest check every backend supports
    op.list("/").await.map(|_| ()).map_err(StoreError::from)
}

/// Returns true if storage is reachable, false otherwise (non-panicking)
pub async fn is_healthy(op: &Operator) -> bool {
    check_health(op).await.is_ok()
}
