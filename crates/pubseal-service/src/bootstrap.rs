//! Wire a service from configuration: OpenDAL store + JSON registry.

use anyhow::{Context, Result};
use pubseal_core::config::{expand_tilde, PubsealConfig};
use pubseal_registry::JsonFileRegistry;
use pubseal_storage::{build_from_core_config, ObjectContentStore, S3Credentials};
use std::sync::Arc;
use tracing::info;

use crate::service::PublicationService;

pub async fn open_service(config: &PubsealConfig) -> Result<PublicationService> {
    let creds = S3Credentials::from_env();
    let op = build_from_core_config(&config.storage, creds.as_ref())
        .context("building storage operator")?;
    let store = ObjectContentStore::new(op, config.storage.prefix.clone());

    let registry_path = expand_tilde(&config.registry.path);
    let registry = JsonFileRegistry::open(&registry_path)
        .await
        .with_context(|| format!("opening registry: {}", registry_path.display()))?;

    info!(
        backend = ?config.storage.backend,
        registry = %registry_path.display(),
        "publication service ready"
    );

    Ok(PublicationService::from_config(
        config,
        Arc::new(store),
        Arc::new(registry),
    ))
}
