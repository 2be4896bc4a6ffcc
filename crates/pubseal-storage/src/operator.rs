//! OpenDAL Operator factory for pubseal storage backends

use anyhow::{Context, Result};
use opendal::Operator;
use pubseal_core::config::{expand_tilde, StorageBackend, StorageConfig};
use secrecy::{ExposeSecret, SecretString};

/// S3 access keys, read from the environment.
#[derive(Debug)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
}

impl S3Credentials {
    /// `PUBSEAL_ACCESS_KEY_ID`/`PUBSEAL_SECRET_ACCESS_KEY`, falling back to
    /// the `AWS_*` pair. Returns `None` unless both halves are set.
    pub fn from_env() -> Option<Self> {
        let pick = |primary: &str, fallback: &str| {
            std::env::var(primary)
                .or_else(|_| std::env::var(fallback))
                .ok()
                .filter(|v| !v.is_empty())
        };
        let access_key_id = pick("PUBSEAL_ACCESS_KEY_ID", "AWS_ACCESS_KEY_ID")?;
        let secret = pick("PUBSEAL_SECRET_ACCESS_KEY", "AWS_SECRET_ACCESS_KEY")?;
        Some(Self {
            access_key_id,
            secret_access_key: SecretString::from(secret),
        })
    }
}

/// Build an OpenDAL Operator for the configured backend.
///
/// S3 uses path-style addressing (default in opendal 0.55), which is what
/// SeaweedFS and MinIO expect.
pub fn build_operator(cfg: &StorageConfig, creds: Option<&S3Credentials>) -> Result<Operator> {
    let op = match cfg.backend {
        StorageBackend::S3 => {
            // opendal 0.55: builders use the consuming pattern
            let mut builder = opendal::services::S3::default()
                .endpoint(&cfg.endpoint)
                .region(&cfg.region)
                .bucket(&cfg.bucket);
            if let Some(c) = creds {
                builder = builder
                    .access_key_id(&c.access_key_id)
                    .secret_access_key(c.secret_access_key.expose_secret());
            }
            Operator::new(builder)
                .context("creating OpenDAL S3 operator")?
                .layer(opendal::layers::LoggingLayer::default())
                .finish()
        }
        StorageBackend::Fs => {
            let root = expand_tilde(&cfg.root);
            let builder = opendal::services::Fs::default().root(&root.to_string_lossy());
            Operator::new(builder)
                .with_context(|| format!("creating OpenDAL fs operator at {}", root.display()))?
                .layer(opendal::layers::LoggingLayer::default())
                .finish()
        }
        StorageBackend::Memory => Operator::new(opendal::services::Memory::default())
            .context("creating OpenDAL memory operator")?
            .layer(opendal::layers::LoggingLayer::default())
            .finish(),
    };

    Ok(op)
}

/// Build an operator from pubseal-core config, applying the TLS policy.
///
/// If `enforce_tls` is true and an S3 endpoint uses HTTP, this returns an
/// error. Otherwise, a warning is logged for non-HTTPS endpoints.
pub fn build_from_core_config(
    storage: &StorageConfig,
    creds: Option<&S3Credentials>,
) -> Result<Operator> {
    if storage.backend == StorageBackend::S3 && storage.endpoint.starts_with("http://") {
        if storage.enforce_tls {
            anyhow::bail!(
                "S3 endpoint uses plaintext HTTP ({}), but enforce_tls is enabled. \
                 Use an HTTPS endpoint or set storage.enforce_tls = false for local development.",
                storage.endpoint
            );
        }
        tracing::warn!(
            endpoint = %storage.endpoint,
            "S3 endpoint uses plaintext HTTP; set storage.enforce_tls = true and use HTTPS in production"
        );
    }

    if storage.backend == StorageBackend::S3 && creds.is_none() {
        tracing::warn!("no S3 credentials in environment; relying on the OpenDAL default chain");
    }

    build_operator(storage, creds)
}
