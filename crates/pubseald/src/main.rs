//! pubseald: encrypted publication daemon
//!
//! Usage:
//!   pubseald [--config /etc/pubseal/config.toml] [--listen 0.0.0.0:8470]

mod api;
mod daemon;
mod metrics;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::Path;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "pubseald", version, about = "pubseal publication daemon")]
struct Cli {
    /// Path to pubseal.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "PUBSEAL_CONFIG",
        default_value = "/etc/pubseal/config.toml"
    )]
    config: PathBuf,

    /// Listen address (overrides daemon.listen)
    #[arg(long, env = "PUBSEAL_LISTEN")]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides daemon.log_level
    #[arg(long, env = "PUBSEAL_LOG")]
    log: Option<String>,

    /// Log format; overrides daemon.log_format
    #[arg(long, env = "PUBSEAL_LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config is read before logging starts so its log settings apply
    let (mut config, config_found) = load_config(&cli.config).await?;

    let level = cli.log.clone().unwrap_or_else(|| config.daemon.log_level.clone());
    let format = cli.log_format.clone().unwrap_or_else(|| {
        if config.daemon.log_format.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    });
    init_logging(&level, &format);

    if !config_found {
        tracing::warn!(
            "config file not found: {}  (using defaults)",
            cli.config.display()
        );
    }

    if let Some(listen) = cli.listen {
        config.daemon.listen = listen;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "pubseald starting"
    );

    daemon::run(config).await
}

async fn load_config(path: &Path) -> Result<(pubseal_core::config::PubsealConfig, bool)> {
    if path.exists() {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow::anyhow!("reading config {}: {e}", path.display()))?;
        let config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("parsing config {}: {e}", path.display()))?;
        Ok((config, true))
    } else {
        Ok((pubseal_core::config::PubsealConfig::default(), false))
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
        }
    }
}
