//! pubseal: encrypted content-addressed publication client
//!
//! Commands:
//!   publish <file>   - encrypt, upload and register a file; prints the secret once
//!   access <id>      - verify a secret and write the decrypted file
//!   search [text]    - metadata search over active publications
//!   show <id>        - public details of one publication
//!   revoke <id>      - disable access (owner only)
//!   list / stats     - an owner's publications and access statistics
//!   status           - storage reachability
//!   config show      - display current configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pubseal_core::config::PubsealConfig;
use pubseal_core::{ErrorKind, PublicationMetadata, PublicationSummary, PubsealError, SearchQuery};
use pubseal_service::{open_service, PublicationService, PublishRequest};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "pubseal",
    version,
    about = "Encrypted content-addressed publication",
    long_about = "pubseal: publish files under a one-time secret and retrieve them by id + secret"
)]
struct Cli {
    /// Path to pubseal.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "PUBSEAL_CONFIG",
        default_value = "/etc/pubseal/config.toml"
    )]
    config: PathBuf,

    /// Log filter (e.g. "debug", "pubseal_service=trace")
    #[arg(long, env = "PUBSEAL_LOG", default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt and publish a file
    ///
    /// The secret printed on success is shown exactly once. Without it the
    /// file cannot be recovered by anyone, including the operator.
    Publish {
        /// File to publish
        file: PathBuf,
        #[arg(long, short = 't')]
        title: String,
        #[arg(long, short = 'd', default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        domain: String,
        /// Comma-separated keywords
        #[arg(long, short = 'k', default_value = "")]
        keywords: String,
        /// Publishing identity
        #[arg(long, env = "PUBSEAL_OWNER")]
        owner: String,
        /// Display name shown alongside the publication
        #[arg(long)]
        owner_name: Option<String>,
        /// MIME type (default: guessed from the file name)
        #[arg(long)]
        file_type: Option<String>,
    },

    /// Retrieve and decrypt a publication
    Access {
        /// Publication id
        id: String,
        /// Secret issued at publish time (prompted for when omitted)
        #[arg(long, env = "PUBSEAL_SECRET", hide_env_values = true)]
        secret: Option<String>,
        /// Output path (default: original file name in the current directory)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },

    /// Search publication metadata
    Search {
        /// Free text matched against title, description, domain and keywords
        text: Option<String>,
        #[arg(long)]
        domain: Option<String>,
        /// Match publications carrying any of these keywords (repeatable)
        #[arg(long = "keyword")]
        keywords: Vec<String>,
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// Show public details of a publication
    Show { id: String },

    /// Revoke a publication (owner only)
    Revoke {
        id: String,
        #[arg(long, env = "PUBSEAL_OWNER")]
        owner: String,
    },

    /// List an owner's publications
    List {
        #[arg(long, env = "PUBSEAL_OWNER")]
        owner: String,
    },

    /// Access statistics for an owner's active publications
    Stats {
        #[arg(long, env = "PUBSEAL_OWNER")]
        owner: String,
    },

    /// Check storage reachability
    Status,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(exit_status(&e))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli.config).await?;

    if let Commands::Config {
        action: ConfigAction::Show,
    } = cli.command
    {
        return cmd_config_show(&config, &cli.config);
    }

    let service = open_service(&config).await?;

    match cli.command {
        Commands::Publish {
            file,
            title,
            description,
            domain,
            keywords,
            owner,
            owner_name,
            file_type,
        } => {
            let metadata = PublicationMetadata {
                title,
                description,
                domain,
                keywords: PublicationMetadata::parse_keywords(&keywords),
            };
            cmd_publish(&service, &file, metadata, owner, owner_name, file_type).await
        }
        Commands::Access { id, secret, out } => {
            cmd_access(&service, &id, secret, out.as_deref()).await
        }
        Commands::Search {
            text,
            domain,
            keywords,
            limit,
        } => {
            let query = SearchQuery {
                text,
                domain,
                keywords,
                limit,
            };
            cmd_search(&service, &query).await
        }
        Commands::Show { id } => cmd_show(&service, &id).await,
        Commands::Revoke { id, owner } => cmd_revoke(&service, &id, &owner).await,
        Commands::List { owner } => cmd_list(&service, &owner).await,
        Commands::Stats { owner } => cmd_stats(&service, &owner).await,
        Commands::Status => cmd_status(&service, &config).await,
        Commands::Config { .. } => Ok(()),
    }
}

fn init_logging(filter: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Exit status per error kind so scripts can tell a wrong secret from an
/// outage without parsing stderr.
fn exit_status(err: &anyhow::Error) -> u8 {
    let Some(e) = err.downcast_ref::<PubsealError>() else {
        return 1;
    };
    match e.kind() {
        ErrorKind::InvalidInput => 2,
        ErrorKind::AccessDenied | ErrorKind::NotOwner => 3,
        ErrorKind::NotFound => 4,
        ErrorKind::Revoked => 5,
        ErrorKind::StoreUnavailable => 6,
        ErrorKind::Integrity | ErrorKind::StoreDivergence => 7,
        ErrorKind::Internal => 1,
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

async fn load_config(path: &Path) -> Result<PubsealConfig> {
    if path.exists() {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config: {}", path.display()))
    } else {
        tracing::warn!(path = %path.display(), "config file not found, using defaults");
        Ok(PubsealConfig::default())
    }
}

// ── Progress helpers ──────────────────────────────────────────────────────────

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

// ── `pubseal publish` ─────────────────────────────────────────────────────────

async fn cmd_publish(
    service: &PublicationService,
    file: &Path,
    metadata: PublicationMetadata,
    owner: String,
    owner_name: Option<String>,
    file_type: Option<String>,
) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .with_context(|| format!("not a file path: {}", file.display()))?;
    let file_type = file_type.or_else(|| {
        mime_guess::from_path(file)
            .first()
            .map(|m| m.essence_str().to_string())
    });
    let size = bytes.len() as u64;

    let pb = make_spinner("publish");
    pb.set_message(format!("encrypting and uploading {file_name}"));

    let result = service
        .publish(PublishRequest {
            metadata,
            owner_id: owner,
            owner_name,
            file_name,
            file_type,
            bytes,
        })
        .await;

    let receipt = match result {
        Ok(r) => {
            pb.finish_with_message("done");
            r
        }
        Err(e) => {
            pb.abandon_with_message("failed");
            return Err(e.into());
        }
    };

    println!("Published: {}", receipt.title);
    println!("  id:      {}", receipt.publication_id);
    println!("  address: {}", receipt.content_address);
    println!("  size:    {}", fmt_bytes(size));
    println!("  secret:  {}", receipt.secret.expose());
    println!();
    println!("Save the secret now. It is not stored anywhere and cannot be recovered.");

    Ok(())
}

// ── `pubseal access` ──────────────────────────────────────────────────────────

async fn cmd_access(
    service: &PublicationService,
    id: &str,
    secret: Option<String>,
    out: Option<&Path>,
) -> Result<()> {
    let secret = match secret {
        Some(s) => s,
        None => rpassword::prompt_password("Secret: ").context("reading secret")?,
    };

    let pb = make_spinner("access");
    pb.set_message(format!("fetching {id}"));

    let grant = match service.access(id, &secret).await {
        Ok(g) => {
            pb.finish_and_clear();
            g
        }
        Err(e) => {
            pb.abandon_with_message("failed");
            return Err(e.into());
        }
    };

    // Never trust a stored name as a path
    let default_name = Path::new(&grant.file_name)
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| id.into());
    let dest = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(default_name));

    tokio::fs::write(&dest, &grant.bytes)
        .await
        .with_context(|| format!("writing {}", dest.display()))?;

    println!("Retrieved {} → {}", grant.file_name, dest.display());
    println!("  type: {}", grant.file_type);
    println!("  size: {}", fmt_bytes(grant.bytes.len() as u64));

    Ok(())
}

// ── `pubseal search` / `show` / `list` ────────────────────────────────────────

async fn cmd_search(service: &PublicationService, query: &SearchQuery) -> Result<()> {
    let hits = service.search(query).await?;
    if hits.is_empty() {
        println!("No publications found.");
        return Ok(());
    }
    for p in &hits {
        print_summary_line(p);
    }
    println!();
    println!("{} result(s)", hits.len());
    Ok(())
}

async fn cmd_show(service: &PublicationService, id: &str) -> Result<()> {
    let p = service.details(id).await?;
    println!("{}", p.title);
    println!("  id:          {}", p.id);
    println!("  status:      {}", p.status);
    if !p.description.is_empty() {
        println!("  description: {}", p.description);
    }
    if !p.domain.is_empty() {
        println!("  domain:      {}", p.domain);
    }
    if !p.keywords.is_empty() {
        println!("  keywords:    {}", p.keywords.join(", "));
    }
    match &p.owner_name {
        Some(name) => println!("  owner:       {name} ({})", p.owner_id),
        None => println!("  owner:       {}", p.owner_id),
    }
    println!("  file:        {} ({}, {})", p.file_name, p.file_type, fmt_bytes(p.file_size));
    println!("  address:     {}", p.content_address);
    println!("  accesses:    {}", p.access_count);
    println!("  created:     {}", p.created_at);
    Ok(())
}

async fn cmd_list(service: &PublicationService, owner: &str) -> Result<()> {
    let owned = service.list_owned(owner).await?;
    if owned.is_empty() {
        println!("No publications for {owner}.");
        return Ok(());
    }
    for p in &owned {
        print_summary_line(p);
    }
    Ok(())
}

fn print_summary_line(p: &PublicationSummary) {
    println!(
        "{}  {:<8} {:>6}  {}{}",
        p.id,
        p.status,
        p.access_count,
        p.title,
        if p.domain.is_empty() {
            String::new()
        } else {
            format!("  [{}]", p.domain)
        }
    );
}

// ── `pubseal revoke` / `stats` ────────────────────────────────────────────────

async fn cmd_revoke(service: &PublicationService, id: &str, owner: &str) -> Result<()> {
    let p = service.revoke(id, owner).await?;
    println!("Revoked: {} ({})", p.title, p.id);
    Ok(())
}

async fn cmd_stats(service: &PublicationService, owner: &str) -> Result<()> {
    let stats = service.owner_stats(owner).await?;
    println!("Owner {owner}");
    println!("  active publications: {}", stats.total_publications);
    println!("  total accesses:      {}", stats.total_access);
    println!("  average accesses:    {:.2}", stats.average_access);
    Ok(())
}

// ── `pubseal status` ──────────────────────────────────────────────────────────

async fn cmd_status(service: &PublicationService, config: &PubsealConfig) -> Result<()> {
    let pb = make_spinner("status");
    pb.set_message("checking storage");
    let health = service.check_health().await;
    pb.finish_and_clear();

    println!("pubseal v{}", env!("CARGO_PKG_VERSION"));
    println!("  backend:  {:?}", config.storage.backend);
    println!("  endpoint: {}", config.storage.endpoint);
    println!("  bucket:   {}", config.storage.bucket);
    println!("  registry: {}", config.registry.path.display());
    match health {
        Ok(()) => println!("  storage:  ok"),
        Err(e) => {
            println!("  storage:  UNREACHABLE ({e})");
            return Err(e.into());
        }
    }
    Ok(())
}

// ── `pubseal config show` ─────────────────────────────────────────────────────

fn cmd_config_show(config: &PubsealConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!(
            "# Configuration: defaults (no file at {})",
            config_path.display()
        );
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

fn fmt_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
