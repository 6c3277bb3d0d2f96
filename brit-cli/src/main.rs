//! BRIT CLI
//!
//! Command-line interface for the BRIT address exchange: Matcher key
//! generation, the Matcher server and a payer-side client.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tokio::io::AsyncWriteExt;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use brit_api::{ApiConfig, ApiServer, AppState};
use brit_core::error::BritError;
use brit_core::traits::{Clock, HybridCipher, ReplayDateStore, SystemClock};
use brit_core::types::{timestamp_from_millis, KemPublicKey, PayerId};
use brit_crypto::{derive_payer_id, MlKemEnvelope};
use brit_fees::{FeeConfig, FeeService, FileReplayStore, MemoryReplayStore, RetryPolicy};
use brit_pool::load_address_list;
use brit_transport::{HttpTransport, TransportConfig};

const PUBLIC_KEY_FILE: &str = "matcher.pub";
const SECRET_KEY_FILE: &str = "matcher.key";

/// BRIT - Encrypted rotating-address exchange
#[derive(Parser)]
#[command(name = "brit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a Matcher key pair
    Keygen {
        /// Directory to write matcher.pub and matcher.key into
        #[arg(short, long)]
        out: PathBuf,
        /// Overwrite existing key files
        #[arg(long)]
        force: bool,
    },

    /// Run the Matcher server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3001")]
        port: u16,
        /// Bind address
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: String,
        /// Directory holding matcher.key
        #[arg(short, long)]
        keys: PathBuf,
        /// Address list to activate at startup (`<address> [millis]` per line)
        #[arg(short, long)]
        addresses: Option<PathBuf>,
        /// Pool snapshot file
        #[arg(long, env = "BRIT_POOL_FILE")]
        pool_file: Option<PathBuf>,
    },

    /// Request a fee address allocation from a Matcher
    Request {
        /// Matcher base URL
        #[arg(long, env = "BRIT_MATCHER_URL")]
        matcher_url: String,
        /// File holding the Matcher's hex public key
        #[arg(long)]
        matcher_key: PathBuf,
        /// Wallet seed (hex)
        #[arg(long, env = "BRIT_WALLET_SEED", hide_env_values = true)]
        seed: String,
        /// Replay date from a previous exchange (ms since epoch)
        #[arg(long)]
        since: Option<i64>,
        /// File to keep the replay date in between runs
        #[arg(long)]
        state_file: Option<PathBuf>,
        /// Request timeout in seconds
        #[arg(long, default_value = "30")]
        timeout: u64,
        /// Attempts before giving up on transport failures
        #[arg(long, default_value = "4")]
        attempts: u32,
    },

    /// Print the payer id derived from a wallet seed
    PayerId {
        /// Wallet seed (hex)
        #[arg(long, env = "BRIT_WALLET_SEED", hide_env_values = true)]
        seed: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "brit=debug,info"
    } else {
        "brit=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Keygen { out, force } => cmd_keygen(&out, force).await,
        Commands::Serve {
            port,
            bind,
            keys,
            addresses,
            pool_file,
        } => cmd_serve(port, &bind, &keys, addresses.as_deref(), pool_file).await,
        Commands::Request {
            matcher_url,
            matcher_key,
            seed,
            since,
            state_file,
            timeout,
            attempts,
        } => {
            cmd_request(
                &matcher_url,
                &matcher_key,
                &seed,
                since,
                state_file,
                timeout,
                attempts,
            )
            .await
        }
        Commands::PayerId { seed } => cmd_payer_id(&seed),
    }
}

/// Generate a Matcher key pair
async fn cmd_keygen(out: &Path, force: bool) -> Result<()> {
    println!("{}", "🔑 Generating Matcher keys...".cyan().bold());

    let (public_path, secret_path) = write_keypair(out, force).await?;

    println!("{} {}", "✅ Public key:".green(), public_path.display());
    println!("{} {}", "✅ Secret key:".green(), secret_path.display());
    println!("\n{}", "⚠️  IMPORTANT: Keep matcher.key safe!".red().bold());
    println!("   Hand out matcher.pub to wallets; matcher.key never leaves the Matcher host.");

    Ok(())
}

/// Run the Matcher server
async fn cmd_serve(
    port: u16,
    bind: &str,
    keys: &Path,
    addresses: Option<&Path>,
    pool_file: Option<PathBuf>,
) -> Result<()> {
    println!("{}", "🚀 Starting BRIT Matcher...".cyan().bold());

    let config = ApiConfig {
        secret_key_file: Some(keys.join(SECRET_KEY_FILE)),
        pool_file,
        ..ApiConfig::from_env()
    };
    let state = AppState::from_config(config)
        .await
        .context("Failed to load Matcher state")?;

    if let Some(path) = addresses {
        let entries = load_address_list(path, SystemClock.now())
            .await
            .with_context(|| format!("Failed to read address list {}", path.display()))?;

        let mut activated = 0;
        for entry in entries {
            match state.pool.activate(&entry.address, entry.activated_at) {
                Ok(()) => activated += 1,
                Err(BritError::InvalidAddress(reason)) => {
                    warn!(%reason, "Skipping address");
                }
                Err(e) => return Err(e.into()),
            }
        }
        state.pool.persist().await.context("Failed to save pool")?;
        println!("   {} {}", "Activated addresses:".green(), activated);
    }

    println!("   {} http://{}:{}", "Listening on:".green(), bind, port);
    println!("   {} http://{}:{}/health", "Health check:".dimmed(), bind, port);
    if state.config.admin_token.is_none() {
        println!("   {}", "Pool admin API disabled (set BRIT_ADMIN_TOKEN to enable)".yellow());
    }
    println!("\n   Press Ctrl+C to stop.\n");

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    ApiServer::new(state).run(addr).await?;

    Ok(())
}

/// Request an allocation
async fn cmd_request(
    matcher_url: &str,
    matcher_key: &Path,
    seed: &str,
    since: Option<i64>,
    state_file: Option<PathBuf>,
    timeout: u64,
    attempts: u32,
) -> Result<()> {
    println!("{} {}", "📨 Requesting addresses from:".cyan().bold(), matcher_url);

    let payer_id = payer_id_from_hex_seed(seed)?;
    let matcher_key = read_public_key(matcher_key).await?;

    let transport = HttpTransport::with_config(
        TransportConfig::for_base_url(matcher_url).with_timeout_seconds(timeout),
    )
    .context("Invalid Matcher URL")?;

    let store: Arc<dyn ReplayDateStore> = match state_file {
        Some(path) => Arc::new(FileReplayStore::new(path)),
        None => Arc::new(MemoryReplayStore::new()),
    };
    if let Some(millis) = since {
        store.save(Some(timestamp_from_millis(millis)?)).await?;
    }

    let retry = RetryPolicy {
        max_attempts: attempts,
        ..RetryPolicy::default()
    };
    let service = FeeService::new(
        payer_id,
        matcher_key,
        Arc::new(MlKemEnvelope),
        Arc::new(transport),
        store,
        FeeConfig::default().with_retry(retry),
    )?;

    let Some(allocation) = service.refresh().await else {
        bail!("Exchange with the Matcher failed (run with -v for details)");
    };

    if allocation.addresses.is_empty() {
        println!("\n{}", "No addresses allocated this cycle.".yellow());
    } else {
        println!("\n{} {} address(es):", "✅".green(), allocation.addresses.len());
        for address in &allocation.addresses {
            println!("   {}", address);
        }
    }

    match allocation.replay_date {
        Some(date) => println!(
            "\n   {} {} ({})",
            "Replay date:".dimmed(),
            date.timestamp_millis(),
            date.to_rfc3339()
        ),
        None => println!("\n   {} none", "Replay date:".dimmed()),
    }

    Ok(())
}

/// Print a payer id
fn cmd_payer_id(seed: &str) -> Result<()> {
    let payer_id = payer_id_from_hex_seed(seed)?;
    println!("{}", payer_id.to_hex());
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY FILES
// ═══════════════════════════════════════════════════════════════════════════════

async fn write_keypair(dir: &Path, force: bool) -> Result<(PathBuf, PathBuf)> {
    let public_path = dir.join(PUBLIC_KEY_FILE);
    let secret_path = dir.join(SECRET_KEY_FILE);

    if !force && (public_path.exists() || secret_path.exists()) {
        bail!(
            "Key files already exist in {} (use --force to overwrite)",
            dir.display()
        );
    }

    tokio::fs::create_dir_all(dir).await?;
    let keys = MlKemEnvelope.generate_keypair();
    tokio::fs::write(&public_path, keys.public.to_hex()).await?;
    write_secret_file(&secret_path, &keys.secret.to_hex()).await?;

    Ok((public_path, secret_path))
}

/// Writes `contents` to a fresh owner-only file, replacing any old one.
async fn write_secret_file(path: &Path, contents: &str) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options
        .open(path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(contents.as_bytes()).await?;
    file.sync_all().await?;
    Ok(())
}

async fn read_public_key(path: &Path) -> Result<KemPublicKey> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    KemPublicKey::from_hex(text.trim()).context("Invalid Matcher public key")
}

fn payer_id_from_hex_seed(seed: &str) -> Result<PayerId> {
    let seed = hex::decode(seed.trim()).context("Seed must be hex")?;
    derive_payer_id(&seed).context("Unusable wallet seed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use brit_core::types::KemSecretKey;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_keygen_writes_matching_keys() {
        let dir = tempdir().unwrap();
        write_keypair(dir.path(), false).await.unwrap();

        let public = read_public_key(&dir.path().join(PUBLIC_KEY_FILE)).await.unwrap();
        let secret_hex = std::fs::read_to_string(dir.path().join(SECRET_KEY_FILE)).unwrap();
        let secret = KemSecretKey::from_hex(&secret_hex).unwrap();

        // The pair must open what is sealed to it.
        let sealed = MlKemEnvelope.encrypt_hybrid(b"ping", &public).unwrap();
        assert_eq!(MlKemEnvelope.decrypt_hybrid(&sealed, &secret).unwrap(), b"ping");
    }

    #[tokio::test]
    async fn test_keygen_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        write_keypair(dir.path(), false).await.unwrap();
        assert!(write_keypair(dir.path(), false).await.is_err());
        assert!(write_keypair(dir.path(), true).await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_secret_key_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let secret_path = dir.path().join(SECRET_KEY_FILE);
        let mode = |path: &Path| std::fs::metadata(path).unwrap().permissions().mode() & 0o777;

        write_keypair(dir.path(), false).await.unwrap();
        assert_eq!(mode(&secret_path), 0o600);

        // A world-readable leftover is replaced, not reused.
        std::fs::set_permissions(&secret_path, std::fs::Permissions::from_mode(0o644)).unwrap();
        write_keypair(dir.path(), true).await.unwrap();
        assert_eq!(mode(&secret_path), 0o600);
    }

    #[test]
    fn test_payer_id_from_seed() {
        let seed = "00112233445566778899aabbccddeeff";
        let a = payer_id_from_hex_seed(seed).unwrap();
        let b = payer_id_from_hex_seed(&format!("  {}\n", seed)).unwrap();
        assert_eq!(a, b);

        assert!(payer_id_from_hex_seed("zz").is_err());
        assert!(payer_id_from_hex_seed("0011").is_err());
    }

    #[test]
    fn test_cli_parses_request() {
        let cli = Cli::try_parse_from([
            "brit",
            "request",
            "--matcher-url",
            "http://localhost:3001",
            "--matcher-key",
            "keys/matcher.pub",
            "--seed",
            "00112233445566778899aabbccddeeff",
            "--since",
            "1400000000000",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Request { since: Some(1_400_000_000_000), .. }
        ));
    }
}
