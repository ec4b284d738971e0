//! `acp`: the thin operator CLI wrapping the outbox worker. Deliberately
//! minimal — spec.md treats this binary as a collaborator, specified only
//! via its subcommand/exit-code contract (§6), not a redesign target.
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use acp_audit::{AuditLogger, TracingAuditLogger};
use acp_config::AppSettings;
use acp_outbox::OutboxStore;
use acp_policy::{InMemoryPolicyResolver, PolicyResolver};
use acp_worker::{OutboxWorker, StubProvider, ToolExecutionProvider, WorkerConfig};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Bootstrap failed: bad config, or no durable store available.
const EXIT_FATAL: i32 = 1;
/// `retry-dlq` target envelope was not present in the DLQ.
const EXIT_NOT_FOUND: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "acp", version, about = "Action control plane outbox worker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Optional TOML config overlay (see `acp-config`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the drain loop. `--once` processes a single batch and exits.
    Start {
        #[arg(long)]
        once: bool,
    },
    /// Print `pending=N dlq=M` queue depth counts.
    Status {
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Requeue up to `--limit` DLQ entries back to `pending`.
    Drain {
        #[arg(long)]
        tenant: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Requeue a single DLQ envelope.
    RetryDlq {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        envelope: Uuid,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("acp=debug")
    } else {
        EnvFilter::new("acp=info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(EXIT_FATAL);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let settings = acp_config::load_settings(cli.config.as_deref()).context("load settings")?;
    for warning in settings.warnings() {
        tracing::warn!(%warning, "acp.config_warning");
    }

    let store = build_store(&settings).await?;
    let worker = build_worker(&settings, store);

    let code = match cli.command {
        Commands::Start { once } => {
            if once {
                let processed = worker.process_once().await;
                println!("processed={processed}");
            } else {
                worker.run_forever().await;
            }
            0
        }
        Commands::Status { tenant } => {
            let (pending, dlq) = worker.status(tenant.as_deref()).await;
            println!("pending={pending} dlq={dlq}");
            0
        }
        Commands::Drain { tenant, limit } => {
            let drained = worker.drain_dlq(tenant.as_deref(), limit).await;
            println!("drained={drained}");
            0
        }
        Commands::RetryDlq { envelope, .. } => {
            if worker.retry_dlq(envelope).await {
                println!("requeued={envelope}");
                0
            } else {
                eprintln!("error: envelope {envelope} is not in the dead-letter queue");
                EXIT_NOT_FOUND
            }
        }
    };

    Ok(code)
}

/// Builds the outbox store per `settings.store_url`. `None`, or a
/// configured URL this binary can't connect (e.g. built without the
/// `sql` feature), is a fatal bootstrap failure (spec.md §6, §7 "Store
/// unreachable").
async fn build_store(settings: &AppSettings) -> Result<Arc<dyn OutboxStore>> {
    match settings.store_url.as_deref() {
        None => bail!("no durable store configured: set ACP_STORE_URL or `store_url` in the config overlay"),
        Some(url) => connect_store(url).await,
    }
}

#[cfg(feature = "sql")]
async fn connect_store(url: &str) -> Result<Arc<dyn OutboxStore>> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(url)
        .await
        .context("store unreachable")?;
    Ok(Arc::new(acp_outbox::SqlOutboxStore::new(pool)))
}

#[cfg(not(feature = "sql"))]
async fn connect_store(_url: &str) -> Result<Arc<dyn OutboxStore>> {
    bail!(
        "store_url is configured but this binary was built without the `sql` feature \
         (rebuild with `--features sql`)"
    )
}

fn build_worker(settings: &AppSettings, store: Arc<dyn OutboxStore>) -> OutboxWorker {
    let policy: Arc<dyn PolicyResolver> = Arc::new(InMemoryPolicyResolver::new());
    // The real tool-execution provider is an out-of-scope collaborator
    // (spec.md §1); operators wire their own `ToolExecutionProvider` in a
    // fork of this binary. `StubProvider` keeps `acp start` runnable here.
    let provider: Arc<dyn ToolExecutionProvider> = Arc::new(StubProvider::always_ok());
    let audit: Arc<dyn AuditLogger> = Arc::new(TracingAuditLogger);

    let config = WorkerConfig {
        poll_interval: Duration::from_secs(settings.outbox_poll_interval_seconds),
        batch_size: settings.outbox_batch_size,
        max_attempts: settings.outbox_max_attempts,
        ..WorkerConfig::default()
    };

    OutboxWorker::new(store, policy, provider, audit, config)
}
