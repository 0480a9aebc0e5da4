use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use momentum_sync::api::{self, AppState, IdentityVerifier, StaticIdentityVerifier};
use momentum_sync::calendar::GoogleCalendarClient;
use momentum_sync::config::AppConfig;
use momentum_sync::db::Database;
use momentum_sync::error::SyncError;
use momentum_sync::store::CredentialStore;
use momentum_sync::sync::{
    FanOut, HttpDispatcher, SyncContext, SyncDispatcher, SyncExecutor, TaskDispatcher,
};

#[derive(Parser)]
#[command(name = "momentum-sync")]
#[command(about = "Mirror task lists into users' calendars")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP trigger server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Also run a fan-out pass every N minutes (at most one week)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..=10_080))]
        sync_interval_minutes: Option<u64>,
    },
    /// Sync one user and print the result
    SyncUser {
        uid: String,
    },
    /// Dispatch a sync for every connected user and wait for them to finish
    SyncAll,
    /// Write a JSON document into the store
    PutDocument {
        /// Document path, e.g. users/u1/tasks/list
        path: String,
        /// File holding the JSON object
        file: PathBuf,
        /// Merge into the existing document instead of replacing it
        #[arg(long)]
        merge: bool,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "momentum_sync=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn open_database(config: &AppConfig) -> anyhow::Result<Database> {
    let db = match &config.db_path {
        Some(path) => Database::open(path.clone())?,
        None => Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

struct Services {
    executor: Arc<SyncExecutor>,
    fanout: Arc<FanOut>,
    /// Present when syncs run in this process.
    local: Option<Arc<TaskDispatcher>>,
}

fn build_services(config: &AppConfig, db: Database, force_local: bool) -> anyhow::Result<Services> {
    let calendar = Arc::new(GoogleCalendarClient::new(config.google.clone()));
    let credentials: Arc<dyn CredentialStore> = Arc::new(db.clone());
    let executor = Arc::new(SyncExecutor::new(SyncContext::with_database(
        db,
        calendar,
        config.sync.clone(),
    )));

    let (dispatcher, local) = match &config.dispatch_url {
        Some(url) if !force_local => {
            let secret = config
                .security
                .sync_secret
                .clone()
                .context("MOMENTUM_DISPATCH_URL requires MOMENTUM_SYNC_SECRET")?;
            tracing::info!("Dispatching syncs to {}", url);
            (
                Arc::new(HttpDispatcher::new(url, secret)?) as Arc<dyn SyncDispatcher>,
                None,
            )
        }
        _ => {
            let local = Arc::new(TaskDispatcher::new(
                executor.clone(),
                config.max_concurrent_syncs,
            ));
            (local.clone() as Arc<dyn SyncDispatcher>, Some(local))
        }
    };

    Ok(Services {
        fanout: Arc::new(FanOut::new(credentials, dispatcher)),
        executor,
        local,
    })
}

fn identity_verifier(config: &AppConfig) -> anyhow::Result<Arc<dyn IdentityVerifier>> {
    let verifier = match &config.identity_tokens {
        Some(raw) => StaticIdentityVerifier::parse(raw)?,
        None => {
            tracing::warn!("MOMENTUM_IDENTITY_TOKENS not set, user sync requests will be rejected");
            StaticIdentityVerifier::default()
        }
    };
    Ok(Arc::new(verifier))
}

async fn serve(config: AppConfig, port: u16, interval_minutes: Option<u64>) -> anyhow::Result<()> {
    let db = open_database(&config)?;
    let services = build_services(&config, db, false)?;

    if let Some(minutes) = interval_minutes.filter(|m| *m > 0) {
        let fanout = services.fanout.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(minutes.saturating_mul(60)));
            loop {
                ticker.tick().await;
                if let Err(e) = fanout.trigger_all() {
                    tracing::error!(error = %e, "Scheduled fan-out failed");
                }
            }
        });
        tracing::info!("Scheduled fan-out every {} minutes", minutes);
    }

    let state = AppState {
        executor: services.executor,
        fanout: services.fanout,
        identity: identity_verifier(&config)?,
        security: config.security.clone(),
    };
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!("Momentum sync listening on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    match cli.command {
        Some(Commands::Serve {
            port,
            sync_interval_minutes,
        }) => serve(config, port, sync_interval_minutes).await?,
        None => serve(config, 3000, None).await?,
        Some(Commands::SyncUser { uid }) => {
            let db = open_database(&config)?;
            let services = build_services(&config, db, true)?;
            match services.executor.sync(&uid).await {
                Ok(report) => println!("{}", serde_json::to_string_pretty(&report)?),
                Err(SyncError::NoTasks(_)) => println!("No tasks to sync for {}", uid),
                Err(e) => return Err(e.into()),
            }
        }
        Some(Commands::SyncAll) => {
            let db = open_database(&config)?;
            let services = build_services(&config, db, true)?;
            let summary = services.fanout.trigger_all()?;
            println!("Triggered sync for {} users", summary.triggered);
            if let Some(local) = services.local {
                local.wait_idle().await;
            }
        }
        Some(Commands::PutDocument { path, file, merge }) => {
            let db = open_database(&config)?;
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let value: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("{} is not valid JSON", file.display()))?;
            db.set_document(&path, value, merge)?;
            println!("Wrote {}", path);
        }
    }

    Ok(())
}
