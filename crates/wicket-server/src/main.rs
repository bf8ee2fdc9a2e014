//! Wicket server - main entry point
//!
//! Binds the TCP listener, loads the allow-list and credential store,
//! and serves authenticated menu sessions until interrupted.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wicket_core::{PasswdStore, StoreError};
use wicket_server::{AllowList, AuditEvent, AuditLog, Server, ServerConfig};

#[derive(Parser)]
#[command(name = "wicket-server")]
#[command(about = "Multi-client TCP server with file-backed authentication", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to bind
    #[arg(short, long, default_value = "127.0.0.1")]
    address: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = 9999)]
    port: u16,

    /// Path to a JSON config file (defaults: passwd, whitelist, server.log
    /// in the working directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed a user into the credential store and exit
    #[arg(long, value_name = "NAME:PASSWORD")]
    add_user: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wicket=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };

    let store = PasswdStore::new(&config.passwd_file);

    if let Some(spec) = &cli.add_user {
        return add_user(&store, spec);
    }

    let allowlist = AllowList::load(&config.allowlist_file)?;
    if allowlist.is_empty() {
        error!(
            "Allow-list {:?} is empty; no client will be admitted",
            config.allowlist_file
        );
    }
    info!(
        "Loaded {} allow-list entries from {:?}",
        allowlist.len(),
        config.allowlist_file
    );

    let audit = AuditLog::new(&config.audit_log_file);
    audit.record(&AuditEvent::ServerStarted)?;

    let server = Server::bind(
        SocketAddr::new(cli.address, cli.port),
        Arc::new(store),
        Arc::new(allowlist),
        Arc::new(audit),
    )
    .await?;

    info!(
        "Starting wicket server v{} on {}",
        env!("CARGO_PKG_VERSION"),
        server.local_addr()?
    );

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Server shutting down");
    Ok(())
}

/// Seed one credential record, refusing to duplicate a username.
fn add_user(store: &PasswdStore, spec: &str) -> Result<()> {
    let (name, password) = spec
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("expected NAME:PASSWORD"))?;
    if name.is_empty() {
        anyhow::bail!("username must not be empty");
    }

    match store.user_exists(name) {
        Ok(true) => anyhow::bail!("user {name} already exists"),
        Ok(false) => {}
        // A missing credential file is fine here; add_user creates it
        Err(StoreError::Unavailable(_)) => {}
        Err(e) => return Err(e.into()),
    }

    store.add_user(name, password)?;
    info!("Added user {:?} to {:?}", name, store.path());
    Ok(())
}
