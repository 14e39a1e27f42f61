use anyhow::{bail, Context};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use zamin_api::{app, config, is_production, AppState};

#[derive(Parser)]
#[command(name = "zamin-api", version, about = "Zamin Education API server")]
struct Args {
    #[arg(long, env = "API_HOST", help = "Address to bind (overrides configuration)")]
    host: Option<String>,

    #[arg(long, short, help = "Port to listen on (overrides configuration)")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("zamin_api=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = config::config().clone();
    if let Some(host) = args.host {
        config.api.host = host;
    }
    if let Some(port) = args.port {
        config.api.port = port;
    }
    tracing::info!("Starting Zamin API in {:?} mode", config.environment);

    if is_production!() && config.security.jwt_secret.is_empty() {
        bail!("JWT_SECRET must be set in production");
    }

    tokio::fs::create_dir_all(&config.storage.root)
        .await
        .with_context(|| format!("failed to create storage root {}", config.storage.root.display()))?;

    let bind_addr = format!("{}:{}", config.api.host, config.api.port);
    let state = AppState::new(config);
    let databases = state.databases.clone();

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Zamin API listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    databases.close_all().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
