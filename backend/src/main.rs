//! XMind MCP server.

use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use xmind_mcp::{config::Config, create_app_with_config, logging, state::AppState};

/// XMind MCP Server - MCP JSON-RPC over Server-Sent Events
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Path to a TOML config file
    #[arg(long, env = "XMIND_MCP_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration
    let config = Config::from_figment(args.config, args.host, args.port)?;

    // Initialize logging; keep the guard so the file writer flushes on exit
    let log_level = if args.debug {
        Some("debug")
    } else {
        config.log_level.as_deref()
    };
    let _log_guard = logging::init_logging(log_level, config.log_file.as_deref())?;

    info!("Starting XMind MCP server v{}...", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded");

    let state = AppState::from_config(&config);

    let reaper = state.sessions().spawn_reaper(
        config.transport.reap_interval(),
        config.transport.stale_after(),
    );

    let app = create_app_with_config(state.clone(), config.cors_allowed_origins.clone()).await;

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);
    info!("  SSE endpoint:     http://{}/sse", addr);
    info!("  Message endpoint: http://{}/messages/{{session_id}}", addr);
    info!("  API docs:         http://{}/docs", addr);

    // Set up graceful shutdown handler
    let sessions = state.sessions().clone();
    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down gracefully...");

        // Open streams never end on their own; close them so the server can drain.
        sessions.close_all();

        info!("Server shutting down");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    reaper.abort();
    Ok(())
}
