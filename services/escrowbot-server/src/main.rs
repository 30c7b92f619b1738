//! Escrow Bot Server
//!
//! Hosts the escrow desk behind the HTTP command surface. A chat gateway
//! forwards button presses and typed messages as commands and receives the
//! bot's replies on its webhook.
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings
//! escrowbot-server
//!
//! # Start with custom config
//! escrowbot-server --config /path/to/config.toml
//!
//! # Start with environment overrides
//! ESCROWBOT__SERVER__PORT=8080 ESCROWBOT__ESCROW__ADMINS=1001,1002 escrowbot-server
//! ```

mod config;

use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tokio::sync::oneshot;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use escrowbot_api::{create_router, ApiConfig, AppState, WebhookConfig, WebhookNotifier};
use escrowbot_core::{EscrowDesk, NotificationPort, TracingNotifier};
use escrowbot_quotes::{CoinGeckoConfig, CoinGeckoQuotes, FixedQuotes, PriceQuotePort};

use crate::config::{QuoteProvider, ServerConfig};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Escrow Bot Server - chat-hosted escrow trades
#[derive(Parser, Debug)]
#[command(name = "escrowbot-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML, JSON, or YAML)
    #[arg(short, long, env = "ESCROWBOT_CONFIG")]
    config: Option<String>,

    /// Host to bind to
    #[arg(long, env = "ESCROWBOT_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "ESCROWBOT_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "ESCROWBOT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (json, pretty)
    #[arg(long, env = "ESCROWBOT_LOG_FORMAT")]
    log_format: Option<String>,

    /// Use static prices from the configuration instead of CoinGecko
    #[arg(long)]
    fixed_quotes: bool,
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut server_config = ServerConfig::load(args.config.as_deref())?;

    // Override with CLI arguments
    if let Some(host) = args.host {
        server_config.server.host = host;
    }
    if let Some(port) = args.port {
        server_config.server.port = port;
    }
    if let Some(level) = args.log_level {
        server_config.logging.level = level;
    }
    if let Some(format) = args.log_format {
        server_config.logging.format = format;
    }
    if args.fixed_quotes {
        server_config.quotes.provider = QuoteProvider::Fixed;
    }

    init_logging(&server_config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Escrow Bot Server"
    );

    if server_config.escrow.admins.is_empty() {
        tracing::warn!("No admins configured; payments can never be confirmed");
    }

    let quotes = init_quotes(&server_config)?;
    let notifier = init_notifier(&server_config)?;
    let desk = EscrowDesk::new(server_config.escrow.clone(), quotes, notifier)?;

    let state = Arc::new(AppState::new(desk));
    let api_config = ApiConfig {
        enable_cors: server_config.api.enable_cors,
        cors_origins: server_config.api.cors_origins.clone(),
        enable_tracing: server_config.api.enable_tracing,
    };
    let app = create_router(state, api_config);

    let addr = server_config.server.socket_addr()?;
    tracing::info!(
        host = %server_config.server.host,
        port = %server_config.server.port,
        "Server listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let (signalled_tx, signalled_rx) = oneshot::channel();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = signalled_tx.send(());
        })
        .into_future();

    if drain_within(server, signalled_rx, server_config.server.shutdown_timeout()).await? {
        tracing::info!("Server shutdown complete");
    }

    Ok(())
}

// =============================================================================
// Initialization Functions
// =============================================================================

/// Initialize tracing/logging
fn init_logging(config: &config::LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))?;

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            subscriber
                .with(fmt::layer().json().with_target(true))
                .try_init()?;
        }
        _ => {
            subscriber
                .with(fmt::layer().pretty().with_target(true))
                .try_init()?;
        }
    }

    Ok(())
}

/// Build the configured price source
fn init_quotes(config: &ServerConfig) -> anyhow::Result<Arc<dyn PriceQuotePort>> {
    match config.quotes.provider {
        QuoteProvider::CoinGecko => {
            let quotes = CoinGeckoQuotes::new(CoinGeckoConfig {
                base_url: config.quotes.base_url.clone(),
                timeout: config.quote_timeout(),
            })?;
            tracing::info!(base_url = %config.quotes.base_url, "Using CoinGecko prices");
            Ok(Arc::new(quotes))
        }
        QuoteProvider::Fixed => {
            if config.quotes.fixed_prices.is_empty() {
                tracing::warn!("Fixed price source has no prices; every quote will fail");
            }
            tracing::info!(symbols = config.quotes.fixed_prices.len(), "Using fixed prices");
            Ok(Arc::new(FixedQuotes::with_prices(
                config.quotes.fixed_prices.clone(),
            )))
        }
    }
}

/// Build the outbound notification transport
fn init_notifier(config: &ServerConfig) -> anyhow::Result<Arc<dyn NotificationPort>> {
    match &config.notify.webhook_url {
        Some(url) => {
            let notifier = WebhookNotifier::new(WebhookConfig {
                url: url.clone(),
                timeout: config.webhook_timeout(),
                admin_chat: config.notify.admin_chat,
            })?;
            tracing::info!(url = %url, "Delivering notifications to webhook");
            Ok(Arc::new(notifier))
        }
        None => {
            tracing::warn!("No webhook configured; notifications are only logged");
            Ok(Arc::new(TracingNotifier))
        }
    }
}

// =============================================================================
// Graceful Shutdown
// =============================================================================

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

}

/// Run the server until it exits, giving in-flight requests at most
/// `timeout` to finish once shutdown has been signalled
///
/// Returns `false` if the deadline cut the drain short.
async fn drain_within<S>(
    server: S,
    signalled: oneshot::Receiver<()>,
    timeout: Duration,
) -> std::io::Result<bool>
where
    S: Future<Output = std::io::Result<()>>,
{
    let deadline = async move {
        match signalled.await {
            Ok(()) => {
                tracing::info!(
                    timeout_secs = timeout.as_secs(),
                    "Waiting for in-flight requests to complete..."
                );
                tokio::time::sleep(timeout).await;
            }
            // Server exited without a signal
            Err(_) => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        result = server => result.map(|()| true),
        _ = deadline => {
            tracing::warn!(
                timeout_secs = timeout.as_secs(),
                "In-flight requests did not finish in time, forcing shutdown"
            );
            Ok(false)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
