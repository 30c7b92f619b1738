//! Server Configuration
//!
//! Layered configuration for the escrow bot server. Sources, lowest priority
//! first: `config/default`, `config/local`, an explicit `--config` file and
//! `ESCROWBOT__`-prefixed environment variables. CLI arguments are applied
//! on top by `main`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use escrowbot_core::EscrowConfig;
use escrowbot_types::{ChatId, CryptoSymbol};

/// Server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server binding configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Escrow business rules
    #[serde(default)]
    pub escrow: EscrowConfig,

    /// Price quote source
    #[serde(default)]
    pub quotes: QuotesConfig,

    /// Outbound notifications
    #[serde(default)]
    pub notify: NotifyConfig,

    /// API configuration
    #[serde(default)]
    pub api: ApiSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server binding settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Grace period for in-flight requests on shutdown
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl ServerSettings {
    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind address {}:{}: {}", self.host, self.port, e))
    }

    /// Get the shutdown timeout duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Which price source to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteProvider {
    /// Live CoinGecko prices
    #[default]
    CoinGecko,
    /// Static prices from configuration
    Fixed,
}

/// Price quote configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotesConfig {
    #[serde(default)]
    pub provider: QuoteProvider,

    /// CoinGecko API base URL
    #[serde(default = "default_coingecko_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_quote_timeout")]
    pub timeout_secs: u64,

    /// Unit prices for the fixed provider
    #[serde(default)]
    pub fixed_prices: HashMap<CryptoSymbol, Decimal>,
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self {
            provider: QuoteProvider::default(),
            base_url: default_coingecko_url(),
            timeout_secs: default_quote_timeout(),
            fixed_prices: HashMap::new(),
        }
    }
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Chat gateway webhook; notifications are only logged when unset
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Webhook request timeout in seconds
    #[serde(default = "default_webhook_timeout")]
    pub timeout_secs: u64,

    /// Chat the gateway routes operator messages to
    #[serde(default)]
    pub admin_chat: Option<ChatId>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: default_webhook_timeout(),
            admin_chat: None,
        }
    }
}

/// API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Enable CORS
    #[serde(default)]
    pub enable_cors: bool,

    /// CORS allowed origins
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable request tracing
    #[serde(default = "default_true")]
    pub enable_tracing: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            enable_cors: false,
            cors_origins: default_cors_origins(),
            enable_tracing: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// =============================================================================
// Default Functions
// =============================================================================

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_shutdown_timeout() -> u64 {
    10
}

fn default_coingecko_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

fn default_quote_timeout() -> u64 {
    10
}

fn default_webhook_timeout() -> u64 {
    5
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Configuration Loading
// =============================================================================

impl ServerConfig {
    /// Load configuration from files and environment
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("ESCROWBOT")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("escrow.admins")
                .with_list_parse_key("escrow.catalogue")
                .with_list_parse_key("api.cors_origins"),
        );

        let server_config: ServerConfig = builder.build()?.try_deserialize()?;
        server_config.escrow.validate()?;
        Ok(server_config)
    }

    /// Create a configuration for local development
    pub fn development() -> Self {
        let mut config = Self::default();
        config.server.host = "127.0.0.1".to_string();
        config.logging.level = "debug".to_string();
        config.quotes.provider = QuoteProvider::Fixed;
        config
    }

    pub fn quote_timeout(&self) -> Duration {
        Duration::from_secs(self.quotes.timeout_secs)
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.notify.timeout_secs)
    }
}
