//! Configuration management.

use crate::mcp::{OverflowPolicy, QueueSettings};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Name of the per-directory config file.
pub const LOCAL_CONFIG_FILE: &str = ".xmind-mcp.toml";

/// Configuration structure that matches the TOML file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    transport: TransportConfig,
    #[serde(default)]
    cors: CorsConfig,
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    tools: ToolsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServerConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// SSE transport tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Interval between keep-alive comments on idle streams
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
    /// Maximum buffered events per session
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// What to do when a session queue is full
    #[serde(default)]
    pub overflow_policy: OverflowPolicy,
    /// Age after which a session without a stream is reclaimed
    #[serde(default = "default_stale_session_secs")]
    pub stale_session_secs: u64,
    /// How often the reaper looks for stale sessions
    #[serde(default = "default_reap_interval_secs")]
    pub reap_interval_secs: u64,
}

impl TransportConfig {
    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_session_secs)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }

    pub fn queue_settings(&self) -> QueueSettings {
        QueueSettings {
            capacity: self.queue_capacity,
            overflow_policy: self.overflow_policy,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            keepalive_secs: default_keepalive_secs(),
            queue_capacity: default_queue_capacity(),
            overflow_policy: OverflowPolicy::default(),
            stale_session_secs: default_stale_session_secs(),
            reap_interval_secs: default_reap_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CorsConfig {
    /// Allowed origins; empty or `*` allows any origin
    #[serde(default)]
    allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct LoggingConfig {
    /// Path to log file (if set, logs will be written to file in addition to stdout)
    log_file: Option<PathBuf>,
    /// Log level (trace, debug, info, warn, error)
    /// If not set, uses RUST_LOG environment variable or defaults to "info"
    log_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ToolsConfig {
    /// Directory the built-in file tools are confined to
    root_dir: Option<PathBuf>,
}

fn default_host() -> String {
    xmind_mcp_types::DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    xmind_mcp_types::DEFAULT_PORT
}

fn default_keepalive_secs() -> u64 {
    15
}

fn default_queue_capacity() -> usize {
    crate::mcp::queue::DEFAULT_QUEUE_CAPACITY
}

fn default_stale_session_secs() -> u64 {
    300
}

fn default_reap_interval_secs() -> u64 {
    60
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// SSE transport settings
    pub transport: TransportConfig,
    /// CORS allowed origins (empty allows any)
    pub cors_allowed_origins: Vec<String>,
    /// Path to log file (if set, logs will be written to file in addition to stdout)
    pub log_file: Option<PathBuf>,
    /// Log level (if set, overrides RUST_LOG environment variable)
    pub log_level: Option<String>,
    /// Root directory for the built-in file tools
    pub tools_root: PathBuf,
}

impl Config {
    /// Load configuration with full priority chain: CLI args > env vars > config files > defaults.
    ///
    /// Config files are searched in this order:
    /// 1. `config.toml` in user config directory (~/.config/xmind-mcp/ on Linux)
    /// 2. `.xmind-mcp.toml` in current directory
    /// 3. the file given with `--config`, which must exist
    pub fn from_figment(
        config_path: Option<PathBuf>,
        host: Option<String>,
        port: Option<u16>,
    ) -> anyhow::Result<Self> {
        let local_config = env::current_dir().ok().map(|d| d.join(LOCAL_CONFIG_FILE));
        let user_config = directories::ProjectDirs::from("", "", "xmind-mcp")
            .map(|dirs| dirs.config_dir().join("config.toml"));

        // 1. Start with defaults
        let mut figment = Figment::new().merge(Serialized::defaults(ConfigFile::default()));

        // 2. Merge user config file if it exists
        if let Some(ref path) = user_config {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        // 3. Merge local config file if it exists
        if let Some(ref path) = local_config {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        // 4. Merge the explicit config file
        if let Some(ref path) = config_path {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }

        // 5. Legacy PORT variable used by container platforms
        if let Some(p) = env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            figment = figment.merge(Serialized::default("server.port", p));
        }

        // 6. Merge environment variables (XMIND_MCP_* prefix, `__` separates sections)
        figment = figment.merge(Env::prefixed("XMIND_MCP_").split("__"));

        // 7. Merge CLI arguments (highest priority)
        if let Some(ref h) = host {
            figment = figment.merge(Serialized::default("server.host", h));
        }
        if let Some(p) = port {
            figment = figment.merge(Serialized::default("server.port", p));
        }

        let config_file: ConfigFile = figment.extract()?;
        let config = Self::from_file(config_file);
        config.validate()?;
        Ok(config)
    }

    fn from_file(file: ConfigFile) -> Self {
        Self {
            host: file.server.host,
            port: file.server.port,
            transport: file.transport,
            cors_allowed_origins: file.cors.allowed_origins,
            log_file: file.logging.log_file,
            log_level: file.logging.log_level,
            tools_root: file.tools.root_dir.unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    /// Reject settings the transport cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.transport.queue_capacity == 0 {
            anyhow::bail!("transport.queue_capacity must be at least 1");
        }
        if self.transport.keepalive_secs == 0 {
            anyhow::bail!("transport.keepalive_secs must be at least 1");
        }
        if self.transport.reap_interval_secs == 0 {
            anyhow::bail!("transport.reap_interval_secs must be at least 1");
        }
        if self.transport.stale_session_secs == 0 {
            anyhow::bail!("transport.stale_session_secs must be at least 1");
        }
        Ok(())
    }

    /// `host:port` string for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_file(ConfigFile::default())
    }
}
