use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 18790;
pub const DEFAULT_BIND: &str = "127.0.0.1";
/// Host channel that holds the serialized schedule collection.
pub const DEFAULT_CHANNEL_NAME: &str = "schedules";
/// Rows per page in both paginated views.
pub const PAGE_SIZE: usize = 10;
/// A new schedule may start at most this many hours in the past.
pub const MAX_PAST_START_HOURS: i64 = 24;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Top-level config (slotwise.toml + SLOTWISE_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotwiseConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub view: ViewConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// Which persistence channel implementation backs the store.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChannelBackend {
    /// Process-local only; nothing survives a restart.
    Memory,
    /// Key/value table in a local SQLite file.
    #[default]
    Sqlite,
    /// Remote host data API.
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default)]
    pub backend: ChannelBackend,
    /// Channel name the document is stored under.
    #[serde(default = "default_channel_name")]
    pub name: String,
    /// SQLite file used by the `sqlite` backend.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Required when `backend = "http"`.
    pub http: Option<HttpChannelConfig>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            backend: ChannelBackend::default(),
            name: default_channel_name(),
            path: default_db_path(),
            http: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpChannelConfig {
    /// Base URL of the host data API (without trailing slash).
    pub base_url: String,
    /// Agent whose channels are read and written.
    pub agent_id: String,
    /// Bearer token sent with every request.
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Push retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Attempts per snapshot, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
    /// Jitter fraction applied to each delay (0.1 = up to +10 %).
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            jitter: default_jitter(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_channel_name() -> String {
    DEFAULT_CHANNEL_NAME.to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.slotwise/slotwise.db", home)
}
fn default_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}
fn default_max_attempts() -> u32 {
    5
}
fn default_backoff_base_ms() -> u64 {
    500
}
fn default_backoff_max_ms() -> u64 {
    30_000
}
fn default_jitter() -> f64 {
    0.1
}
fn default_page_size() -> usize {
    PAGE_SIZE
}

impl SlotwiseConfig {
    /// Load config from a TOML file with SLOTWISE_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g. `SLOTWISE_GATEWAY__PORT=9000`
    /// or `SLOTWISE_CHANNEL__BACKEND=http`. A missing file is not an error:
    /// every section has defaults.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: SlotwiseConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("SLOTWISE_").split("__"))
            .extract()
            .map_err(|e| crate::error::SlotwiseError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> crate::error::Result<()> {
        use crate::error::SlotwiseError;

        if self.view.page_size == 0 {
            return Err(SlotwiseError::Config("view.page_size must be > 0".into()));
        }
        if self.sync.max_attempts == 0 {
            return Err(SlotwiseError::Config("sync.max_attempts must be > 0".into()));
        }
        if self.channel.backend == ChannelBackend::Http && self.channel.http.is_none() {
            return Err(SlotwiseError::Config(
                "channel.backend = \"http\" requires a [channel.http] section".into(),
            ));
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.slotwise/slotwise.toml", home)
}
