use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    /// Token lifetime in days
    #[serde(default = "default_token_ttl_days")]
    pub expiry_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Storage backend: "memory" or "postgres"
    #[serde(default = "default_database_backend")]
    pub backend: String,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    /// Push provider: "expo" or "memory" (records messages, for local runs)
    #[serde(default = "default_push_provider")]
    pub provider: String,
    #[serde(default = "default_push_endpoint")]
    pub endpoint: String,
    /// Optional Expo access token for enhanced push security
    pub access_token: Option<String>,
    /// Maximum messages per gateway request
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,
    /// Upper bound on a single batch submission in seconds
    #[serde(default = "default_batch_timeout")]
    pub batch_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// "background" hands events to a worker task, "inline" dispatches
    /// before the response is written
    #[serde(default = "default_dispatch_mode")]
    pub mode: String,
    /// Outbox capacity for background mode
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_upload_dir")]
    pub dir: String,
    /// Maximum accepted image size in bytes
    #[serde(default = "default_max_upload_size")]
    pub max_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_token_ttl_days() -> i64 {
    30
}

fn default_database_backend() -> String {
    "memory".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_idle_timeout() -> u64 {
    600 // 10 minutes
}

fn default_push_provider() -> String {
    "expo".to_string()
}

fn default_push_endpoint() -> String {
    "https://exp.host/--/api/v2/push/send".to_string()
}

fn default_batch_limit() -> usize {
    100
}

fn default_batch_timeout() -> u64 {
    10
}

fn default_dispatch_mode() -> String {
    "background".to_string()
}

fn default_outbox_capacity() -> usize {
    1024
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

fn default_max_upload_size() -> usize {
    5 * 1024 * 1024
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();
        Self::load(Self::environment())
    }

    /// WARD_SERVER__PORT, WARD_JWT__SECRET, WARD_DATABASE__URL, ...
    ///
    /// Only `server.cors_origins` is split on commas; every other value is
    /// taken as a scalar.
    fn environment() -> Environment {
        Environment::with_prefix("WARD")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("server.cors_origins")
    }

    fn load(environment: Environment) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("database.backend", "memory")?
            .set_default("push.provider", "expo")?
            .set_default("notifications.mode", "background")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(environment);

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl NotificationConfig {
    pub fn is_inline(&self) -> bool {
        self.mode.eq_ignore_ascii_case("inline")
    }
}

impl LogConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: default_database_backend(),
            url: String::new(),
            pool_size: default_pool_size(),
            connect_timeout_seconds: default_connect_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
        }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            provider: default_push_provider(),
            endpoint: default_push_endpoint(),
            access_token: None,
            batch_limit: default_batch_limit(),
            batch_timeout_seconds: default_batch_timeout(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            mode: default_dispatch_mode(),
            outbox_capacity: default_outbox_capacity(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: default_upload_dir(),
            max_size: default_max_upload_size(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}
