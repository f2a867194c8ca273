//! Service configuration
//!
//! Settings are layered with the `config` crate:
//! 1. built-in defaults
//! 2. an optional `config/redline.{toml,yaml,json}` file
//! 3. environment variables prefixed with `REDLINE__`, using `__` as the
//!    nesting separator (e.g. `REDLINE__AUTH__JWT_SECRET`)

use common::database::DatabaseConfig;
use serde::Deserialize;

const ENV_PREFIX: &str = "REDLINE";
const ENV_SEPARATOR: &str = "__";

/// Top-level service settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub auth: AuthSettings,
    pub identity: IdentitySettings,
    pub storage: StorageSettings,
    #[serde(default)]
    pub feed: FeedSettings,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origin allowed by CORS; any origin when unset
    #[serde(default)]
    pub allowed_origin: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origin: None,
        }
    }
}

impl ServerSettings {
    /// Socket address the listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Bearer token verification settings
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// HS256 secret shared with the identity provider
    pub jwt_secret: String,
    #[serde(default = "default_audience")]
    pub audience: String,
    /// Clock skew tolerated on `exp`, in seconds
    #[serde(default = "default_leeway")]
    pub leeway_secs: u64,
}

/// Identity provider admin API settings
#[derive(Debug, Clone, Deserialize)]
pub struct IdentitySettings {
    /// Base URL of the provider, e.g. `https://project.supabase.co`
    pub url: String,
    /// Service-role key used for admin calls
    pub service_key: String,
}

/// Object storage settings
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Custom S3 endpoint; the AWS default endpoint when unset
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    /// Prefix of public object URLs, followed by `/<bucket>/<key>`
    pub public_base_url: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

/// Feed pagination settings
#[derive(Debug, Clone, Deserialize)]
pub struct FeedSettings {
    #[serde(default = "default_window_days")]
    pub window_days: i64,
    #[serde(default = "default_limit")]
    pub default_limit: i64,
    #[serde(default = "default_max_limit")]
    pub max_limit: i64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

fn default_audience() -> String {
    "authenticated".to_string()
}

const fn default_leeway() -> u64 {
    30
}

fn default_region() -> String {
    "us-east-1".to_string()
}

const fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

const fn default_window_days() -> i64 {
    14
}

const fn default_limit() -> i64 {
    5
}

const fn default_max_limit() -> i64 {
    50
}

impl Settings {
    /// Load settings from the optional config file and the process environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::build(None)
    }

    /// Load settings from an explicit environment map instead of the process
    /// environment
    pub fn from_env_map(vars: config::Map<String, String>) -> Result<Self, config::ConfigError> {
        Self::build(Some(vars))
    }

    fn build(vars: Option<config::Map<String, String>>) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/redline").required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true)
                    .source(vars),
            )
            .build()?;

        config.try_deserialize()
    }
}
