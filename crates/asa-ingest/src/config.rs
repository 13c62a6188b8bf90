//! Configuration management
//!
//! Connection settings live in a TOML file with an `[ifdb]` table (default
//! `~/.asa-to-ifdb.toml`) and can be overridden from the environment. The
//! result is validated once at startup and handed to every component by
//! reference as an [`AppConfig`].

use crate::error::{IngestError, Result};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default config file name, placed in the user's home directory.
pub const DEFAULT_CONFIG_FILE_NAME: &str = ".asa-to-ifdb.toml";

/// Default InfluxDB HTTP port.
pub const DEFAULT_PORT: u16 = 8086;

/// Default bucket telegrams are written to.
pub const DEFAULT_BUCKET: &str = "AskSinAnalyzer";

/// Default per-request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 6000;

/// Default number of watermark query attempts.
pub const DEFAULT_QUERY_ATTEMPTS: u32 = 3;

/// Default pause between watermark query attempts in seconds.
pub const DEFAULT_QUERY_RETRY_DELAY_SECS: u64 = 10;

/// InfluxDB 2.x connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluxConfig {
    /// Scheme and host, e.g. `https://localhost`
    pub url: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub org: String,

    #[serde(default = "default_bucket")]
    pub bucket: String,

    pub token: String,

    /// Verify the server's TLS certificate
    #[serde(default)]
    pub verify_ssl: bool,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_query_attempts")]
    pub query_attempts: u32,

    #[serde(default = "default_query_retry_delay_secs")]
    pub query_retry_delay_secs: u64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_bucket() -> String {
    DEFAULT_BUCKET.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_query_attempts() -> u32 {
    DEFAULT_QUERY_ATTEMPTS
}

fn default_query_retry_delay_secs() -> u64 {
    DEFAULT_QUERY_RETRY_DELAY_SECS
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            port: DEFAULT_PORT,
            org: String::new(),
            bucket: DEFAULT_BUCKET.to_string(),
            token: String::new(),
            verify_ssl: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            query_attempts: DEFAULT_QUERY_ATTEMPTS,
            query_retry_delay_secs: DEFAULT_QUERY_RETRY_DELAY_SECS,
        }
    }
}

/// On-disk layout of the config file
#[derive(Debug, Serialize, Deserialize)]
struct ConfigFile {
    ifdb: InfluxConfig,
}

impl InfluxConfig {
    /// Load settings for a run
    ///
    /// Reads `path` when it exists, then applies `ASA_IFDB_*` environment
    /// overrides (a `.env` file is honored) and validates the result.
    pub fn load(path: &Path) -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = if path.is_file() {
            tracing::debug!(path = %path.display(), "Reading configuration file");
            Self::from_file(path)?
        } else {
            tracing::debug!(path = %path.display(), "No configuration file, using environment only");
            Self::default()
        };

        let config = config.with_env()?;
        config.validate()?;

        Ok(config)
    }

    /// Parse the `[ifdb]` table of a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    fn from_toml(text: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(text)?;
        Ok(file.ifdb)
    }

    /// Apply environment overrides
    ///
    /// Environment variables:
    /// - `ASA_IFDB_URL`, `ASA_IFDB_PORT`, `ASA_IFDB_ORG`, `ASA_IFDB_BUCKET`,
    ///   `ASA_IFDB_TOKEN`, `ASA_IFDB_VERIFY_SSL`
    pub fn with_env(self) -> Result<Self> {
        self.with_vars(|key| std::env::var(key).ok())
    }

    fn with_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = var("ASA_IFDB_URL") {
            self.url = url;
        }

        if let Some(port) = var("ASA_IFDB_PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| IngestError::config(format!("ASA_IFDB_PORT is not a port: '{}'", port)))?;
        }

        if let Some(org) = var("ASA_IFDB_ORG") {
            self.org = org;
        }

        if let Some(bucket) = var("ASA_IFDB_BUCKET") {
            self.bucket = bucket;
        }

        if let Some(token) = var("ASA_IFDB_TOKEN") {
            self.token = token;
        }

        if let Some(flag) = var("ASA_IFDB_VERIFY_SSL") {
            self.verify_ssl = parse_flag(&flag);
        }

        Ok(self)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(IngestError::config(format!(
                "url must start with http:// or https://, got '{}'",
                self.url
            )));
        }

        if self.port == 0 {
            return Err(IngestError::config("port must be greater than 0"));
        }

        if self.org.trim().is_empty() {
            return Err(IngestError::config("org cannot be empty"));
        }

        if self.bucket.trim().is_empty() {
            return Err(IngestError::config("bucket cannot be empty"));
        }

        if self.token.trim().is_empty() {
            return Err(IngestError::config("token cannot be empty"));
        }

        if self.query_attempts == 0 {
            return Err(IngestError::config("query_attempts must be at least 1"));
        }

        Ok(())
    }

    /// Server root, `url` joined with `port`
    pub fn base_url(&self) -> String {
        format!("{}:{}", self.url.trim_end_matches('/'), self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Retry policy for the watermark query
    pub fn query_retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.query_attempts,
            Duration::from_secs(self.query_retry_delay_secs),
        )
    }
}

/// `true`/`1` (any case) enable a flag, anything else disables it
fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1")
}

/// `~/.asa-to-ifdb.toml`
pub fn default_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| IngestError::config("Could not determine home directory"))?;
    Ok(home.join(DEFAULT_CONFIG_FILE_NAME))
}

/// Write a config template to `path` for the user to fill in
///
/// Refuses to overwrite an existing file.
pub fn create_template(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(IngestError::ConfigExists(path.to_path_buf()));
    }

    let template = ConfigFile {
        ifdb: InfluxConfig {
            url: "https://localhost".to_string(),
            org: "Your-Org-Goes-Here".to_string(),
            token: "Your-Token-Goes-Here".to_string(),
            ..InfluxConfig::default()
        },
    };

    let text = toml::to_string_pretty(&template)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;

    Ok(())
}

/// What to ingest and how
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    /// Directory scanned for `TelegramsXS_*.csv`
    pub dir: Option<PathBuf>,

    /// Files named explicitly
    pub files: Vec<PathBuf>,

    /// Print points instead of writing them
    pub dry_run: bool,

    /// Only the newest file, only records newer than the watermark
    pub latest: bool,
}

impl RunOptions {
    pub fn validate(&self) -> Result<()> {
        if self.dir.is_none() && self.files.is_empty() {
            return Err(IngestError::config(
                "Either --dir or --file must be specified (use -h for help)",
            ));
        }
        Ok(())
    }
}

/// Complete, validated configuration of one run
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub influx: InfluxConfig,
    pub run: RunOptions,
}

impl AppConfig {
    pub fn new(influx: InfluxConfig, run: RunOptions) -> Result<Self> {
        influx.validate()?;
        run.validate()?;
        Ok(Self { influx, run })
    }
}
