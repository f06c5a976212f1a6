//! Configuration for the SCPI client.
//!
//! Configuration is loaded in layers, later layers overriding earlier ones:
//!
//! 1. Built-in defaults (the Chroma's factory address and SCPI port)
//! 2. A TOML file (`chroma-scpi.toml` by default)
//! 3. Environment variables prefixed with `CHROMA_`
//!    (e.g. `CHROMA_HOST=10.0.0.5`, `CHROMA_QUERY_DELAY=250ms`)
//!
//! CLI flags are applied on top of the loaded configuration by the binary.
//!
//! Durations accept human-readable strings such as `1s` or `500ms`.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration file consulted when no `--config` flag is given.
pub const DEFAULT_CONFIG_FILE: &str = "chroma-scpi.toml";

/// Connection and query settings for one instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// IP address of the instrument.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port of the instrument's SCPI service.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Read buffer capacity in bytes, used for both the greeting banner and
    /// every query response. Responses longer than this are truncated, not
    /// reassembled.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// SCPI command sent verbatim on every query. No terminator is appended.
    #[serde(default = "default_command")]
    pub command: String,

    /// Number of query/response round-trips to perform.
    #[serde(default = "default_query_count")]
    pub query_count: u32,

    /// Delay between sending a command and reading the response, giving the
    /// instrument time to process.
    #[serde(default = "default_query_delay", with = "humantime_serde")]
    pub query_delay: Duration,

    /// Settling delay after closing the connection.
    #[serde(default = "default_close_delay", with = "humantime_serde")]
    pub close_delay: Duration,

    /// Optional bound on the TCP connect. Unset means connect may block
    /// indefinitely.
    #[serde(default, with = "humantime_serde")]
    pub connect_timeout: Option<Duration>,

    /// Optional bound on each receive. Unset means a silent instrument can
    /// block the client indefinitely.
    #[serde(default, with = "humantime_serde")]
    pub read_timeout: Option<Duration>,
}

fn default_host() -> String {
    "192.168.0.17".to_string()
}

fn default_port() -> u16 {
    5024
}

fn default_buffer_size() -> usize {
    4096
}

fn default_command() -> String {
    "*IDN?".to_string()
}

fn default_query_count() -> u32 {
    10
}

fn default_query_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_close_delay() -> Duration {
    Duration::from_millis(500)
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            buffer_size: default_buffer_size(),
            command: default_command(),
            query_count: default_query_count(),
            query_delay: default_query_delay(),
            close_delay: default_close_delay(),
            connect_timeout: None,
            read_timeout: None,
        }
    }
}

impl InstrumentConfig {
    /// Load configuration from `chroma-scpi.toml` (if present) and
    /// `CHROMA_`-prefixed environment variables.
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific TOML file path, still applying
    /// environment variable overrides.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("CHROMA_"))
            .extract()
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> Result<(), String> {
        if self.host.is_empty() {
            return Err("'host' cannot be empty".to_string());
        }
        if self.port == 0 {
            return Err("'port' cannot be 0".to_string());
        }
        if self.buffer_size == 0 {
            return Err("'buffer_size' must be greater than 0".to_string());
        }
        if self.command.is_empty() {
            return Err("'command' cannot be empty".to_string());
        }
        if self.query_count == 0 {
            return Err("'query_count' must be at least 1".to_string());
        }
        Ok(())
    }

    /// The `host:port` address string used for connecting and in error
    /// messages.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
