/// Service configuration.
///
/// Settings come from the process environment (a local `.env` file is
/// honored through the `dotenv` crate) or from a TOML file, with sensible
/// defaults for local development. The resulting `Config` is passed
/// explicitly into components at construction time - there is no global
/// connection state anywhere in the crate.

use serde::Deserialize;
use std::path::Path;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    // PostgreSQL connection
    pub pghost: String,
    pub pgport: u16,
    pub pgdatabase: String,
    pub pguser: String,
    pub pgpassword: String,

    /// WAQI API token. Empty string disables live ingestion.
    pub waqi_token: String,

    /// TTL for cached overview/heatmap responses.
    pub cache_ttl_secs: u64,

    /// Degrees of padding added on each side of the heatmap bounding box.
    pub heatmap_padding_deg: f64,

    /// Per-request deadline for upstream fetches.
    pub fetch_timeout_secs: u64,

    /// Bounded retry policy for the ingestion boundary.
    pub retry_max_attempts: u32,
    pub retry_base_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            pghost: "localhost".to_string(),
            pgport: 5432,
            pgdatabase: "airdb".to_string(),
            pguser: "air".to_string(),
            pgpassword: "airpass".to_string(),
            waqi_token: String::new(),
            cache_ttl_secs: 30,
            heatmap_padding_deg: 0.5,
            fetch_timeout_secs: 20,
            retry_max_attempts: 3,
            retry_base_backoff_ms: 500,
        }
    }
}

impl Config {
    /// Load settings from the environment, reading `.env` first if present.
    ///
    /// Unset or unparseable variables fall back to their defaults; partial
    /// configuration is the normal case in development.
    pub fn from_env() -> Config {
        dotenv::dotenv().ok();

        let mut cfg = Config::default();
        if let Ok(v) = std::env::var("PGHOST") {
            cfg.pghost = v;
        }
        if let Ok(v) = std::env::var("PGPORT") {
            if let Ok(port) = v.parse() {
                cfg.pgport = port;
            }
        }
        if let Ok(v) = std::env::var("PGDATABASE") {
            cfg.pgdatabase = v;
        }
        if let Ok(v) = std::env::var("PGUSER") {
            cfg.pguser = v;
        }
        if let Ok(v) = std::env::var("PGPASSWORD") {
            cfg.pgpassword = v;
        }
        if let Ok(v) = std::env::var("WAQI_TOKEN") {
            cfg.waqi_token = v;
        }
        if let Ok(v) = std::env::var("CACHE_TTL_SECS") {
            if let Ok(ttl) = v.parse() {
                cfg.cache_ttl_secs = ttl;
            }
        }
        if let Ok(v) = std::env::var("HEATMAP_PADDING_DEG") {
            if let Ok(pad) = v.parse() {
                cfg.heatmap_padding_deg = pad;
            }
        }
        if let Ok(v) = std::env::var("FETCH_TIMEOUT_SECS") {
            if let Ok(secs) = v.parse() {
                cfg.fetch_timeout_secs = secs;
            }
        }
        cfg
    }

    /// Load settings from a TOML file. Missing keys take their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Config, String> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config file {}: {}", path.display(), e))?;
        toml::from_str(&raw)
            .map_err(|e| format!("failed to parse config file {}: {}", path.display(), e))
    }

    /// Connection string in the form the `postgres` crate accepts.
    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} dbname={} user={} password={}",
            self.pghost, self.pgport, self.pgdatabase, self.pguser, self.pgpassword
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
