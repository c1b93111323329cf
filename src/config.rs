//! Server configuration: defaults, optional TOML file, environment overrides.
//!
//! Precedence, lowest to highest: built-in defaults, the TOML file named by
//! `EINVOICE_CONFIG` (or passed explicitly), then individual `EINVOICE_*`
//! variables. `EINVOICE_PAGE_SIZE` sets the invoice page size and
//! `EINVOICE_MARKET_PAGE_SIZE` the market one.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::dataset::Dataset;
use crate::error::ConfigError;

pub const CONFIG_ENV: &str = "EINVOICE_CONFIG";
const DEFAULT_MARKETS_URL: &str = concat!(
    "https://api.coingecko.com/api/v3/coins/markets",
    "?vs_currency=usd&order=market_cap_desc&per_page=100&page=1&sparkline=false"
);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Address the web server listens on.
    pub bind_addr: String,
    /// Base URL of the invoice API (login, invoice list, PDFs).
    pub api_base_url: String,
    pub markets_url: String,
    pub invoice_page_size: NonZeroUsize,
    pub market_page_size: NonZeroUsize,
    pub request_timeout_secs: u64,
    /// Signed-in sessions expire after this many seconds.
    pub session_ttl_secs: u64,
    /// When set, every export is also archived here.
    pub export_dir: Option<PathBuf>,
    /// Front-end assets served under `/static`.
    pub static_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "127.0.0.1:3000".to_string(),
            api_base_url: "http://127.0.0.1:8080".to_string(),
            markets_url: DEFAULT_MARKETS_URL.to_string(),
            invoice_page_size: NonZeroUsize::new(10).unwrap_or(NonZeroUsize::MIN),
            market_page_size: NonZeroUsize::new(100).unwrap_or(NonZeroUsize::MIN),
            request_timeout_secs: 30,
            session_ttl_secs: 24 * 60 * 60,
            export_dir: None,
            static_dir: PathBuf::from("static"),
        }
    }
}

impl Config {
    pub fn page_size(&self, dataset: Dataset) -> NonZeroUsize {
        match dataset {
            Dataset::Invoices => self.invoice_page_size,
            Dataset::Crypto => self.market_page_size,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Resolve configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::resolve(&env)
    }

    /// Resolve configuration from an explicit variable map.
    pub fn resolve(env: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = match env.get(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(path))?,
            None => Config::default(),
        };

        if let Some(v) = env.get("EINVOICE_BIND") {
            config.bind_addr = v.clone();
        }
        if let Some(v) = env.get("EINVOICE_API_BASE") {
            config.api_base_url = v.clone();
        }
        if let Some(v) = env.get("EINVOICE_MARKETS_URL") {
            config.markets_url = v.clone();
        }
        if let Some(v) = env.get("EINVOICE_EXPORT_DIR") {
            config.export_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = parsed(env, "EINVOICE_PAGE_SIZE")? {
            config.invoice_page_size = v;
        }
        if let Some(v) = parsed(env, "EINVOICE_MARKET_PAGE_SIZE")? {
            config.market_page_size = v;
        }
        if let Some(v) = parsed(env, "EINVOICE_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout_secs = v;
        }
        if let Some(v) = parsed(env, "EINVOICE_SESSION_TTL_SECS")? {
            config.session_ttl_secs = v;
        }

        Ok(config)
    }
}

fn parsed<T>(env: &HashMap<String, String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    env.get(key)
        .map(|v| {
            v.trim().parse().map_err(|e: T::Err| ConfigError::Env {
                key: key.to_string(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_without_environment() {
        let config = Config::resolve(&HashMap::new()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.page_size(Dataset::Invoices).get(), 10);
        assert_eq!(config.page_size(Dataset::Crypto).get(), 100);
    }

    #[test]
    fn file_then_env_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
api_base_url = "http://erp.local"
invoice_page_size = 25
bind_addr = "0.0.0.0:9000"
"#
        )
        .unwrap();

        let config = Config::resolve(&env(&[
            (CONFIG_ENV, file.path().to_str().unwrap()),
            ("EINVOICE_BIND", "127.0.0.1:4000"),
        ]))
        .unwrap();

        assert_eq!(config.api_base_url, "http://erp.local");
        assert_eq!(config.invoice_page_size.get(), 25);
        assert_eq!(config.bind_addr, "127.0.0.1:4000");
        assert_eq!(config.market_page_size.get(), 100);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "theme = \"dark\"").unwrap();
        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let err = Config::resolve(&env(&[("EINVOICE_PAGE_SIZE", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { .. }));
    }

    #[test]
    fn numeric_overrides_cover_markets_timeout_and_ttl() {
        let config = Config::resolve(&env(&[
            ("EINVOICE_MARKET_PAGE_SIZE", "50"),
            ("EINVOICE_REQUEST_TIMEOUT_SECS", "5"),
            ("EINVOICE_SESSION_TTL_SECS", "3600"),
        ]))
        .unwrap();
        assert_eq!(config.page_size(Dataset::Crypto).get(), 50);
        assert_eq!(config.page_size(Dataset::Invoices).get(), 10);
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.session_ttl_secs, 3600);

        let err = Config::resolve(&env(&[("EINVOICE_SESSION_TTL_SECS", "a day")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { key, .. } if key == "EINVOICE_SESSION_TTL_SECS"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = Config::resolve(&env(&[(CONFIG_ENV, "/nonexistent/einvoice.toml")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
