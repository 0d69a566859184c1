//! TOML configuration and default file locations

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::ledger::FailurePolicy;
use crate::infrastructure::ethereum::DEFAULT_ZKSYNC_RPC;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// zkSync JSON-RPC endpoint used for status lookups
    pub rpc_url: String,

    /// Ledger database path; defaults to `<data_dir>/ledger.sqlite3`
    pub database: Option<PathBuf>,

    pub request_timeout_secs: u64,

    pub max_concurrent_lookups: usize,

    pub sync_interval_secs: u64,

    /// Settle records as `failed` when the node reports `failed`
    pub settle_remote_failures: bool,

    /// Extra ABI files or directories merged into the selector registry
    pub abi_paths: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_ZKSYNC_RPC.to_string(),
            database: None,
            request_timeout_secs: 10,
            max_concurrent_lookups: 4,
            sync_interval_secs: 30,
            settle_remote_failures: false,
            abi_paths: Vec::new(),
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.max(1))
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::from_settle_flag(self.settle_remote_failures)
    }

    pub fn database_path(&self) -> Option<PathBuf> {
        self.database
            .clone()
            .or_else(|| data_dir().map(|dir| dir.join("ledger.sqlite3")))
    }

    /// `abi_paths` with a leading `~` expanded
    pub fn abi_roots(&self) -> Vec<PathBuf> {
        self.abi_paths
            .iter()
            .map(|path| expand_home(path.trim()))
            .collect()
    }
}

/// Load the config from `explicit` or the default location.
///
/// Only the default location may be absent (yielding defaults). An explicit
/// path that does not exist, or any file that cannot be read or parsed, is an
/// error.
pub fn load(explicit: Option<PathBuf>) -> Result<Config> {
    if let Some(path) = explicit {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("read config {}", path.display()))?;
        return parse(&content).with_context(|| format!("parse config {}", path.display()));
    }

    let Some(path) = config_path() else {
        return Ok(Config::default());
    };
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(err) => return Err(err).with_context(|| format!("read config {}", path.display())),
    };
    parse(&content).with_context(|| format!("parse config {}", path.display()))
}

pub fn parse(content: &str) -> Result<Config> {
    Ok(toml::from_str::<Config>(content)?)
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("RAMPWATCH_CONFIG").map(PathBuf::from) {
        return Some(path);
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        return Some(xdg.join("rampwatch").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".config").join("rampwatch").join("config.toml"));
    }

    directories::ProjectDirs::from("io", "rampwatch", "rampwatch")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

pub fn data_dir() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_DATA_HOME").map(PathBuf::from) {
        return Some(xdg.join("rampwatch"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".local").join("share").join("rampwatch"));
    }
    directories::ProjectDirs::from("io", "rampwatch", "rampwatch")
        .map(|dirs| dirs.data_dir().to_path_buf())
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.rpc_url, "https://sepolia.era.zksync.dev");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.max_concurrent_lookups, 4);
        assert_eq!(config.sync_interval(), Duration::from_secs(30));
        assert_eq!(config.failure_policy(), FailurePolicy::LeaveUnresolved);
        assert!(config.abi_paths.is_empty());
    }

    #[test]
    fn test_parse_overrides() {
        let config = parse(
            r#"
            rpc_url = "http://localhost:3050"
            database = "/tmp/ramp.sqlite3"
            request_timeout_secs = 3
            settle_remote_failures = true
            abi_paths = ["./contracts/out"]
            "#,
        )
        .unwrap();
        assert_eq!(config.rpc_url, "http://localhost:3050");
        assert_eq!(config.database_path(), Some(PathBuf::from("/tmp/ramp.sqlite3")));
        assert_eq!(config.request_timeout(), Duration::from_secs(3));
        assert_eq!(config.failure_policy(), FailurePolicy::MarkFailed);
        assert_eq!(config.abi_roots(), vec![PathBuf::from("./contracts/out")]);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        assert!(parse("request_timeout_secs = \"ten\"").is_err());
        assert!(parse("rpc = \"typo\"").is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("rampwatch_missing_{}.toml", std::process::id()));
        let err = load(Some(path.clone())).unwrap_err();
        assert!(err.to_string().contains(&path.display().to_string()));
    }

    #[test]
    fn test_explicit_file_is_read() {
        let path = std::env::temp_dir().join(format!("rampwatch_explicit_{}.toml", std::process::id()));
        fs::write(&path, "max_concurrent_lookups = 9\n").unwrap();
        let config = load(Some(path.clone()));
        let _ = fs::remove_file(&path);
        assert_eq!(config.unwrap().max_concurrent_lookups, 9);
    }
}
