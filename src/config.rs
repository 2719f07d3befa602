//! Configuration loading and management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_CONTENT_URL: &str = "http://127.0.0.1:8787/api/content";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Content service endpoint
    pub content_url: String,

    /// Bearer token for the content service
    pub api_key: Option<String>,

    pub request_timeout: Duration,

    /// Keep the daily record in memory only
    pub ephemeral: bool,

    /// Fixed seed for target draws
    pub seed: Option<u64>,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = match lookup("LINGO_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => {
                let home = lookup("HOME").context("HOME is not set")?;
                PathBuf::from(home)
                    .join(".local")
                    .join("share")
                    .join("lingoguessr")
            }
        };

        let socket_path = lookup("LINGO_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("engine.sock"));

        let content_url =
            lookup("LINGO_CONTENT_URL").unwrap_or_else(|| DEFAULT_CONTENT_URL.to_string());

        let api_key = lookup("LINGO_API_KEY").filter(|key| !key.is_empty());

        let request_timeout = match lookup("LINGO_REQUEST_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .parse()
                    .with_context(|| format!("invalid LINGO_REQUEST_TIMEOUT_SECS: {raw}"))?;
                if secs == 0 {
                    bail!("LINGO_REQUEST_TIMEOUT_SECS must be positive");
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        let ephemeral = lookup("LINGO_EPHEMERAL")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let seed = lookup("LINGO_SEED")
            .map(|raw| {
                raw.parse::<u64>()
                    .with_context(|| format!("invalid LINGO_SEED: {raw}"))
            })
            .transpose()?;

        Ok(Self {
            socket_path,
            data_dir,
            content_url,
            api_key,
            request_timeout,
            ephemeral,
            seed,
        })
    }

    /// File holding persisted records such as the last Daily date
    pub fn records_path(&self) -> PathBuf {
        self.data_dir.join("records.json")
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_under_home() {
        let config = load(&[("HOME", "/home/player")]).unwrap();
        assert_eq!(
            config.data_dir,
            PathBuf::from("/home/player/.local/share/lingoguessr")
        );
        assert_eq!(config.socket_path, config.data_dir.join("engine.sock"));
        assert_eq!(config.records_path(), config.data_dir.join("records.json"));
        assert_eq!(config.content_url, DEFAULT_CONTENT_URL);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.api_key.is_none());
        assert!(!config.ephemeral);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("LINGO_DATA_DIR", "/tmp/lingo"),
            ("LINGO_SOCKET", "/run/lingo.sock"),
            ("LINGO_CONTENT_URL", "https://content.example/api"),
            ("LINGO_API_KEY", "secret"),
            ("LINGO_REQUEST_TIMEOUT_SECS", "5"),
            ("LINGO_EPHEMERAL", "true"),
            ("LINGO_SEED", "42"),
        ])
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/lingo"));
        assert_eq!(config.socket_path, PathBuf::from("/run/lingo.sock"));
        assert_eq!(config.content_url, "https://content.example/api");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert!(config.ephemeral);
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn test_missing_home_without_data_dir() {
        assert!(load(&[]).is_err());
    }

    #[test]
    fn test_invalid_timeout() {
        assert!(load(&[("HOME", "/h"), ("LINGO_REQUEST_TIMEOUT_SECS", "soon")]).is_err());
        assert!(load(&[("HOME", "/h"), ("LINGO_REQUEST_TIMEOUT_SECS", "0")]).is_err());
    }

    #[test]
    fn test_ensure_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let config = load(&[("LINGO_DATA_DIR", nested.to_str().unwrap())]).unwrap();
        config.ensure_dirs().unwrap();
        assert!(nested.is_dir());
    }
}
