//! Server configuration read from the environment

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8724";
pub const DEFAULT_STORAGE_DIR: &str = "./pagesmith-storage";
pub const DEFAULT_UPSTREAM_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MAX_TOKENS: u32 = 16000;
pub const DEFAULT_MODELS: &[&str] = &[
    "anthropic/claude-sonnet-4",
    "openai/gpt-4.1",
    "google/gemini-2.5-pro",
    "deepseek/deepseek-r1",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {message}")]
    Invalid { name: &'static str, message: String },
}

impl ConfigError {
    fn invalid(name: &'static str, message: impl ToString) -> Self {
        ConfigError::Invalid {
            name,
            message: message.to_string(),
        }
    }
}

/// Which [`ProjectStore`](crate::store::ProjectStore) backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite,
    Local,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub storage_dir: PathBuf,
    pub store: StoreKind,
    pub upstream_url: Url,
    /// Generation is refused while no key is configured
    pub api_key: Option<String>,
    pub models: Vec<String>,
    pub default_model: Option<String>,
    pub max_tokens: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.parse().expect("default bind address"),
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            store: StoreKind::Sqlite,
            upstream_url: Url::parse(DEFAULT_UPSTREAM_URL).expect("default upstream url"),
            api_key: None,
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            default_model: None,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars().filter(|(k, _)| k.starts_with("PAGESMITH_")))
    }

    /// Build a config from `(name, value)` pairs; unset names keep defaults
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();
        let get = |name: &str| vars.get(name).map(|v| v.trim());

        let mut config = Self::default();

        if let Some(addr) = get("PAGESMITH_BIND_ADDR") {
            config.bind_addr = addr
                .parse()
                .map_err(|e| ConfigError::invalid("PAGESMITH_BIND_ADDR", e))?;
        }

        if let Some(dir) = get("PAGESMITH_STORAGE_DIR") {
            config.storage_dir = PathBuf::from(dir);
        }

        if let Some(store) = get("PAGESMITH_STORE") {
            config.store = match store.to_ascii_lowercase().as_str() {
                "sqlite" => StoreKind::Sqlite,
                "local" => StoreKind::Local,
                other => {
                    return Err(ConfigError::invalid(
                        "PAGESMITH_STORE",
                        format!("expected sqlite or local, got {}", other),
                    ));
                }
            };
        }

        if let Some(raw) = get("PAGESMITH_UPSTREAM_URL") {
            let url = Url::parse(raw).map_err(|e| ConfigError::invalid("PAGESMITH_UPSTREAM_URL", e))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::invalid(
                    "PAGESMITH_UPSTREAM_URL",
                    format!("unsupported scheme {}", url.scheme()),
                ));
            }
            config.upstream_url = url;
        }

        config.api_key = get("PAGESMITH_API_KEY").map(str::to_string);

        if let Some(models) = get("PAGESMITH_MODELS") {
            let models: Vec<String> = models
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect();
            if models.is_empty() {
                return Err(ConfigError::invalid("PAGESMITH_MODELS", "no model ids given"));
            }
            config.models = models;
        }

        config.default_model = get("PAGESMITH_DEFAULT_MODEL").map(str::to_string);

        if let Some(raw) = get("PAGESMITH_MAX_TOKENS") {
            config.max_tokens = match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                Ok(_) => return Err(ConfigError::invalid("PAGESMITH_MAX_TOKENS", "must be positive")),
                Err(e) => return Err(ConfigError::invalid("PAGESMITH_MAX_TOKENS", e)),
            };
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_vars(Vec::new()).unwrap();
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.store, StoreKind::Sqlite);
        assert_eq!(config.upstream_url.as_str(), DEFAULT_UPSTREAM_URL);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert!(config.api_key.is_none());
        assert_eq!(config.models.len(), DEFAULT_MODELS.len());
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_vars(vars(&[
            ("PAGESMITH_BIND_ADDR", "0.0.0.0:9000"),
            ("PAGESMITH_STORE", "Local"),
            ("PAGESMITH_API_KEY", " sk-test "),
            ("PAGESMITH_MODELS", "a/one, b/two,,"),
            ("PAGESMITH_DEFAULT_MODEL", "b/two"),
            ("PAGESMITH_MAX_TOKENS", "4096"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.store, StoreKind::Local);
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.models, vec!["a/one", "b/two"]);
        assert_eq!(config.default_model.as_deref(), Some("b/two"));
        assert_eq!(config.max_tokens, 4096);
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = ServerConfig::from_vars(vars(&[("PAGESMITH_API_KEY", "  ")])).unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_rejects_bad_values() {
        for (name, value) in [
            ("PAGESMITH_BIND_ADDR", "localhost"),
            ("PAGESMITH_STORE", "s3"),
            ("PAGESMITH_UPSTREAM_URL", "not a url"),
            ("PAGESMITH_UPSTREAM_URL", "ftp://example.com/chat"),
            ("PAGESMITH_MODELS", ","),
            ("PAGESMITH_MAX_TOKENS", "0"),
            ("PAGESMITH_MAX_TOKENS", "lots"),
        ] {
            let result = ServerConfig::from_vars(vars(&[(name, value)]));
            assert!(
                matches!(result, Err(ConfigError::Invalid { name: n, .. }) if n == name),
                "{}={} should be rejected",
                name,
                value
            );
        }
    }
}
