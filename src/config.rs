use std::path::PathBuf;

use eyre::{Result, WrapErr};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub bind: Option<String>,
    pub model: Option<String>,
    pub lang: Option<String>,
    pub strategy_timeout_secs: Option<u64>,
    pub youtube_base_url: Option<String>,
}

impl Config {
    /// Load config from ~/.config/ytstudy/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config =
                toml::from_str(&content).wrap_err_with(|| format!("invalid config file {}", path.display()))?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytstudy")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
bind = "127.0.0.1:8080"
model = "claude-sonnet-4-6"
lang = "es"
strategy_timeout_secs = 5
youtube_base_url = "http://localhost:9999"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.bind.as_deref(), Some("127.0.0.1:8080"));
        assert_eq!(config.model.as_deref(), Some("claude-sonnet-4-6"));
        assert_eq!(config.lang.as_deref(), Some("es"));
        assert_eq!(config.strategy_timeout_secs, Some(5));
        assert_eq!(config.youtube_base_url.as_deref(), Some("http://localhost:9999"));
    }

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.bind.is_none());
        assert!(config.strategy_timeout_secs.is_none());
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = toml::from_str(r#"lang = "fr""#).unwrap();
        assert_eq!(config.lang.as_deref(), Some("fr"));
        assert!(config.model.is_none());
    }
}
