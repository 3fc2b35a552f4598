use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result, anyhow};

use crate::gateway::gemini::DEFAULT_BASE_URL;
use crate::model::ModelOption;
use crate::tips::DEFAULT_TIP_INTERVAL;

/// Environment variables checked for the Gemini key, in order.
pub const API_KEY_VARS: [&str; 2] = ["GOOGLE_GENERATIVE_AI_API_KEY", "GEMINI_API_KEY"];

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are BIT BOT, a friendly assistant for students and staff of \
Bannari Amman Institute of Technology (BIT), Sathyamangalam. Answer questions about the college, \
its programs, campus life and its websites. Use markdown for lists and emphasis.";

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub default_model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub tip_interval_secs: Option<u64>,
    pub system_prompt: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Missing files load as defaults; malformed ones are an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("bitbot").join("config.json"))
    }

    /// Unknown model ids fall back to the default model.
    pub fn model(&self) -> ModelOption {
        self.default_model
            .as_deref()
            .and_then(ModelOption::from_id)
            .unwrap_or_default()
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn tip_interval(&self) -> Duration {
        match self.tip_interval_secs {
            Some(secs) if secs > 0 => Duration::from_secs(secs),
            _ => DEFAULT_TIP_INTERVAL,
        }
    }

    pub fn system_prompt(&self) -> String {
        self.system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string())
    }

    /// Environment variables take priority over the config file.
    pub fn api_key(&self) -> Option<String> {
        self.api_key_with(|name| std::env::var(name).ok())
    }

    fn api_key_with(&self, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        let present = |key: &String| !key.trim().is_empty();
        API_KEY_VARS
            .iter()
            .find_map(|name| env(name).filter(present))
            .or_else(|| self.api_key.clone().filter(present))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.model(), ModelOption::Gemini15Flash);
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.tip_interval(), Duration::from_secs(5));
        assert_eq!(config.system_prompt(), DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn test_reads_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"default_model":"gemini-1.0-pro","api_key":"file-key","base_url":"http://localhost:9000","tip_interval_secs":2}}"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.model(), ModelOption::Gemini10Pro);
        assert_eq!(config.base_url(), "http://localhost:9000");
        assert_eq!(config.tip_interval(), Duration::from_secs(2));
        assert_eq!(config.api_key_with(|_| None), Some("file-key".to_string()));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(Config::load_from(file.path()).is_err());
    }

    #[test]
    fn test_env_key_overrides_file() {
        let config = Config {
            api_key: Some("file-key".to_string()),
            ..Config::default()
        };
        let key = config.api_key_with(|name| {
            (name == "GEMINI_API_KEY").then(|| "env-key".to_string())
        });
        assert_eq!(key, Some("env-key".to_string()));
    }

    #[test]
    fn test_empty_env_key_falls_through() {
        let config = Config {
            api_key: Some("file-key".to_string()),
            ..Config::default()
        };
        let key = config.api_key_with(|name| match name {
            "GOOGLE_GENERATIVE_AI_API_KEY" => Some(String::new()),
            _ => None,
        });
        assert_eq!(key, Some("file-key".to_string()));

        let key = config.api_key_with(|name| match name {
            "GOOGLE_GENERATIVE_AI_API_KEY" => Some(" ".to_string()),
            _ => Some("gemini-key".to_string()),
        });
        assert_eq!(key, Some("gemini-key".to_string()));
    }

    #[test]
    fn test_blank_key_is_none() {
        let config = Config {
            api_key: Some("  ".to_string()),
            ..Config::default()
        };
        assert_eq!(config.api_key_with(|_| None), None);
    }

    #[test]
    fn test_unknown_model_and_zero_interval_fall_back() {
        let config = Config {
            default_model: Some("gpt-4o".to_string()),
            tip_interval_secs: Some(0),
            ..Config::default()
        };
        assert_eq!(config.model(), ModelOption::Gemini15Flash);
        assert_eq!(config.tip_interval(), DEFAULT_TIP_INTERVAL);
    }
}
