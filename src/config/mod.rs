use crate::core::error::ChatError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAI,
    Mock,
}

impl ProviderKind {
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAI => Some("https://api.openai.com/v1"),
            ProviderKind::Mock => None,
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAI),
            "mock" => Ok(ProviderKind::Mock),
            other => Err(ChatError::Configuration(format!(
                "Unsupported provider: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            base_url: None,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Per-user application directory holding config, store and history.
    pub fn app_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".lmchat")
    }

    pub fn config_path() -> PathBuf {
        Self::app_dir().join("config.yaml")
    }

    pub fn history_path() -> PathBuf {
        Self::app_dir().join("input_history.txt")
    }

    pub fn load() -> Result<Config, ChatError> {
        Self::load_from(&Self::config_path())
    }

    /// Reads the config at `path`, writing a default file when none exists.
    pub fn load_from(path: &Path) -> Result<Config, ChatError> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            return serde_yml::from_str::<Config>(&contents).map_err(|e| {
                ChatError::Configuration(format!("Parse {}: {}", path.display(), e))
            });
        }

        let config = Config::default();
        if let Err(e) = config.save_to(path) {
            tracing::warn!(path = %path.display(), error = %e, "could not write default config");
        }
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ChatError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let yaml_content = serde_yml::to_string(self)?;
        fs::write(path, yaml_content)?;
        Ok(())
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .or_else(|| self.provider.default_base_url())
    }
}
