//! NetReason configuration.
//!
//! Config file: ~/.config/netreason/config.toml or /etc/netreason/config.toml.
//! Every field has a default, so a missing or partial file is fine.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_MODEL: &str = "gemma2:9b";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a research assistant that gives accurate, concise and factual answers. \
When asked a question:\n\
1. Decide first whether you can answer reliably from what you already know\n\
2. Search the web when current or verifiable information is needed\n\
3. Give concrete numbers and data when available\n\
4. Break complex topics into clear categories\n\
5. Name your sources when you rely on external information\n\
Stay focused and precise, and verify claims where possible.";

/// Generation service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model identifier passed to the generation service
    pub name: String,
    /// Base URL of the Ollama-compatible API (without `/api`)
    pub base_url: String,
    /// Nucleus sampling; temperatures are fixed per pipeline stage
    pub top_p: f64,
    /// Hard timeout for one generation call
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            top_p: 0.9,
            timeout_secs: 180,
        }
    }
}

/// Conversation memory settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Character budget of the context window. Each exchange is stored with
    /// its rendered reasoning chain, so the budget has to hold several
    /// analyses and critiques, not just the answers.
    pub max_chars: usize,
    pub system_prompt: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_chars: 16384,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// How pages are classified before fetching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    /// Probe GET, static if success and the body has an `<html` marker
    Probe,
    /// HEAD request, static if the content type is HTML
    ContentType,
}

impl Default for ClassifierKind {
    fn default() -> Self {
        Self::Probe
    }
}

/// Retrieval settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Results requested from the search provider
    pub max_results: usize,
    /// Results actually fetched and parsed
    pub max_urls: usize,
    /// Retrieval iterations on the search branch
    pub max_iterations: usize,
    pub classifier: ClassifierKind,
    pub probe_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub search_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 9,
            max_urls: 3,
            max_iterations: 1,
            classifier: ClassifierKind::Probe,
            probe_timeout_secs: 5,
            fetch_timeout_secs: 10,
            search_timeout_secs: 15,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Main NetReason configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetReasonConfig {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

impl NetReasonConfig {
    /// User config path: $XDG_CONFIG_HOME/netreason/config.toml
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("netreason").join("config.toml"))
    }

    /// System config path: /etc/netreason/config.toml
    pub fn system_config_path() -> PathBuf {
        PathBuf::from("/etc/netreason/config.toml")
    }

    /// Load configuration
    ///
    /// Priority:
    /// 1. Explicit path (must exist)
    /// 2. User config
    /// 3. System config
    /// 4. Defaults
    ///
    /// Environment overrides (`NETREASON_MODEL`, `NETREASON_OLLAMA_URL`) are
    /// applied on top, then the result is validated.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => Self::load_default_locations()?,
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn load_default_locations() -> Result<Self, ConfigError> {
        if let Some(user_path) = Self::user_config_path() {
            if user_path.exists() {
                return Self::from_file(&user_path);
            }
        }

        let system_path = Self::system_config_path();
        if system_path.exists() {
            return Self::from_file(&system_path);
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(model) = std::env::var("NETREASON_MODEL") {
            if !model.trim().is_empty() {
                self.model.name = model.trim().to_string();
            }
        }
        if let Ok(url) = std::env::var("NETREASON_OLLAMA_URL") {
            if !url.trim().is_empty() {
                self.model.base_url = url.trim().to_string();
            }
        }
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.model.top_p > 0.0 && self.model.top_p <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "model.top_p must be within (0, 1], got {}",
                self.model.top_p
            )));
        }
        if self.model.name.trim().is_empty() {
            return Err(ConfigError::Invalid("model.name is empty".to_string()));
        }
        if self.context.max_chars == 0 {
            return Err(ConfigError::Invalid("context.max_chars must be > 0".to_string()));
        }
        if self.search.max_urls == 0 {
            return Err(ConfigError::Invalid("search.max_urls must be > 0".to_string()));
        }
        if self.search.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "search.max_iterations must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
