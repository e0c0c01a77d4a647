//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use recap_agent::config::{DEFAULT_CAPABLE_MODEL, DEFAULT_CHEAP_MODEL, DEFAULT_THRESHOLD};
use recap_ai::providers::ollama::DEFAULT_BASE_URL;

/// Configuration for recap
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend base URL
    pub base_url: Option<String>,
    /// Bearer token for the backend (alternative to RECAP_API_KEY)
    pub api_key: Option<String>,
    /// Model used for summarization
    pub cheap_model: Option<String>,
    /// Model used for answers
    pub capable_model: Option<String>,
    /// Turns between compressions
    pub threshold: Option<u32>,
    /// Per-request deadline in seconds
    pub timeout_secs: Option<u64>,
    /// Retries for transient backend failures
    pub max_retries: Option<u32>,
    /// Cap on generated tokens per model call
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("recap")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("RECAP_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match Self::parse(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Parse config from TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            base_url: Some(DEFAULT_BASE_URL.to_string()),
            api_key: None,
            cheap_model: Some(DEFAULT_CHEAP_MODEL.to_string()),
            capable_model: Some(DEFAULT_CAPABLE_MODEL.to_string()),
            threshold: Some(DEFAULT_THRESHOLD),
            timeout_secs: Some(300),
            max_retries: Some(2),
            max_tokens: None,
            temperature: None,
        };

        default_config.save()?;
        Ok(path)
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# recap configuration file
# Place at ~/.config/recap/config.toml (Linux/Mac) or %APPDATA%\recap\config.toml (Windows)

# Ollama or any OpenAI-compatible server
base_url = "http://localhost:11434"

# Model used to compress the history
cheap_model = "qwen3-4b:latest"

# Model used to answer
capable_model = "qwen2.5-coder-7b:latest"

# Compress every N answered turns
threshold = 5

# Deadline for a single model call, in seconds
timeout_secs = 300

# Retries for transient backend failures (0 disables)
max_retries = 2

# Generation limits (optional; the server's defaults apply when unset)
# max_tokens = 1024
# temperature = 0.7

# Bearer token, only needed behind an authenticating proxy
# It's recommended to use the RECAP_API_KEY environment variable instead
# api_key = "..."
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses() {
        let config = Config::parse(example_config()).unwrap();
        assert_eq!(config.base_url.as_deref(), Some(DEFAULT_BASE_URL));
        assert_eq!(config.cheap_model.as_deref(), Some(DEFAULT_CHEAP_MODEL));
        assert_eq!(config.capable_model.as_deref(), Some(DEFAULT_CAPABLE_MODEL));
        assert_eq!(config.threshold, Some(DEFAULT_THRESHOLD));
        assert_eq!(config.timeout_secs, Some(300));
        assert_eq!(config.max_retries, Some(2));
        assert!(config.api_key.is_none());
        assert!(config.max_tokens.is_none());
        assert!(config.temperature.is_none());
    }

    #[test]
    fn test_generation_limits_parse() {
        let config = Config::parse("max_tokens = 1024\ntemperature = 0.5\n").unwrap();
        assert_eq!(config.max_tokens, Some(1024));
        assert_eq!(config.temperature, Some(0.5));
    }

    #[test]
    fn test_missing_fields_are_none() {
        let config = Config::parse("threshold = 3\n").unwrap();
        assert_eq!(config.threshold, Some(3));
        assert!(config.base_url.is_none());
        assert!(config.cheap_model.is_none());
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_bad_type_is_error() {
        assert!(Config::parse("threshold = \"five\"\n").is_err());
    }

    #[test]
    fn test_serialized_round_trip() {
        let config = Config {
            base_url: Some("http://gpu-box:11434".into()),
            threshold: Some(8),
            ..Default::default()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(Config::parse(&text).unwrap(), config);
    }
}
