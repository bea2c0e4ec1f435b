use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::paths::Paths;

/// Backend selection and credentials, supplied opaquely by the surrounding
/// application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettings {
    /// Explicit backend identifier ("anthropic", "openai", "ollama", or any
    /// OpenAI-compatible name). When absent, inferred from the model prefix.
    #[serde(default)]
    pub backend: Option<String>,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

fn default_request_timeout_secs() -> u64 {
    // 30s long-poll read window plus a 10s buffer
    40
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            backend: None,
            api_key: String::new(),
            api_base: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorDefaults {
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: u32,
    #[serde(default = "default_confirmation_ttl_secs")]
    pub confirmation_ttl_secs: u64,
    #[serde(default = "default_recent_captures")]
    pub recent_captures: usize,
}

fn default_max_tool_iterations() -> u32 {
    5
}

fn default_confirmation_ttl_secs() -> u64 {
    300
}

fn default_recent_captures() -> usize {
    5
}

impl Default for OrchestratorDefaults {
    fn default() -> Self {
        Self {
            max_tool_iterations: default_max_tool_iterations(),
            confirmation_ttl_secs: default_confirmation_ttl_secs(),
            recent_captures: default_recent_captures(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub orchestrator: OrchestratorDefaults,
}

impl Config {
    /// Load from the standard config file, falling back to defaults when the
    /// file does not exist.
    pub fn load(paths: &Paths) -> Result<Self> {
        Self::load_from(paths.config_file())
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    pub fn save(&self, paths: &Paths) -> Result<()> {
        let path = paths.config_file();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.orchestrator.max_tool_iterations, 5);
        assert_eq!(config.orchestrator.confirmation_ttl_secs, 300);
        assert_eq!(config.provider.request_timeout_secs, 40);
        assert!(config.provider.backend.is_none());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{"provider": {"backend": "ollama", "model": "llama3"}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.provider.backend.as_deref(), Some("ollama"));
        assert_eq!(config.provider.model, "llama3");
        assert_eq!(config.provider.max_tokens, 4096);
        assert_eq!(config.orchestrator.max_tool_iterations, 5);
    }

    #[test]
    fn test_camel_case_keys() {
        let json = r#"{"provider": {"apiKey": "sk-test", "maxTokens": 1024}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.provider.api_key, "sk-test");
        assert_eq!(config.provider.max_tokens, 1024);
    }
}
