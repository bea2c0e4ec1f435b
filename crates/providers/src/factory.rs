use orbit_core::config::ProviderSettings;
use std::time::Duration;

use crate::{AnthropicProvider, OllamaProvider, OpenAIProvider, Provider};

/// Default api_base for known OpenAI-compatible backends.
fn default_api_base(backend: &str) -> &'static str {
    match backend {
        "openrouter" => "https://openrouter.ai/api/v1",
        "openai" => "https://api.openai.com/v1",
        "deepseek" => "https://api.deepseek.com/v1",
        "groq" => "https://api.groq.com/openai/v1",
        _ => "https://api.openai.com/v1",
    }
}

/// Infer the backend from a model-name prefix.
/// Returns None when no prefix matches (the caller must supply a backend).
pub fn infer_backend_from_model(model: &str) -> Option<&'static str> {
    if model.starts_with("anthropic/") || model.starts_with("claude-") {
        Some("anthropic")
    } else if model.starts_with("ollama/") {
        Some("ollama")
    } else if model.starts_with("openai/")
        || model.starts_with("gpt-")
        || model.starts_with("o1")
        || model.starts_with("o3")
    {
        Some("openai")
    } else {
        None
    }
}

/// Pure selection: backend identifier + credentials in, adapter out.
/// No state, no side effects.
///
/// Resolution order:
/// 1. `settings.backend` when set
/// 2. model-prefix inference
///
/// Anthropic and OpenAI-compatible backends require a non-empty API key;
/// Ollama does not.
pub fn create_provider(settings: &ProviderSettings) -> anyhow::Result<Box<dyn Provider>> {
    let backend: &str = if let Some(b) = settings.backend.as_deref() {
        b
    } else if let Some(inferred) = infer_backend_from_model(&settings.model) {
        inferred
    } else {
        return Err(anyhow::anyhow!(
            "No backend configured. Set 'backend' or use a recognized model prefix \
             (e.g. 'claude-...', 'gpt-...', 'ollama/...')."
        ));
    };

    let timeout = Duration::from_secs(settings.request_timeout_secs);

    match backend {
        "anthropic" => {
            if settings.api_key.is_empty() {
                return Err(anyhow::anyhow!("Backend 'anthropic' requires an API key"));
            }
            Ok(Box::new(AnthropicProvider::new(
                &settings.api_key,
                settings.api_base.as_deref(),
                &settings.model,
                settings.max_tokens,
                settings.temperature,
                timeout,
            )) as Box<dyn Provider>)
        }
        "ollama" => Ok(Box::new(OllamaProvider::new(
            settings.api_base.as_deref(),
            &settings.model,
            settings.max_tokens,
            settings.temperature,
            timeout,
        )) as Box<dyn Provider>),
        // OpenAI and compatible relays: openrouter, deepseek, groq, ...
        other => {
            if settings.api_key.is_empty() {
                return Err(anyhow::anyhow!("Backend '{}' requires an API key", other));
            }
            let api_base = settings
                .api_base
                .clone()
                .unwrap_or_else(|| default_api_base(other).to_string());
            Ok(Box::new(OpenAIProvider::new(
                &settings.api_key,
                Some(&api_base),
                &settings.model,
                settings.max_tokens,
                settings.temperature,
                timeout,
            )) as Box<dyn Provider>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(backend: Option<&str>, api_key: &str, model: &str) -> ProviderSettings {
        ProviderSettings {
            backend: backend.map(String::from),
            api_key: api_key.to_string(),
            model: model.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_infer_backend_from_model() {
        assert_eq!(infer_backend_from_model("anthropic/claude-sonnet-4"), Some("anthropic"));
        assert_eq!(infer_backend_from_model("claude-3-5-haiku"), Some("anthropic"));
        assert_eq!(infer_backend_from_model("ollama/llama3"), Some("ollama"));
        assert_eq!(infer_backend_from_model("gpt-4o"), Some("openai"));
        assert_eq!(infer_backend_from_model("some-unknown-model"), None);
    }

    #[test]
    fn test_explicit_backend_wins_over_prefix() {
        // Model has an anthropic prefix but backend says openai
        let result = create_provider(&settings(Some("openai"), "sk-test", "claude-3-5-haiku"));
        assert!(result.is_ok());
    }

    #[test]
    fn test_model_prefix_selects_backend() {
        let result = create_provider(&settings(None, "sk-ant-test", "claude-3-5-haiku"));
        assert!(result.is_ok());
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let result = create_provider(&settings(Some("ollama"), "", "llama3"));
        assert!(result.is_ok());
    }

    #[test]
    fn test_missing_key_fails() {
        let result = create_provider(&settings(Some("anthropic"), "", "claude-3-5-haiku"));
        assert!(result.is_err());
        let result = create_provider(&settings(Some("openrouter"), "", "some-model"));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_model_without_backend_fails() {
        let result = create_provider(&settings(None, "sk-test", "mystery-model"));
        assert!(result.is_err());
    }
}
