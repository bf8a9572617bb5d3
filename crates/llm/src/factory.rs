//! LLM provider factory.
//!
//! Maps a provider name plus resolved endpoint and secret to a concrete
//! client. Callers resolve the endpoint and key from `AppConfig` first.

use crate::client::LlmClient;
use crate::providers::{ollama::DEFAULT_OLLAMA_URL, openai::DEFAULT_OPENAI_URL};
use crate::providers::{OllamaClient, OpenAiClient, ScriptedClient};
use crate::types::ProviderType;
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("openai", "ollama", "scripted")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - Optional API key (required for OpenAI)
///
/// # Errors
/// Returns an error message if the provider is unknown or a required
/// secret is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> Result<Arc<dyn LlmClient>, String> {
    let provider_type =
        ProviderType::parse(provider).ok_or_else(|| format!("Unknown provider: {}", provider))?;

    match provider_type {
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or(DEFAULT_OLLAMA_URL);
            Ok(Arc::new(OllamaClient::with_base_url(base_url)))
        }
        ProviderType::OpenAI => {
            let key = api_key
                .filter(|k| !k.is_empty())
                .ok_or_else(|| "OpenAI provider requires API key".to_string())?;
            let base_url = endpoint.unwrap_or(DEFAULT_OPENAI_URL);
            Ok(Arc::new(OpenAiClient::with_base_url(base_url, key)))
        }
        // An empty script fails every call; useful only for dry runs.
        ProviderType::Scripted => Ok(Arc::new(ScriptedClient::default())),
    }
}
