//! Chat completions through any `edgequake-llm` provider.
//!
//! Lets the completion calls run against OpenAI, Anthropic, Gemini, Ollama
//! and the other providers `edgequake-llm` knows, instead of a fixed Azure
//! deployment URL. Image generation and storage are unaffected.

use super::{ChatBackend, ChatRequest};
use crate::config::StoryConfig;
use crate::error::StoryError;
use async_trait::async_trait;
use edgequake_llm::{
    ChatMessage, CompletionOptions, ImageData, LLMProvider, LlmError, ProviderFactory,
};
use std::sync::Arc;
use tracing::debug;

/// Model used when a provider is named without one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// [`ChatBackend`] over an `edgequake-llm` provider.
pub struct ProviderChat {
    name: String,
    provider: Arc<dyn LLMProvider>,
}

impl ProviderChat {
    pub fn new(name: impl Into<String>, provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            name: name.into(),
            provider,
        }
    }
}

fn build_messages(request: &ChatRequest) -> Vec<ChatMessage> {
    let images: Vec<ImageData> = request
        .image
        .iter()
        .map(|img| ImageData::new(img.base64.clone(), img.mime_type.as_str()))
        .collect();
    vec![
        ChatMessage::system(request.system.as_str()),
        ChatMessage::user_with_images(request.user_text.as_str(), images),
    ]
}

/// Sort a provider failure into the run's error taxonomy.
fn map_llm_error(service: &str, err: LlmError) -> StoryError {
    let service = service.to_string();
    match err {
        LlmError::NetworkError(_) | LlmError::Timeout => StoryError::Transport {
            service,
            detail: err.to_string(),
        },
        LlmError::SerializationError(e) => StoryError::Format {
            what: format!("{service} response"),
            detail: e.to_string(),
        },
        LlmError::ConfigError(hint) => StoryError::ProviderNotConfigured {
            provider: service,
            hint,
        },
        other => StoryError::Rejected {
            service,
            detail: other.to_string(),
        },
    }
}

fn build_options(request: &ChatRequest) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(request.temperature),
        max_tokens: Some(request.max_tokens),
        ..Default::default()
    }
}

#[async_trait]
impl ChatBackend for ProviderChat {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, StoryError> {
        let messages = build_messages(request);
        let options = build_options(request);
        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| map_llm_error(&self.name, e))?;
        debug!(
            "{}: {} input tokens, {} output tokens",
            self.name, response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

/// Resolve the `edgequake-llm` provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — used as-is.
/// 2. **Named provider + model** (`config.provider_name`) — created through
///    [`ProviderFactory::create_llm_provider`], which reads that provider's
///    API key from the environment.
/// 3. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_provider(config: &StoryConfig) -> Result<Arc<dyn LLMProvider>, StoryError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return ProviderFactory::create_llm_provider(name, model).map_err(|e| {
            StoryError::ProviderNotConfigured {
                provider: name.clone(),
                hint: format!("{e}"),
            }
        });
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| StoryError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure an endpoint.\n\
                Error: {}",
                e
            ),
        })?;
    Ok(llm_provider)
}
