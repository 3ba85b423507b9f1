//! Azure OpenAI–style deployment endpoints spoken directly over reqwest.
//!
//! Both the chat and the image endpoint are addressed by their full
//! deployment URL and authenticated with an `api-key` header:
//!
//! ```text
//! {endpoint}/openai/deployments/{deployment}/chat/completions?api-version=…
//! {endpoint}/openai/deployments/{deployment}/images/generations?api-version=…
//! ```
//!
//! A bare resource URL is expanded to that form by [`resolve_endpoint`].

use super::{truncate_body, ChatBackend, ChatRequest, ImageGenerator};
use crate::error::{AssetError, StoryError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default API version for chat deployments.
pub const CHAT_API_VERSION: &str = "2024-08-01-preview";

/// Default API version for image deployments.
pub const IMAGE_API_VERSION: &str = "2024-02-01";

/// Build a full deployment URL from a resource endpoint.
///
/// ```
/// use notes2story::backend::azure::deployment_url;
///
/// assert_eq!(
///     deployment_url("https://res.openai.azure.com/", "gpt-4", "chat/completions", "2024-08-01-preview"),
///     "https://res.openai.azure.com/openai/deployments/gpt-4/chat/completions?api-version=2024-08-01-preview"
/// );
/// ```
pub fn deployment_url(endpoint: &str, deployment: &str, operation: &str, api_version: &str) -> String {
    format!(
        "{}/openai/deployments/{}/{}?api-version={}",
        endpoint.trim_end_matches('/'),
        deployment,
        operation,
        api_version
    )
}

/// Return `endpoint` unchanged if it already names a deployment, otherwise
/// treat it as a resource base URL and expand it with [`deployment_url`].
pub fn resolve_endpoint(
    endpoint: &str,
    deployment: &str,
    operation: &str,
    api_version: &str,
) -> String {
    let endpoint = endpoint.trim();
    if endpoint.contains("/openai/deployments/") {
        endpoint.to_string()
    } else {
        deployment_url(endpoint, deployment, operation, api_version)
    }
}

// ── Chat ─────────────────────────────────────────────────────────────────

/// Chat-completion client for one deployment URL.
pub struct AzureChatClient {
    name: String,
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl AzureChatClient {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            client,
        }
    }
}

#[derive(Serialize)]
struct ChatPayload<'a> {
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

fn chat_payload(request: &ChatRequest) -> ChatPayload<'_> {
    let user = match &request.image {
        Some(image) => {
            let mut parts = Vec::with_capacity(2);
            if !request.user_text.is_empty() {
                parts.push(ContentPart::Text {
                    text: &request.user_text,
                });
            }
            parts.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image.data_url(),
                },
            });
            MessageContent::Parts(parts)
        }
        None => MessageContent::Text(&request.user_text),
    };

    ChatPayload {
        messages: vec![
            Message {
                role: "system",
                content: MessageContent::Text(&request.system),
            },
            Message {
                role: "user",
                content: user,
            },
        ],
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    }
}

#[derive(Deserialize)]
struct ChatEnvelope {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Pull `choices[0].message.content` out of a chat-completion body.
pub(crate) fn parse_chat_envelope(service: &str, body: &str) -> Result<String, StoryError> {
    let envelope: ChatEnvelope = serde_json::from_str(body)
        .map_err(|e| StoryError::format(format!("{service} response"), e.to_string()))?;
    envelope
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| {
            StoryError::format(
                format!("{service} response"),
                "no choices[0].message.content in reply",
            )
        })
}

#[async_trait]
impl ChatBackend for AzureChatClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, StoryError> {
        let payload = chat_payload(request);
        let response = self
            .client
            .post(&self.endpoint)
            .header("api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| StoryError::Transport {
                service: self.name.clone(),
                detail: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| StoryError::Transport {
            service: self.name.clone(),
            detail: e.to_string(),
        })?;
        debug!("{}: HTTP {} ({} bytes)", self.name, status.as_u16(), body.len());

        if !status.is_success() {
            return Err(StoryError::Upstream {
                service: self.name.clone(),
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }
        parse_chat_envelope(&self.name, &body)
    }
}

// ── Images ───────────────────────────────────────────────────────────────

/// Text-to-image client for one deployment URL.
pub struct AzureImageClient {
    endpoint: String,
    api_key: String,
    size: String,
    client: reqwest::Client,
}

impl AzureImageClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        size: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            size: size.into(),
            client,
        }
    }
}

#[derive(Serialize)]
struct ImagePayload<'a> {
    prompt: &'a str,
    n: u8,
    size: &'a str,
}

#[derive(Deserialize)]
struct ImageEnvelope {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Deserialize)]
struct GeneratedImage {
    url: Option<String>,
}

/// Pull `data[0].url` out of an image-generation body.
pub(crate) fn parse_image_envelope(body: &str) -> Result<String, AssetError> {
    let envelope: ImageEnvelope =
        serde_json::from_str(body).map_err(|e| AssetError::Generation {
            status: Some(200),
            detail: format!("unreadable response: {e}"),
        })?;
    envelope
        .data
        .into_iter()
        .next()
        .and_then(|img| img.url)
        .ok_or_else(|| AssetError::Generation {
            status: Some(200),
            detail: "no data[0].url in reply".into(),
        })
}

#[async_trait]
impl ImageGenerator for AzureImageClient {
    async fn generate(&self, prompt: &str) -> Result<String, AssetError> {
        let payload = ImagePayload {
            prompt,
            n: 1,
            size: &self.size,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .header("api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AssetError::Generation {
                status: None,
                detail: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| AssetError::Generation {
            status: Some(status),
            detail: e.to_string(),
        })?;

        if status != 200 {
            return Err(AssetError::Generation {
                status: Some(status),
                detail: truncate_body(&body),
            });
        }
        parse_image_envelope(&body)
    }
}
