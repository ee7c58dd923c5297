use super::{ChatMessage, ChatProvider, CompletionRequest};
use crate::core::error::ChatError;
use crate::providers::base_client::HttpClient;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// Returned when a successful response carries no message content.
pub const NO_RESPONSE_PLACEHOLDER: &str = "No response received from API";

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<MessageContent>,
}

#[derive(Deserialize)]
struct MessageContent {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone)]
pub struct OpenAIProvider {
    client: HttpClient,
}

impl OpenAIProvider {
    pub fn new() -> Result<Self, ChatError> {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: &str) -> Result<Self, ChatError> {
        Ok(Self::with_client(HttpClient::new(endpoint)?))
    }

    pub fn with_client(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ChatProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn requires_credential(&self) -> bool {
        true
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
        credential: Option<&str>,
    ) -> Result<String, ChatError> {
        let api_key = credential.ok_or_else(|| {
            ChatError::Configuration(
                "OpenAI API key not configured. Please set it with /key or --set-key.".to_string(),
            )
        })?;

        let payload = ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        debug!(
            endpoint = self.client.endpoint(),
            model = %request.model,
            messages = request.messages.len(),
            "sending chat completion request"
        );

        let response = self
            .client
            .post("chat/completions", api_key, &payload)
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::UNAUTHORIZED {
                return Err(ChatError::InvalidCredential);
            }
            return Err(ChatError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        extract_reply(&body)
    }
}

/// Pulls the first choice's message content out of a completion body.
fn extract_reply(body: &str) -> Result<String, ChatError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)?;

    let first = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ChatError::ResponseParse("No choices in API response".to_string()))?;

    Ok(first
        .message
        .and_then(|m| m.content)
        .unwrap_or_else(|| NO_RESPONSE_PLACEHOLDER.to_string()))
}
