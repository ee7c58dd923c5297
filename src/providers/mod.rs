use crate::conversation::Message;
use crate::core::error::ChatError;
use async_trait::async_trait;
use serde::Serialize;

pub mod base_client;
pub mod factory;
pub mod mock;
pub mod openai;

/// One history entry as sent to a provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role().as_str(),
            content: message.content().to_string(),
        }
    }
}

/// Everything a provider needs for one completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// The raw user utterance that triggered this request
    pub prompt: String,
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether `complete` needs a stored credential.
    fn requires_credential(&self) -> bool;

    async fn complete(
        &self,
        request: &CompletionRequest,
        credential: Option<&str>,
    ) -> Result<String, ChatError>;
}
