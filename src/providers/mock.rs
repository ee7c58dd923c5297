use super::{ChatProvider, CompletionRequest};
use crate::core::error::ChatError;
use async_trait::async_trait;
use chrono::Local;
use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Duration;

pub const GREETING_REPLY: &str = "Hello! 👋 I'm your AI assistant. How can I help you today?";
pub const WEATHER_REPLY: &str = "I don't have access to real-time weather data, but you could check a weather service like weather.com for accurate information.";
pub const IDENTITY_REPLY: &str = "I'm an AI chatbot created to assist and answer your questions. I'm running in mock mode for demonstration purposes.";
pub const JOKE_REPLY: &str =
    "Why don't scientists trust atoms? Because they make up everything! 😄";
pub const THANKS_REPLY: &str = "You're welcome! Is there anything else I can help you with?";

const DEFAULT_LATENCY_MS: RangeInclusive<u64> = 1000..=3000;

/// Deterministic stand-in for a real model, used for demos and offline work.
#[derive(Debug, Clone)]
pub struct MockProvider {
    latency_ms: RangeInclusive<u64>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            latency_ms: DEFAULT_LATENCY_MS,
        }
    }

    /// Overrides the simulated latency window, in milliseconds.
    pub fn with_latency(latency_ms: RangeInclusive<u64>) -> Self {
        Self { latency_ms }
    }

    fn simulated_delay(&self) -> Duration {
        if self.latency_ms.is_empty() {
            return Duration::ZERO;
        }
        let millis = rand::thread_rng().gen_range(self.latency_ms.clone());
        Duration::from_millis(millis)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn requires_credential(&self) -> bool {
        false
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
        _credential: Option<&str>,
    ) -> Result<String, ChatError> {
        let delay = self.simulated_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(canned_reply(&request.prompt))
    }
}

/// Keyword rules are checked in order; the first matching rule answers.
pub fn canned_reply(user_message: &str) -> String {
    let msg = user_message.to_lowercase();
    let has_any = |keywords: &[&str]| keywords.iter().any(|k| msg.contains(k));

    if has_any(&["hello", "hi"]) {
        GREETING_REPLY.to_string()
    } else if has_any(&["weather"]) {
        WEATHER_REPLY.to_string()
    } else if has_any(&["time"]) {
        format!("The current time is {}.", Local::now().format("%H:%M:%S"))
    } else if has_any(&["who are you", "what are you"]) {
        IDENTITY_REPLY.to_string()
    } else if has_any(&["joke"]) {
        JOKE_REPLY.to_string()
    } else if has_any(&["thanks", "thank you"]) {
        THANKS_REPLY.to_string()
    } else {
        format!(
            "That's an interesting question: \"{}\". I understood you wanted to know about that topic. \
             In a real scenario, I would provide a more detailed response based on the OpenAI API. \
             For now, this is a mock response to demonstrate the chat interface functionality.",
            user_message
        )
    }
}
