use super::dispatcher::ChatDispatcher;
use crate::config::{Config, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use crate::conversation::{ConversationContext, Message};
use crate::core::error::ChatError;
use crate::store::SecureStore;
use tracing::debug;

pub const MODEL_PREFERENCE: &str = "model";
pub const TEMPERATURE_PREFERENCE: &str = "temperature";
pub const MAX_TOKENS_PREFERENCE: &str = "max_tokens";

/// One conversation wired to a dispatcher.
pub struct ChatSession {
    context: ConversationContext,
    dispatcher: ChatDispatcher,
}

impl ChatSession {
    pub fn new(dispatcher: ChatDispatcher) -> Self {
        Self {
            context: ConversationContext::new(),
            dispatcher,
        }
    }

    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ConversationContext {
        &mut self.context
    }

    pub fn dispatcher(&self) -> &ChatDispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut ChatDispatcher {
        &mut self.dispatcher
    }

    /// Records the user turn, dispatches it with the current window and
    /// records the reply. A failed dispatch leaves the user turn in place.
    pub async fn submit(&mut self, text: &str) -> Result<String, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::InvalidArgument(
                "Message cannot be empty".to_string(),
            ));
        }

        self.context.add_message(Message::user(text));
        let history = self.context.context_messages();

        let reply = self.dispatcher.send(text, &history).await?;
        self.context.add_message(Message::assistant(reply.clone()));
        Ok(reply)
    }

    pub fn set_model(&mut self, model: &str) -> Result<(), ChatError> {
        let model = model.trim();
        if model.is_empty() {
            return Err(ChatError::InvalidArgument(
                "Model name cannot be empty".to_string(),
            ));
        }
        self.dispatcher.set_model(model);
        self.dispatcher
            .store_mut()
            .set_value(MODEL_PREFERENCE, model)?;
        Ok(())
    }

    pub fn set_temperature(&mut self, temperature: f64) -> Result<(), ChatError> {
        self.dispatcher.set_temperature(temperature);
        self.dispatcher
            .store_mut()
            .set_value(TEMPERATURE_PREFERENCE, &temperature.to_string())?;
        Ok(())
    }

    pub fn set_max_tokens(&mut self, max_tokens: u32) -> Result<(), ChatError> {
        if max_tokens == 0 {
            return Err(ChatError::InvalidArgument(
                "Max tokens must be positive".to_string(),
            ));
        }
        self.dispatcher.set_max_tokens(max_tokens);
        self.dispatcher
            .store_mut()
            .set_value(MAX_TOKENS_PREFERENCE, &max_tokens.to_string())?;
        Ok(())
    }

    /// Drops saved preferences and returns the dispatch parameters to their defaults.
    pub fn reset_preferences(&mut self) -> Result<(), ChatError> {
        let store = self.dispatcher.store_mut();
        store.remove_value(MODEL_PREFERENCE)?;
        store.remove_value(TEMPERATURE_PREFERENCE)?;
        store.remove_value(MAX_TOKENS_PREFERENCE)?;

        self.dispatcher.set_model(DEFAULT_MODEL);
        self.dispatcher.set_temperature(DEFAULT_TEMPERATURE);
        self.dispatcher.set_max_tokens(DEFAULT_MAX_TOKENS);
        Ok(())
    }
}

/// Layers preferences saved by earlier sessions over the file config.
pub fn apply_preferences(config: &mut Config, store: &SecureStore) {
    if let Some(model) = store.get_value(MODEL_PREFERENCE).filter(|m| !m.is_empty()) {
        config.model = model.to_string();
    }

    if let Some(raw) = store.get_value(TEMPERATURE_PREFERENCE) {
        match raw.parse::<f64>() {
            Ok(temperature) => config.temperature = temperature,
            Err(e) => debug!(value = raw, error = %e, "ignoring stored temperature"),
        }
    }

    if let Some(raw) = store.get_value(MAX_TOKENS_PREFERENCE) {
        match raw.parse::<u32>() {
            Ok(max_tokens) if max_tokens > 0 => config.max_tokens = max_tokens,
            _ => debug!(value = raw, "ignoring stored max_tokens"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{MAX_CONTEXT_MESSAGES, Role};
    use crate::providers::mock::{GREETING_REPLY, MockProvider};
    use crate::providers::openai::OpenAIProvider;
    use crate::store::sealer::test_sealer;
    use std::path::Path;
    use tempfile::TempDir;

    fn open_store(path: &Path) -> SecureStore {
        SecureStore::open(path, Box::new(test_sealer("pw"))).unwrap()
    }

    fn mock_session(dir: &TempDir) -> ChatSession {
        let store = open_store(&dir.path().join("store.json"));
        let provider = MockProvider::with_latency(0..=0);
        ChatSession::new(ChatDispatcher::new(Box::new(provider), store))
    }

    #[tokio::test]
    async fn greeting_exchange_records_both_turns() {
        let dir = TempDir::new().unwrap();
        let mut session = mock_session(&dir);
        assert!(session.context().is_empty());

        let reply = session.submit("hi").await.unwrap();
        assert_eq!(reply, GREETING_REPLY);

        let messages = session.context().context_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role(), Role::User);
        assert_eq!(messages[0].content(), "hi");
        assert_eq!(messages[1].role(), Role::Assistant);
        assert_eq!(messages[1].content(), GREETING_REPLY);
    }

    #[tokio::test]
    async fn failed_dispatch_keeps_the_user_turn() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir.path().join("store.json"));
        let provider = OpenAIProvider::with_endpoint("http://127.0.0.1:9/v1").unwrap();
        let mut session = ChatSession::new(ChatDispatcher::new(Box::new(provider), store));

        let result = session.submit("hello").await;

        assert!(matches!(result, Err(ChatError::Configuration(_))));
        assert_eq!(session.context().len(), 1);
        assert_eq!(session.context().context_messages()[0].content(), "hello");
    }

    #[tokio::test]
    async fn blank_submission_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut session = mock_session(&dir);

        assert!(matches!(
            session.submit("   ").await,
            Err(ChatError::InvalidArgument(_))
        ));
        assert!(session.context().is_empty());
    }

    #[tokio::test]
    async fn long_conversations_stay_bounded() {
        let dir = TempDir::new().unwrap();
        let mut session = mock_session(&dir);

        for i in 0..15 {
            session.submit(&format!("question {}", i)).await.unwrap();
        }

        let messages = session.context().context_messages();
        assert_eq!(messages.len(), MAX_CONTEXT_MESSAGES);
        assert_eq!(messages[0].content(), "question 5");
        assert_eq!(messages.last().unwrap().role(), Role::Assistant);
    }

    #[test]
    fn preferences_round_trip_through_the_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        {
            let mut session = mock_session(&dir);
            session.set_model("gpt-4").unwrap();
            session.set_temperature(1.25).unwrap();
            session.set_max_tokens(512).unwrap();
            assert_eq!(session.dispatcher().model(), "gpt-4");
            assert!(matches!(
                session.set_max_tokens(0),
                Err(ChatError::InvalidArgument(_))
            ));
            assert!(matches!(
                session.set_model(" "),
                Err(ChatError::InvalidArgument(_))
            ));
        }

        let mut config = Config::default();
        apply_preferences(&mut config, &open_store(&path));

        assert_eq!(config.model, "gpt-4");
        assert_eq!(config.temperature, 1.25);
        assert_eq!(config.max_tokens, 512);
    }

    #[test]
    fn reset_forgets_saved_preferences() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        {
            let mut session = mock_session(&dir);
            session.set_model("gpt-4").unwrap();
            session.set_temperature(1.9).unwrap();
            session.set_max_tokens(64).unwrap();
            session.reset_preferences().unwrap();
            assert_eq!(session.dispatcher().model(), DEFAULT_MODEL);
            assert_eq!(session.dispatcher().max_tokens(), DEFAULT_MAX_TOKENS);
        }

        let store = open_store(&path);
        assert_eq!(store.get_value(MODEL_PREFERENCE), None);
        assert_eq!(store.get_value(TEMPERATURE_PREFERENCE), None);
        assert_eq!(store.get_value(MAX_TOKENS_PREFERENCE), None);
    }

    #[test]
    fn unparsable_temperature_is_ignored() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir.path().join("store.json"));
        store.set_value(TEMPERATURE_PREFERENCE, "warm").unwrap();

        let mut config = Config::default();
        apply_preferences(&mut config, &store);

        assert_eq!(config.temperature, Config::default().temperature);
    }
}
