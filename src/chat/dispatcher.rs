use crate::config::{Config, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use crate::conversation::Message;
use crate::core::error::ChatError;
use crate::providers::factory::ProviderFactory;
use crate::providers::{ChatMessage, ChatProvider, CompletionRequest};
use crate::store::SecureStore;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Store entry holding the provider API key.
pub const CREDENTIAL_KEY: &str = "OpenAI_API_Key";

/// Number of trailing history entries forwarded on each request.
pub const HISTORY_LIMIT: usize = 10;

/// Routes user messages to the configured provider.
///
/// `is_processing` is advisory: a second `send` while one is in flight is
/// not rejected, callers serialize their own input.
pub struct ChatDispatcher {
    provider: Box<dyn ChatProvider>,
    store: SecureStore,
    model: String,
    temperature: f64,
    max_tokens: u32,
    processing: AtomicBool,
}

/// Holds the busy flag up until dropped, whichever way `send` exits.
struct ProcessingGuard<'a>(&'a AtomicBool);

impl<'a> ProcessingGuard<'a> {
    fn engage(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ChatDispatcher {
    pub fn new(provider: Box<dyn ChatProvider>, store: SecureStore) -> Self {
        Self {
            provider,
            store,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            processing: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &Config, store: SecureStore) -> Result<Self, ChatError> {
        let provider = ProviderFactory::new().create(config)?;
        let mut dispatcher = Self::new(provider, store);
        dispatcher.set_model(config.model.clone());
        dispatcher.set_temperature(config.temperature);
        dispatcher.set_max_tokens(config.max_tokens);
        Ok(dispatcher)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn set_temperature(&mut self, temperature: f64) {
        self.temperature = temperature;
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn set_max_tokens(&mut self, max_tokens: u32) {
        self.max_tokens = max_tokens;
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn is_mock(&self) -> bool {
        !self.provider.requires_credential()
    }

    pub fn store(&self) -> &SecureStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SecureStore {
        &mut self.store
    }

    pub async fn send(&self, user_message: &str, history: &[Message]) -> Result<String, ChatError> {
        if user_message.trim().is_empty() {
            return Err(ChatError::InvalidArgument(
                "Message cannot be empty".to_string(),
            ));
        }

        let _busy = ProcessingGuard::engage(&self.processing);

        let credential = if self.provider.requires_credential() {
            Some(self.credential()?.ok_or_else(|| {
                ChatError::Configuration(
                    "OpenAI API key not configured. Please set it with /key or --set-key."
                        .to_string(),
                )
            })?)
        } else {
            None
        };

        let request = self.build_request(user_message, history);
        debug!(
            provider = self.provider.name(),
            model = %request.model,
            history = request.messages.len(),
            "dispatching message"
        );

        self.provider
            .complete(&request, credential.as_deref())
            .await
            .inspect_err(|e| debug!(error = %e, "dispatch failed"))
    }

    /// One minimal round trip. Never fails; any error reads as `false`.
    pub async fn test_connection(&self) -> bool {
        if !self.provider.requires_credential() {
            return true;
        }

        match self.credential() {
            Ok(Some(_)) => {}
            Ok(None) => return false,
            Err(e) => {
                warn!(error = %e, "stored credential could not be read");
                return false;
            }
        }

        match self.send("Test", &[Message::user("Test")]).await {
            Ok(reply) => !reply.is_empty(),
            Err(e) => {
                warn!(error = %e, "connection test failed");
                false
            }
        }
    }

    pub fn set_credential(&mut self, value: &str) -> Result<(), ChatError> {
        if value.trim().is_empty() {
            return Err(ChatError::InvalidArgument(
                "API key cannot be empty".to_string(),
            ));
        }

        self.store
            .set_secret(CREDENTIAL_KEY, value)
            .map_err(|e| ChatError::Configuration(format!("Failed to set API key: {}", e)))
    }

    pub fn has_credential(&self) -> bool {
        self.store.has_secret(CREDENTIAL_KEY)
    }

    pub fn remove_credential(&mut self) -> Result<bool, ChatError> {
        self.store
            .remove_secret(CREDENTIAL_KEY)
            .map_err(|e| ChatError::Configuration(format!("Failed to remove API key: {}", e)))
    }

    fn credential(&self) -> Result<Option<String>, ChatError> {
        self.store.get_secret(CREDENTIAL_KEY).map_err(|e| {
            ChatError::Configuration(format!("Stored API key could not be read: {}", e))
        })
    }

    fn build_request(&self, prompt: &str, history: &[Message]) -> CompletionRequest {
        let start = history.len().saturating_sub(HISTORY_LIMIT);
        CompletionRequest {
            prompt: prompt.to_string(),
            messages: history[start..].iter().map(ChatMessage::from).collect(),
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::{GREETING_REPLY, MockProvider};
    use crate::providers::openai::OpenAIProvider;
    use crate::store::sealer::test_sealer;
    use serde_json::{Value, json};
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn temp_store() -> (TempDir, SecureStore) {
        let dir = TempDir::new().unwrap();
        let store =
            SecureStore::open(dir.path().join("store.json"), Box::new(test_sealer("pw"))).unwrap();
        (dir, store)
    }

    fn mock_dispatcher() -> (TempDir, ChatDispatcher) {
        let (dir, store) = temp_store();
        let provider = MockProvider::with_latency(0..=0);
        (dir, ChatDispatcher::new(Box::new(provider), store))
    }

    fn real_dispatcher(endpoint: &str) -> (TempDir, ChatDispatcher) {
        let (dir, store) = temp_store();
        let provider = OpenAIProvider::with_endpoint(endpoint).unwrap();
        (dir, ChatDispatcher::new(Box::new(provider), store))
    }

    async fn completion_server(status: u16, body: Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&server)
            .await;
        server
    }

    fn alternating_history(n: usize) -> Vec<Message> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("u{}", i))
                } else {
                    Message::assistant(format!("a{}", i))
                }
            })
            .collect()
    }

    #[tokio::test]
    async fn mock_send_answers_and_clears_busy_flag() {
        let (_dir, dispatcher) = mock_dispatcher();

        let reply = dispatcher.send("Hello!", &[]).await.unwrap();

        assert_eq!(reply, GREETING_REPLY);
        assert!(!dispatcher.is_processing());
    }

    #[tokio::test]
    async fn busy_flag_is_set_while_in_flight() {
        let (_dir, store) = temp_store();
        let provider = MockProvider::with_latency(200..=200);
        let dispatcher = ChatDispatcher::new(Box::new(provider), store);

        let (reply, observed) = tokio::join!(dispatcher.send("hi", &[]), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            dispatcher.is_processing()
        });

        assert!(reply.is_ok());
        assert!(observed);
        assert!(!dispatcher.is_processing());
    }

    #[tokio::test]
    async fn blank_input_is_rejected() {
        let (_dir, dispatcher) = mock_dispatcher();

        for input in ["", "   ", "\t\n"] {
            let result = dispatcher.send(input, &[]).await;
            assert!(matches!(result, Err(ChatError::InvalidArgument(_))));
        }
        assert!(!dispatcher.is_processing());
    }

    #[tokio::test]
    async fn real_path_without_credential_is_not_configured() {
        let (_dir, dispatcher) = real_dispatcher("http://127.0.0.1:9/v1");

        let result = dispatcher.send("hello", &[Message::user("hello")]).await;

        assert!(matches!(result, Err(ChatError::Configuration(ref m)) if m.contains("not configured")));
        assert!(!dispatcher.is_processing());
    }

    #[tokio::test]
    async fn real_path_forwards_only_the_last_ten() {
        let server = completion_server(
            200,
            json!({"choices": [{"message": {"content": "ok"}}]}),
        )
        .await;
        let (_dir, mut dispatcher) = real_dispatcher(&format!("{}/v1", server.uri()));
        dispatcher.set_credential("sk-test").unwrap();
        dispatcher.set_model("gpt-4");
        dispatcher.set_temperature(1.1);
        dispatcher.set_max_tokens(256);

        for (len, expected) in [(25, 10), (10, 10), (3, 3), (0, 0)] {
            let history = alternating_history(len);
            server.reset().await;
            Mock::given(method("POST"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!({"choices": [{"message": {"content": "ok"}}]})),
                )
                .mount(&server)
                .await;

            assert_eq!(dispatcher.send("next", &history).await.unwrap(), "ok");

            let requests = server.received_requests().await.unwrap();
            let body: Value = requests.last().unwrap().body_json().unwrap();
            let messages = body["messages"].as_array().unwrap();
            assert_eq!(messages.len(), expected);
            assert_eq!(body["model"], "gpt-4");
            assert_eq!(body["temperature"], 1.1);
            assert_eq!(body["max_tokens"], 256);

            let tail = &history[len - expected..];
            for (sent, original) in messages.iter().zip(tail) {
                assert_eq!(sent["content"], original.content());
                assert_eq!(sent["role"], original.role().as_str());
            }
        }
    }

    #[tokio::test]
    async fn unauthorized_surfaces_as_invalid_credential() {
        let server = completion_server(401, json!({"error": {"message": "bad key"}})).await;
        let (_dir, mut dispatcher) = real_dispatcher(&format!("{}/v1", server.uri()));
        dispatcher.set_credential("sk-wrong").unwrap();

        let result = dispatcher.send("hello", &[Message::user("hello")]).await;

        assert!(matches!(result, Err(ChatError::InvalidCredential)));
        assert!(!dispatcher.is_processing());
    }

    #[tokio::test]
    async fn connection_test_in_mock_mode_always_passes() {
        let (_dir, dispatcher) = mock_dispatcher();
        assert!(dispatcher.test_connection().await);
    }

    #[tokio::test]
    async fn connection_test_without_credential_fails_quietly() {
        let (_dir, dispatcher) = real_dispatcher("http://127.0.0.1:9/v1");
        assert!(!dispatcher.test_connection().await);
    }

    #[tokio::test]
    async fn connection_test_reports_provider_outcome() {
        let ok = completion_server(200, json!({"choices": [{"message": {"content": "pong"}}]})).await;
        let (_dir, mut dispatcher) = real_dispatcher(&format!("{}/v1", ok.uri()));
        dispatcher.set_credential("sk-test").unwrap();
        assert!(dispatcher.test_connection().await);

        let failing = completion_server(500, json!({"error": "boom"})).await;
        let (_dir2, mut dispatcher) = real_dispatcher(&format!("{}/v1", failing.uri()));
        dispatcher.set_credential("sk-test").unwrap();
        assert!(!dispatcher.test_connection().await);

        let empty = completion_server(200, json!({"choices": [{"message": {"content": ""}}]})).await;
        let (_dir3, mut dispatcher) = real_dispatcher(&format!("{}/v1", empty.uri()));
        dispatcher.set_credential("sk-test").unwrap();
        assert!(!dispatcher.test_connection().await);
    }

    #[test]
    fn credential_management() {
        let (_dir, mut dispatcher) = mock_dispatcher();

        assert!(matches!(
            dispatcher.set_credential("  "),
            Err(ChatError::InvalidArgument(_))
        ));
        assert!(!dispatcher.has_credential());

        dispatcher.set_credential("sk-live").unwrap();
        assert!(dispatcher.has_credential());
        assert_eq!(
            dispatcher.store().get_secret(CREDENTIAL_KEY).unwrap().as_deref(),
            Some("sk-live")
        );

        assert!(dispatcher.remove_credential().unwrap());
        assert!(!dispatcher.has_credential());
    }

    #[tokio::test]
    async fn unsaved_credential_is_never_used() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        let store = SecureStore::open(&path, Box::new(test_sealer("pw"))).unwrap();
        std::fs::create_dir_all(&path).unwrap();
        let provider = OpenAIProvider::with_endpoint("http://127.0.0.1:9/v1").unwrap();
        let mut dispatcher = ChatDispatcher::new(Box::new(provider), store);

        assert!(matches!(
            dispatcher.set_credential("sk-new"),
            Err(ChatError::Configuration(_))
        ));
        assert!(!dispatcher.has_credential());

        let result = dispatcher.send("hello", &[Message::user("hello")]).await;
        assert!(matches!(result, Err(ChatError::Configuration(ref m)) if m.contains("not configured")));
    }

    #[test]
    fn from_config_applies_parameters() {
        let (_dir, store) = temp_store();
        let config = Config {
            provider: crate::config::ProviderKind::Mock,
            model: "gpt-4".into(),
            temperature: 0.2,
            max_tokens: 512,
            ..Config::default()
        };

        let dispatcher = ChatDispatcher::from_config(&config, store).unwrap();

        assert!(dispatcher.is_mock());
        assert_eq!(dispatcher.model(), "gpt-4");
        assert_eq!(dispatcher.temperature(), 0.2);
        assert_eq!(dispatcher.max_tokens(), 512);
    }
}
