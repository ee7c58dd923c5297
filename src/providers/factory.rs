use crate::config::{Config, ProviderKind};
use crate::core::error::ChatError;
use crate::providers::{ChatProvider, mock::MockProvider, openai::OpenAIProvider};
use std::collections::HashMap;

type ProviderCreator =
    Box<dyn Fn(&Config) -> Result<Box<dyn ChatProvider>, ChatError> + Send + Sync>;

pub struct ProviderFactory {
    creators: HashMap<ProviderKind, ProviderCreator>,
}

impl ProviderFactory {
    pub fn new() -> Self {
        let mut creators = HashMap::new();

        creators.insert(
            ProviderKind::OpenAI,
            Box::new(|config: &Config| {
                let provider = match config.base_url() {
                    Some(base_url) => OpenAIProvider::with_endpoint(base_url)?,
                    None => OpenAIProvider::new()?,
                };
                Ok(Box::new(provider) as Box<dyn ChatProvider>)
            }) as ProviderCreator,
        );

        creators.insert(
            ProviderKind::Mock,
            Box::new(|_config: &Config| {
                Ok(Box::new(MockProvider::new()) as Box<dyn ChatProvider>)
            }) as ProviderCreator,
        );

        Self { creators }
    }

    pub fn create(&self, config: &Config) -> Result<Box<dyn ChatProvider>, ChatError> {
        self.creators
            .get(&config.provider)
            .ok_or_else(|| {
                ChatError::Configuration(format!("Provider not found: {:?}", config.provider))
            })
            .and_then(|creator| creator(config))
    }
}

impl Default for ProviderFactory {
    fn default() -> Self {
        Self::new()
    }
}
