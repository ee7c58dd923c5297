use crate::config::{Config, ProviderKind};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Chat with an LLM from the terminal", long_about = None)]
pub struct Args {
    /// Message to send once; omit it to start an interactive chat
    pub query: Option<String>,

    /// AI provider to use [possible values: openai, mock]
    #[arg(short, long)]
    pub provider: Option<ProviderKind>,

    /// Use the offline mock assistant; shorthand for `--provider mock`
    #[arg(long)]
    pub mock: bool,

    /// Model to use
    #[arg(short, long)]
    pub model: Option<String>,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(short, long)]
    pub temperature: Option<f64>,

    /// Maximum tokens in a reply
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// API base URL of an OpenAI-compatible endpoint
    #[arg(long)]
    pub base_url: Option<String>,

    /// Store the API key (encrypted) before anything else runs
    #[arg(long, value_name = "KEY")]
    pub set_key: Option<String>,

    /// Check that the provider is reachable with the stored key
    #[arg(long)]
    pub test_connection: bool,
}

impl Args {
    /// Command-line flags win over the config file and saved preferences.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(provider) = self.provider {
            config.provider = provider;
        }
        if self.mock {
            config.provider = ProviderKind::Mock;
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.max_tokens = max_tokens;
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = Some(base_url.clone());
        }
    }

    /// True when only maintenance flags were given and no chat should start.
    pub fn is_maintenance_only(&self) -> bool {
        self.query.is_none() && (self.set_key.is_some() || self.test_connection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let args = Args::try_parse_from([
            "lmchat",
            "--mock",
            "--model",
            "gpt-4",
            "-t",
            "1.5",
            "--max-tokens",
            "100",
        ])
        .unwrap();

        let mut config = Config::default();
        args.apply_to(&mut config);

        assert_eq!(config.provider, ProviderKind::Mock);
        assert_eq!(config.model, "gpt-4");
        assert_eq!(config.temperature, 1.5);
        assert_eq!(config.max_tokens, 100);
        assert!(args.query.is_none());
    }

    #[test]
    fn absent_flags_leave_config_alone() {
        let args = Args::try_parse_from(["lmchat", "what time is it?"]).unwrap();

        let mut config = Config::default();
        args.apply_to(&mut config);

        assert_eq!(config, Config::default());
        assert_eq!(args.query.as_deref(), Some("what time is it?"));
        assert!(!args.is_maintenance_only());
    }

    #[test]
    fn provider_flag_selects_the_variant() {
        let args = Args::try_parse_from(["lmchat", "-p", "Mock"]).unwrap();
        let mut config = Config::default();
        args.apply_to(&mut config);
        assert_eq!(config.provider, ProviderKind::Mock);

        let args = Args::try_parse_from(["lmchat", "--provider", "openai"]).unwrap();
        let mut config = Config {
            provider: ProviderKind::Mock,
            ..Config::default()
        };
        args.apply_to(&mut config);
        assert_eq!(config.provider, ProviderKind::OpenAI);

        assert!(Args::try_parse_from(["lmchat", "--provider", "gemini"]).is_err());
    }

    #[test]
    fn key_only_invocation_is_maintenance() {
        let args = Args::try_parse_from(["lmchat", "--set-key", "sk-abc"]).unwrap();
        assert!(args.is_maintenance_only());
    }
}
