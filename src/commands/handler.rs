use super::ChatState;
use crate::core::error::ChatError;
use async_trait::async_trait;
use console::style;

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(
        &self,
        state: &mut ChatState,
        args: &[&str],
    ) -> Result<Option<String>, ChatError>;
    fn help(&self) -> &'static str;
}

pub struct QuitCommand;
pub struct HelpCommand;
pub struct ClearCommand;
pub struct StatsCommand;
pub struct HistoryCommand;
pub struct ModelCommand;
pub struct TemperatureCommand;
pub struct MaxTokensCommand;
pub struct KeyCommand;
pub struct TestCommand;
pub struct ResetCommand;

#[async_trait]
impl CommandHandler for QuitCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        _args: &[&str],
    ) -> Result<Option<String>, ChatError> {
        state.should_continue = false;
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "/quit - Exit the chat session"
    }
}

#[async_trait]
impl CommandHandler for HelpCommand {
    async fn execute(
        &self,
        _state: &mut ChatState,
        _args: &[&str],
    ) -> Result<Option<String>, ChatError> {
        let title = style("Available Commands").bold().underlined();
        let help_text = vec![
            title.to_string(),
            QuitCommand.help().to_string(),
            HelpCommand.help().to_string(),
            ClearCommand.help().to_string(),
            StatsCommand.help().to_string(),
            HistoryCommand.help().to_string(),
            ModelCommand.help().to_string(),
            TemperatureCommand.help().to_string(),
            MaxTokensCommand.help().to_string(),
            KeyCommand.help().to_string(),
            TestCommand.help().to_string(),
            ResetCommand.help().to_string(),
        ]
        .join("\n");

        Ok(Some(help_text))
    }

    fn help(&self) -> &'static str {
        "/help - Show available commands"
    }
}

#[async_trait]
impl CommandHandler for ClearCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        _args: &[&str],
    ) -> Result<Option<String>, ChatError> {
        state.session.context_mut().clear();
        Ok(Some("Chat history cleared.".to_string()))
    }

    fn help(&self) -> &'static str {
        "/clear - Clear conversation history"
    }
}

#[async_trait]
impl CommandHandler for StatsCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        _args: &[&str],
    ) -> Result<Option<String>, ChatError> {
        let context = state.session.context();
        Ok(Some(format!(
            "Conversation {} (started {})\n{}",
            context.conversation_id(),
            context.created_at().format("%H:%M:%S"),
            context.statistics()
        )))
    }

    fn help(&self) -> &'static str {
        "/stats - Show conversation statistics"
    }
}

#[async_trait]
impl CommandHandler for HistoryCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        args: &[&str],
    ) -> Result<Option<String>, ChatError> {
        let context = state.session.context();
        if context.is_empty() {
            return Ok(Some("No messages yet.".to_string()));
        }
        if args.first() == Some(&"plain") {
            return Ok(Some(context.formatted_context().trim_end().to_string()));
        }
        let lines: Vec<String> = context.messages().map(|m| m.to_string()).collect();
        Ok(Some(lines.join("\n")))
    }

    fn help(&self) -> &'static str {
        "/history [plain] - Show the messages kept in context"
    }
}

#[async_trait]
impl CommandHandler for ModelCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        args: &[&str],
    ) -> Result<Option<String>, ChatError> {
        if args.is_empty() {
            return Ok(Some(format!(
                "Current model: {}",
                state.session.dispatcher().model()
            )));
        }
        state.session.set_model(args[0])?;
        Ok(Some(format!(
            "Model changed to: {}",
            state.session.dispatcher().model()
        )))
    }

    fn help(&self) -> &'static str {
        "/model <name> - Show or change the current model"
    }
}

#[async_trait]
impl CommandHandler for TemperatureCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        args: &[&str],
    ) -> Result<Option<String>, ChatError> {
        if args.is_empty() {
            return Ok(Some(format!(
                "Current temperature: {:.2}",
                state.session.dispatcher().temperature()
            )));
        }
        let temperature: f64 = args[0]
            .parse()
            .map_err(|_| ChatError::Input(format!("Not a number: {}", args[0])))?;
        state.session.set_temperature(temperature)?;
        Ok(Some(format!("Temperature set to: {:.2}", temperature)))
    }

    fn help(&self) -> &'static str {
        "/temperature <value> - Show or change sampling temperature (0.0 - 2.0)"
    }
}

#[async_trait]
impl CommandHandler for MaxTokensCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        args: &[&str],
    ) -> Result<Option<String>, ChatError> {
        if args.is_empty() {
            return Ok(Some(format!(
                "Max tokens: {}",
                state.session.dispatcher().max_tokens()
            )));
        }
        let max_tokens = args[0]
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ChatError::Input(format!("Not a positive integer: {}", args[0])))?;
        state.session.set_max_tokens(max_tokens)?;
        Ok(Some(format!("Max tokens set to: {}", max_tokens)))
    }

    fn help(&self) -> &'static str {
        "/tokens <n> - Show or change the response token limit"
    }
}

#[async_trait]
impl CommandHandler for KeyCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        args: &[&str],
    ) -> Result<Option<String>, ChatError> {
        let dispatcher = state.session.dispatcher_mut();
        match args.first().copied() {
            None => Ok(Some(if dispatcher.has_credential() {
                format!(
                    "API key is configured ({}).",
                    dispatcher.store().path().display()
                )
            } else {
                "API key is not configured.".to_string()
            })),
            Some("remove") => Ok(Some(if dispatcher.remove_credential()? {
                "API key removed.".to_string()
            } else {
                "No API key was stored.".to_string()
            })),
            Some(value) => {
                dispatcher.set_credential(value)?;
                Ok(Some("API key saved.".to_string()))
            }
        }
    }

    fn help(&self) -> &'static str {
        "/key <value|remove> - Store or remove the API key (encrypted)"
    }
}

#[async_trait]
impl CommandHandler for TestCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        _args: &[&str],
    ) -> Result<Option<String>, ChatError> {
        let ok = state.session.dispatcher().test_connection().await;
        Ok(Some(if ok {
            "Connection successful.".to_string()
        } else {
            "Connection failed. Check your API key and network.".to_string()
        }))
    }

    fn help(&self) -> &'static str {
        "/test - Test the connection to the provider"
    }
}

#[async_trait]
impl CommandHandler for ResetCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        _args: &[&str],
    ) -> Result<Option<String>, ChatError> {
        state.session.reset_preferences()?;
        let dispatcher = state.session.dispatcher();
        Ok(Some(format!(
            "Preferences reset. Model: {}, temperature: {:.2}",
            dispatcher.model(),
            dispatcher.temperature()
        )))
    }

    fn help(&self) -> &'static str {
        "/reset - Forget saved model, temperature and token preferences"
    }
}
