use super::{
    ChatState,
    handler::{
        ClearCommand, HelpCommand, HistoryCommand, KeyCommand, MaxTokensCommand, ModelCommand,
        QuitCommand, ResetCommand, StatsCommand, TemperatureCommand, TestCommand,
    },
    registry::CommandRegistry,
};
use crate::core::error::ChatError;
use std::sync::Arc;

#[derive(Clone)]
pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry }
    }

    pub async fn execute(
        &self,
        command: &str,
        args: &[&str],
        state: &mut ChatState,
    ) -> Result<Option<String>, ChatError> {
        self.registry.execute(command, args, state).await
    }

    pub fn get_command_names(&self) -> Vec<String> {
        self.registry.get_command_names()
    }
}

pub fn create_command_registry() -> CommandDispatcher {
    let mut registry = CommandRegistry::new();

    registry.register("quit", QuitCommand);
    registry.register("help", HelpCommand);
    registry.register("clear", ClearCommand);
    registry.register("stats", StatsCommand);
    registry.register("history", HistoryCommand);
    registry.register("model", ModelCommand);
    registry.register("temperature", TemperatureCommand);
    registry.register("tokens", MaxTokensCommand);
    registry.register("key", KeyCommand);
    registry.register("test", TestCommand);
    registry.register("reset", ResetCommand);

    CommandDispatcher::new(Arc::new(registry))
}
