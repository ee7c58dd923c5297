use crate::cli::Args;
use crate::commands::{ChatState, dispatcher::CommandDispatcher};
use crate::core::error::ChatError;
use crate::display;
use crate::input;
use is_terminal::IsTerminal;
use std::io::{self, Read};

pub struct Application {
    pub args: Args,
    pub state: ChatState,
    pub command_dispatcher: CommandDispatcher,
}

impl Application {
    pub fn new(args: Args, state: ChatState, command_dispatcher: CommandDispatcher) -> Self {
        Self {
            args,
            state,
            command_dispatcher,
        }
    }

    pub async fn run(&mut self) -> Result<(), ChatError> {
        self.handle_maintenance().await?;
        if self.args.is_maintenance_only() {
            return Ok(());
        }

        let piped = if !io::stdin().is_terminal() {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| ChatError::Input(format!("Failed to read from stdin: {}", e)))?;
            Some(buffer)
        } else {
            None
        };

        match (self.args.query.clone(), piped) {
            (Some(query), Some(stdin_ctx)) => {
                self.handle_single_message(&format!("{}\n\n{}", stdin_ctx.trim_end(), query))
                    .await
            }
            (None, Some(stdin_ctx)) => self.handle_single_message(&stdin_ctx).await,
            (Some(query), None) => self.handle_single_message(&query).await,
            (None, None) => self.handle_interactive().await,
        }
    }

    async fn handle_maintenance(&mut self) -> Result<(), ChatError> {
        if let Some(key) = self.args.set_key.as_deref() {
            self.state.session.dispatcher_mut().set_credential(key)?;
            display::display_info("API key saved.");
        }

        if self.args.test_connection {
            if self.state.session.dispatcher().test_connection().await {
                display::display_info("Connection successful.");
            } else {
                return Err(ChatError::Configuration(
                    "Connection test failed. Check your API key and network.".to_string(),
                ));
            }
        }

        Ok(())
    }

    async fn handle_single_message(&mut self, text: &str) -> Result<(), ChatError> {
        let response = self.state.session.submit(text).await?;
        display::display_response(&response);
        Ok(())
    }

    async fn handle_interactive(&mut self) -> Result<(), ChatError> {
        let dispatcher = self.state.session.dispatcher();
        display::display_welcome(dispatcher.provider_name(), dispatcher.model());
        if !dispatcher.is_mock() && !dispatcher.has_credential() {
            display::display_info("No API key configured yet. Use /key <value> to set one.");
        }

        let mut editor = input::create_editor(self.command_dispatcher.clone())?;

        while self.state.should_continue {
            let input = match input::read_input(&mut editor)? {
                Some(input) => input.trim().to_string(),
                None => break,
            };

            if input.is_empty() {
                continue;
            }

            if let Some(command_line) = input.strip_prefix('/') {
                let parts: Vec<&str> = command_line.split_whitespace().collect();
                let Some((command, args)) = parts.split_first() else {
                    continue;
                };

                match self
                    .command_dispatcher
                    .execute(command, args, &mut self.state)
                    .await
                {
                    Ok(Some(output)) => println!("{}", output),
                    Ok(None) => {}
                    Err(e) => display::display_error(&e),
                }
                continue;
            }

            display::display_info("Thinking...");
            match self.state.session.submit(&input).await {
                Ok(response) => display::display_response(&response),
                Err(e) => display::display_error(&e),
            }
        }

        input::save_history(&mut editor)?;

        Ok(())
    }
}
