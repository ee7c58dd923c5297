use crate::commands::dispatcher::CommandDispatcher;
use crate::config::Config;
use crate::core::error::ChatError;

use console::style;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::{Hinter, HistoryHinter};
use rustyline::history::FileHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config as EditorConfig, Context, EditMode, Editor, Helper};

/// Completes `/command` names; plain chat text gets no completion.
pub struct CommandCompleter {
    command_registry: CommandDispatcher,
}

impl CommandCompleter {
    pub fn new(command_registry: CommandDispatcher) -> Self {
        Self { command_registry }
    }

    fn candidates(&self, line: &str, pos: usize) -> Vec<Pair> {
        let Some(command_part) = line.get(1..pos).filter(|_| line.starts_with('/')) else {
            return Vec::new();
        };
        if command_part.contains(char::is_whitespace) {
            return Vec::new();
        }

        self.command_registry
            .get_command_names()
            .into_iter()
            .filter(|cmd| cmd.starts_with(command_part))
            .map(|cmd| Pair {
                display: cmd.clone(),
                replacement: cmd,
            })
            .collect()
    }
}

/// Helper struct that combines the rustyline components
pub struct ChatHelper {
    completer: CommandCompleter,
    hinter: HistoryHinter,
}

impl ChatHelper {
    pub fn new(command_registry: CommandDispatcher) -> Self {
        Self {
            completer: CommandCompleter::new(command_registry),
            hinter: HistoryHinter {},
        }
    }
}

impl Helper for ChatHelper {}

impl Completer for ChatHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let matches = self.completer.candidates(line, pos);
        if matches.is_empty() {
            Ok((pos, matches))
        } else {
            // 1 is the position after '/'
            Ok((1, matches))
        }
    }
}

impl Hinter for ChatHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, ctx: &Context<'_>) -> Option<String> {
        if line.starts_with('/') {
            self.hinter.hint(line, pos, ctx)
        } else {
            None
        }
    }
}

impl Highlighter for ChatHelper {}

impl Validator for ChatHelper {}

/// Only slash commands are remembered, and never the one carrying a key.
fn should_record(line: &str) -> bool {
    let line = line.trim();
    line.starts_with('/') && line.split_whitespace().next() != Some("/key")
}

/// Creates a configured rustyline editor
pub fn create_editor(
    command_registry: CommandDispatcher,
) -> Result<Editor<ChatHelper, FileHistory>, ChatError> {
    let config = EditorConfig::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .build();

    let mut editor = Editor::with_config(config)
        .map_err(|e| ChatError::Input(format!("Failed to create line editor: {}", e)))?;

    editor.set_helper(Some(ChatHelper::new(command_registry)));
    let _ = editor.load_history(&Config::history_path());

    Ok(editor)
}

/// Reads a line of input; `None` on Ctrl-C or Ctrl-D
pub fn read_input(
    editor: &mut Editor<ChatHelper, FileHistory>,
) -> Result<Option<String>, ChatError> {
    let prompt = style("> ").bold().cyan().to_string();
    match editor.readline(&prompt) {
        Ok(line) => {
            if should_record(&line) {
                editor
                    .add_history_entry(line.trim())
                    .map_err(|e| ChatError::Input(format!("Failed to add history entry: {}", e)))?;
            }
            Ok(Some(line))
        }
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
            println!("Exiting...");
            Ok(None)
        }
        Err(err) => Err(ChatError::Input(format!("Input error: {}", err))),
    }
}

/// Saves the editor history
pub fn save_history(editor: &mut Editor<ChatHelper, FileHistory>) -> Result<(), ChatError> {
    let history_path = Config::history_path();

    if let Some(parent) = history_path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ChatError::Input(format!("Failed to create history directory: {}", e))
            })?;
        }
    }

    editor
        .save_history(&history_path)
        .map_err(|e| ChatError::Input(format!("Failed to save history: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::create_command_registry;

    #[test]
    fn completes_command_prefixes() {
        let completer = CommandCompleter::new(create_command_registry());

        let names: Vec<String> = completer
            .candidates("/te", 3)
            .into_iter()
            .map(|p| p.replacement)
            .collect();
        assert_eq!(names, vec!["temperature", "test"]);

        assert!(completer.candidates("hello", 5).is_empty());
        assert!(completer.candidates("/model gp", 9).is_empty());
    }

    #[test]
    fn key_commands_stay_out_of_history() {
        assert!(should_record("/model gpt-4"));
        assert!(!should_record("/key sk-secret"));
        assert!(!should_record("tell me a joke"));
    }
}
