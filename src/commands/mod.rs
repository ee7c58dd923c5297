pub mod dispatcher;
pub mod handler;
pub mod registry;

use crate::chat::ChatSession;
pub use dispatcher::create_command_registry;

pub struct ChatState {
    pub session: ChatSession,
    pub should_continue: bool,
}

impl ChatState {
    pub fn new(session: ChatSession) -> Self {
        Self {
            session,
            should_continue: true,
        }
    }
}
