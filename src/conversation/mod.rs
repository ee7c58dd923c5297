//! Bounded conversation history.
//!
//! The context keeps the most recent [`MAX_CONTEXT_MESSAGES`] messages in
//! insertion order. Statistics are computed from the live sequence on every
//! call. The type has no internal locking and expects a single owner.

mod message;

pub use message::{Message, Role};

use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::fmt;
use uuid::Uuid;

pub const MAX_CONTEXT_MESSAGES: usize = 20;

const WORD_SEPARATORS: [char; 4] = [' ', '\n', '\r', '\t'];

#[derive(Debug, Clone)]
pub struct ConversationContext {
    messages: VecDeque<Message>,
    conversation_id: String,
    created_at: DateTime<Local>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self {
            messages: VecDeque::with_capacity(MAX_CONTEXT_MESSAGES + 1),
            conversation_id: Uuid::new_v4().to_string(),
            created_at: Local::now(),
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn last_message_time(&self) -> Option<DateTime<Local>> {
        self.messages.back().map(Message::created_at)
    }

    /// Appends to the tail, evicting the oldest message once the bound is exceeded.
    pub fn add_message(&mut self, message: Message) {
        self.messages.push_back(message);
        if self.messages.len() > MAX_CONTEXT_MESSAGES {
            self.messages.pop_front();
        }
    }

    /// Owned copy of the whole window, oldest first.
    pub fn context_messages(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    /// Each message as `Role: content` followed by a blank line.
    pub fn formatted_context(&self) -> String {
        let mut out = String::new();
        for message in &self.messages {
            out.push_str(&format!("{}: {}\n\n", message.role(), message.content()));
        }
        out
    }

    /// Drops every message; id and creation time are kept.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn statistics(&self) -> ConversationStats {
        let count_role = |role: Role| self.messages.iter().filter(|m| m.role() == role).count();

        let total_words = self
            .messages
            .iter()
            .map(|m| {
                m.content()
                    .split(WORD_SEPARATORS)
                    .filter(|token| !token.is_empty())
                    .count()
            })
            .sum();

        let duration_minutes = self
            .last_message_time()
            .map(|last| (last - self.created_at).num_milliseconds() as f64 / 60_000.0)
            .unwrap_or(0.0);

        ConversationStats {
            total_messages: self.messages.len(),
            user_messages: count_role(Role::User),
            assistant_messages: count_role(Role::Assistant),
            total_words,
            duration_minutes,
        }
    }
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversationStats {
    pub total_messages: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub total_words: usize,
    pub duration_minutes: f64,
}

impl fmt::Display for ConversationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Conversation Stats:")?;
        writeln!(f, "Total Messages: {}", self.total_messages)?;
        writeln!(f, "User Messages: {}", self.user_messages)?;
        writeln!(f, "Assistant Messages: {}", self.assistant_messages)?;
        writeln!(f, "Total Words: {}", self.total_words)?;
        if self.total_messages == 0 {
            write!(f, "Duration: 0 minutes")
        } else {
            write!(f, "Duration: {:.1} minutes", self.duration_minutes)
        }
    }
}
