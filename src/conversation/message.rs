use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Wire name used in chat-completion payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Assistant => write!(f, "Assistant"),
        }
    }
}

/// A single conversation turn. Fields are fixed once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    content: String,
    role: Role,
    created_at: DateTime<Local>,
}

impl Message {
    pub fn new(content: impl Into<String>, role: Role) -> Self {
        Self::with_timestamp(content, role, Local::now())
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(content, Role::User)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(content, Role::Assistant)
    }

    pub(crate) fn with_timestamp(
        content: impl Into<String>,
        role: Role,
        created_at: DateTime<Local>,
    ) -> Self {
        Self {
            content: content.into(),
            role,
            created_at,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.created_at.format("%H:%M:%S"),
            self.role,
            self.content
        )
    }
}
