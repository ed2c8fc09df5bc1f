//! Wire types shared by the OpenWebUI client and the conversation store.
//!
//! The same `Turn` shape is sent in `messages` and persisted in session
//! history, so a stored conversation can be replayed to the backend verbatim.

use serde::{Deserialize, Serialize};

/// Author of a single message turn.
///
/// Saved history may carry roles this tool never produces; those are kept
/// verbatim in `Other` so they survive a load/save cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
    Other(String),
}

impl From<String> for Role {
    fn from(role: String) -> Self {
        match role.as_str() {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            _ => Role::Other(role),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::User => "user".to_string(),
            Role::Assistant => "assistant".to_string(),
            Role::Other(role) => role,
        }
    }
}

/// One message exchange unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    /// Create a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Body of `POST /api/chat/completions`.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Turn],
}

/// The subset of the completion response we read.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: String,
}

impl ChatResponse {
    /// Content of the first choice, if the backend returned any.
    pub fn first_content(self) -> Option<String> {
        self.choices.into_iter().next().map(|c| c.message.content)
    }
}
