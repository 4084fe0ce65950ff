use serde::{Deserialize, Serialize};

use crate::ChatError;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            "system" => Some(Role::System),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user<S: Into<String>>(s: S) -> Self {
        Self {
            role: Role::User,
            content: s.into(),
        }
    }
    pub fn assistant<S: Into<String>>(s: S) -> Self {
        Self {
            role: Role::Assistant,
            content: s.into(),
        }
    }
    pub fn system<S: Into<String>>(s: S) -> Self {
        Self {
            role: Role::System,
            content: s.into(),
        }
    }
}

/// A turn as it arrives off the wire, before validation.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Checks an inbound conversation and converts it, keeping turn order.
pub fn validate_conversation(raw: Vec<RawMessage>) -> Result<Vec<Message>, ChatError> {
    if raw.is_empty() {
        return Err(ChatError::InvalidInput("messages must not be empty".into()));
    }
    raw.into_iter()
        .enumerate()
        .map(|(i, m)| {
            let role = match m.role.as_deref() {
                None | Some("") => {
                    return Err(ChatError::InvalidInput(format!(
                        "messages[{i}].role is required"
                    )))
                }
                Some(r) => Role::parse(r).ok_or_else(|| {
                    ChatError::InvalidInput(format!(
                        "messages[{i}].role '{r}' is not one of user, assistant, system"
                    ))
                })?,
            };
            let content = m.content.ok_or_else(|| {
                ChatError::InvalidInput(format!("messages[{i}].content is required"))
            })?;
            Ok(Message { role, content })
        })
        .collect()
}
