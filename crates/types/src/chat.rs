//! Chat transcript types exchanged with the planning service.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Message author. Roles this crate does not act on are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Function,
    Other(String),
}

impl ChatRole {
    pub fn as_str(&self) -> &str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Function => "function",
            Self::Other(role) => role,
        }
    }
}

impl From<String> for ChatRole {
    fn from(role: String) -> Self {
        match role.as_str() {
            "system" => Self::System,
            "user" => Self::User,
            "assistant" => Self::Assistant,
            "function" => Self::Function,
            _ => Self::Other(role),
        }
    }
}

impl From<ChatRole> for String {
    fn from(role: ChatRole) -> Self {
        match role {
            ChatRole::Other(role) => role,
            known => known.as_str().to_string(),
        }
    }
}

/// Function call proposed by the planning service. `arguments` is a JSON document
/// encoded as a string and is only parsed by the planning adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// Role-tagged chat message.
///
/// Only `function_call` is interpreted. `content` is kept as raw JSON (a string,
/// null or an array of parts) and any other field lands in `extra`, so messages
/// travel between the caller and the planning service unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    #[serde(default)]
    pub content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatMessage {
    fn new(role: ChatRole, content: Value) -> Self {
        Self {
            role,
            content,
            name: None,
            function_call: None,
            extra: Map::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, Value::String(content.into()))
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, Value::String(content.into()))
    }

    /// Assistant message proposing a function call, with null content.
    pub fn assistant_call(call: FunctionCall) -> Self {
        Self {
            function_call: Some(call),
            ..Self::new(ChatRole::Assistant, Value::Null)
        }
    }

    /// Function-result entry carrying the serialized outcome of a proposed call.
    pub fn function_result(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(ChatRole::Function, Value::String(content.into()))
        }
    }

    /// Text content, when the content is a plain string.
    pub fn text(&self) -> Option<&str> {
        self.content.as_str()
    }
}

/// Function offered to the planning service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the argument object.
    pub parameters: Value,
}
