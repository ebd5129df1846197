//! Planning capability backed by an OpenAI-compatible chat-completions API.

use async_trait::async_trait;
use devdeck_types::{ChatMessage, FunctionDefinition, ServiceId};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

use crate::client::ServiceClient;
use crate::{ServiceEndpoint, ServiceError};

#[async_trait]
pub trait Planner: Send + Sync {
    /// Ask the model for the next message given a transcript and the callable functions.
    async fn complete(&self, messages: &[ChatMessage], functions: &[FunctionDefinition]) -> Result<ChatMessage, ServiceError>;
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ChatMessage,
}

#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    client: ServiceClient,
    model: String,
}

impl ChatCompletionsClient {
    pub fn new(endpoint: &ServiceEndpoint, model: impl Into<String>) -> Result<Self, ServiceError> {
        Ok(Self {
            client: ServiceClient::new(endpoint)?,
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Planner for ChatCompletionsClient {
    async fn complete(&self, messages: &[ChatMessage], functions: &[FunctionDefinition]) -> Result<ChatMessage, ServiceError> {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });
        if !functions.is_empty() {
            body["functions"] = json!(functions);
        }
        let builder = self.client.request(Method::POST, "/v1/chat/completions").json(&body);
        let response: CompletionResponse = self.client.send_typed(builder, "Chat completion failed").await?;
        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| ServiceError::decode(ServiceId::OpenAi, "completion returned no choices"))
    }
}
