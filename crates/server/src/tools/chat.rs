//! chat_ask tool implementation.
//!
//! Continues the server's running conversation with the chat backend and
//! returns the answer split into paragraphs. The transcript lives on the
//! server, so each call only carries the new message.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelter_client::{ChatClient, Conversation, paragraphs};

use super::json_result;
use crate::error::ToolError;

/// Parameters for the chat_ask tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChatAskParams {
    /// The new message.
    pub message: String,

    /// Start a fresh conversation before sending.
    #[serde(default)]
    pub reset: bool,
}

/// Output from the chat_ask tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChatAskOutput {
    pub answer: String,
    pub paragraphs: Vec<String>,
    /// Transcript length after this exchange, greeting included.
    pub turns: usize,
}

/// Implementation of the chat_ask tool.
pub async fn chat_impl(
    client: &ChatClient, conversation: &mut Conversation, params: ChatAskParams,
) -> Result<CallToolResult, McpError> {
    if params.reset {
        *conversation = Conversation::new();
    }

    let sent = conversation
        .send(client, &params.message)
        .await
        .map_err(ToolError::from)?;
    if !sent {
        return Err(ToolError::InvalidInput("message cannot be empty".into()).into());
    }

    let answer = conversation
        .messages()
        .last()
        .map(|m| m.text.clone())
        .unwrap_or_default();
    let output = ChatAskOutput { paragraphs: paragraphs(&answer), answer, turns: conversation.messages().len() };
    json_result(&output)
}
