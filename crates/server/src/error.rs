//! Structured errors for the shelter server tools.
//!
//! Gateway and storage errors convert through `shelter_core::Error`; these
//! cover what only the host can get wrong.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use shelter_client::ChatError;
use shelter_core::ConfigError;

/// Errors raised by tool implementations outside the gateway.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// A tool needs a setting that is not configured.
    #[error("CONFIG_MISSING: {0}")]
    Config(#[from] ConfigError),

    /// The chat backend could not answer.
    #[error("CHAT_FAILED: {0}")]
    Chat(#[from] ChatError),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let code = match &err {
            ToolError::InvalidInput(_) => -32602,
            ToolError::Config(_) => -32030,
            ToolError::Chat(ChatError::Timeout) => -32031,
            ToolError::Chat(_) => -32032,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
