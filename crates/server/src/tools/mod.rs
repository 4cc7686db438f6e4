//! MCP tool implementations.
//!
//! This module contains all tools exposed by the shelter server.

pub mod cache;
pub mod chat;
pub mod site_fetch;
pub mod status;

#[cfg(test)]
pub(crate) mod testing;

pub use chat::{ChatAskParams, chat_impl};
pub use site_fetch::{SiteFetchParams, site_fetch_impl};
pub use status::status_impl;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use shelter_core::Error;

/// Serialize `output` as the pretty-printed text content of a successful result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
