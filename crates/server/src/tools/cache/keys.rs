//! cache_keys tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelter_core::{CacheDb, EntrySummary, Error};

use crate::tools::json_result;

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// Store to list (default: the configured store).
    #[serde(default)]
    pub store: Option<String>,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    pub store: String,
    /// Stored entries ordered by URL.
    pub entries: Vec<EntrySummary>,
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(db: &CacheDb, default_store: &str, params: CacheKeysParams) -> Result<CallToolResult, McpError> {
    let store_name = params.store.unwrap_or_else(|| default_store.to_string());
    if !db.has_store(&store_name).await? {
        return Err(Error::CacheMiss(format!("no store named {store_name}")).into());
    }

    let entries = db.store_handle(&store_name).keys().await?;
    json_result(&CacheKeysOutput { store: store_name, entries })
}
