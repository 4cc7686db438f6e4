//! cache_purge tool implementation.
//!
//! Deletes whole stores: the named ones, or every store except the
//! configured one.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelter_core::CacheDb;

use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Stores to delete. When empty, every store except the configured one
    /// is deleted.
    #[serde(default)]
    pub stores: Vec<String>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Names of the stores that existed and were deleted.
    pub deleted: Vec<String>,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(db: &CacheDb, current: &str, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    let targets = if params.stores.is_empty() {
        db.store_names()
            .await?
            .into_iter()
            .filter(|name| name != current)
            .collect()
    } else {
        params.stores
    };

    let mut deleted = Vec::new();
    for name in targets {
        if db.delete_store(&name).await? {
            tracing::info!(store = %name, "store purged");
            deleted.push(name);
        }
    }

    json_result(&CachePurgeOutput { deleted })
}
