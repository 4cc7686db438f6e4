//! gateway_status tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelter_core::{CacheDb, Registration, RegistrationStatus};

use super::json_result;

/// Output from the gateway_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GatewayStatusOutput {
    /// Store name the host was configured with.
    pub cache_name: String,
    /// Active and waiting generations.
    pub registration: RegistrationStatus,
    /// Every store on disk, oldest first.
    pub stores: Vec<String>,
    /// Entry count of the configured store (0 if it does not exist).
    pub entries: u64,
}

/// Implementation of the gateway_status tool.
pub async fn status_impl(
    registration: &Registration, db: &CacheDb, cache_name: &str,
) -> Result<CallToolResult, McpError> {
    let stores = db.store_names().await?;
    let entries = if stores.iter().any(|s| s == cache_name) { db.store_handle(cache_name).len().await? } else { 0 };

    let output = GatewayStatusOutput {
        cache_name: cache_name.to_string(),
        registration: registration.status().await,
        stores,
        entries,
    };
    json_result(&output)
}
