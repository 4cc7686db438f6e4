//! cache_get tool implementation.
//!
//! Retrieves a stored response by request URL.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelter_client::resolve;
use shelter_core::{CacheDb, Error, Request};

use crate::tools::json_result;
use crate::tools::site_fetch::ResponseView;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// URL or path of the stored request, resolved against the origin.
    pub url: String,

    /// Store to read (default: the configured store).
    #[serde(default)]
    pub store: Option<String>,

    /// Method of the stored request (default: GET).
    #[serde(default)]
    pub method: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub store: String,
    pub response: ResponseView,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(
    db: &CacheDb, origin: &str, default_store: &str, params: CacheGetParams,
) -> Result<CallToolResult, McpError> {
    let store_name = params.store.unwrap_or_else(|| default_store.to_string());
    if !db.has_store(&store_name).await? {
        return Err(Error::CacheMiss(format!("no store named {store_name}")).into());
    }

    let url = resolve(origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let method = params.method.unwrap_or_else(|| "GET".into());
    let request = Request::new(method.to_ascii_uppercase(), url.to_string());

    let response = db
        .store_handle(&store_name)
        .match_request(&request)
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{} {} in {store_name}", request.method, request.url)))?;

    json_result(&CacheGetOutput { store: store_name, response: response.into() })
}
