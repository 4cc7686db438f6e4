//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::error::ToolError;
use crate::tools::cache::{CacheGetParams, CacheKeysParams, CachePurgeParams, get_impl, keys_impl, purge_impl};
use crate::tools::{ChatAskParams, SiteFetchParams, chat_impl, site_fetch_impl, status_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use shelter_client::{ChatClient, Conversation, FetchClient};
use shelter_core::{AppConfig, CacheDb, Registration};
use tokio::sync::Mutex;

/// The main MCP server handler for shelter.
#[derive(Clone)]
pub struct ShelterServer {
    tool_router: ToolRouter<Self>,
    registration: Arc<Registration>,
    db: CacheDb,
    network: FetchClient,
    chat: Option<ChatClient>,
    conversation: Arc<Mutex<Conversation>>,
    config: Arc<AppConfig>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl ShelterServer {
    /// Create a new server handler.
    pub fn new(
        registration: Arc<Registration>, db: CacheDb, network: FetchClient, chat: Option<ChatClient>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            tool_router: Self::tool_router(),
            registration,
            db,
            network,
            chat,
            conversation: Arc::new(Mutex::new(Conversation::new())),
            config,
        }
    }

    /// Fetch a site resource through the offline gateway.
    ///
    /// Navigations are served network-first and other requests cache-first,
    /// both falling back to the offline document.
    #[tool(
        description = "Fetch a URL or path of the site through the offline gateway. Reports whether the response came from the network, the cache, or the offline fallback."
    )]
    async fn site_fetch(&self, params: Parameters<SiteFetchParams>) -> Result<CallToolResult, McpError> {
        site_fetch_impl(&self.registration, &self.network, &self.config.origin, params.0).await
    }

    #[tool(description = "Show the active and waiting gateway generations and the stores on disk.")]
    async fn gateway_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.registration, &self.db, &self.config.cache_name).await
    }

    /// Retrieve a stored response.
    #[tool(description = "Look up a stored response by URL in a cache store (default: the current store).")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.db, &self.config.origin, &self.config.cache_name, params.0).await
    }

    #[tool(description = "List the entries of a cache store (default: the current store).")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        keys_impl(&self.db, &self.config.cache_name, params.0).await
    }

    /// Delete cache stores.
    ///
    /// With no store names, removes every store but the current one.
    #[tool(description = "Delete the named cache stores, or every store except the current one when none are named.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.db, &self.config.cache_name, params.0).await
    }

    /// Ask the chat assistant.
    ///
    /// Requires `chat_api_url` to be configured. Calls share one running
    /// transcript until `reset` is passed.
    #[tool(
        description = "Continue the conversation with the chat assistant. Returns the answer and its paragraphs; set reset to start over."
    )]
    async fn chat_ask(&self, params: Parameters<ChatAskParams>) -> Result<CallToolResult, McpError> {
        let client = self.chat_client()?;
        let mut conversation = self.conversation.lock().await;
        chat_impl(client, &mut conversation, params.0).await
    }

    fn chat_client(&self) -> Result<&ChatClient, ToolError> {
        self.config.require_chat_api_url()?;
        self.chat
            .as_ref()
            .ok_or_else(|| ToolError::InvalidInput("chat client is not available".into()))
    }
}

impl ServerHandler for ShelterServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "shelter".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
