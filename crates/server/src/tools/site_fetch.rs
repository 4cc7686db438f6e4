//! site_fetch tool implementation.
//!
//! Sends a request through the active gateway generation, the way a page
//! under its control would. Requests the gateway passes through go straight
//! to the network.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelter_client::resolve;
use shelter_core::message::NAVIGATION_ACCEPT;
use shelter_core::{Error, FetchDisposition, Network, Registration, Request, Response, ResponseSource};

use super::json_result;

/// Input parameters for site_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SiteFetchParams {
    /// URL or path, resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Send a browser document `Accept` header so the request is treated as
    /// a page navigation.
    #[serde(default)]
    pub navigate: bool,

    /// Optional Accept header override.
    #[serde(default)]
    pub accept: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// A response as returned to the tool caller.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResponseView {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    /// Body as text; absent when it is not valid UTF-8.
    pub body: Option<String>,
    pub body_len: usize,
}

impl From<Response> for ResponseView {
    fn from(response: Response) -> Self {
        let body_len = response.body.len();
        Self {
            url: response.url,
            status: response.status,
            status_text: response.status_text,
            headers: response.headers,
            body: String::from_utf8(response.body).ok(),
            body_len,
        }
    }
}

/// Output structure for site_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SiteFetchOutput {
    /// Where the gateway found the response; absent when it passed the
    /// request through.
    pub source: Option<ResponseSource>,
    pub response: ResponseView,
}

/// Implementation of the site_fetch tool.
pub async fn site_fetch_impl<N: Network>(
    registration: &Registration, network: &N, origin: &str, params: SiteFetchParams,
) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let url = resolve(origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let mut request = Request::new(params.method.to_ascii_uppercase(), url.to_string());
    match (params.accept, params.navigate) {
        (Some(accept), _) => request = request.with_header("Accept", accept),
        (None, true) => request = request.with_header("Accept", NAVIGATION_ACCEPT),
        (None, false) => {}
    }

    let (response, source) = match registration.fetch(request).await? {
        FetchDisposition::Respond { response, source } => (response, Some(source)),
        FetchDisposition::PassThrough(request) => {
            tracing::debug!(method = %request.method, url = %request.url, "passed through");
            (network.fetch(&request).await?, None)
        }
    };

    json_result(&SiteFetchOutput { source, response: response.into() })
}
