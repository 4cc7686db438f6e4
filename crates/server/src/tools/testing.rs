//! In-process site and result helpers for tool tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rmcp::model::CallToolResult;
use serde::de::DeserializeOwned;
use shelter_core::{CacheDb, Error, Gateway, GatewayConfig, Network, Registration, Request, Response};

pub(crate) const ORIGIN: &str = "https://site.test";

/// Serves a fixed set of absolute URLs; anything else fails like a dropped
/// connection.
#[derive(Default)]
pub(crate) struct StubSite {
    pages: Mutex<HashMap<String, Response>>,
    calls: Mutex<Vec<String>>,
}

impl StubSite {
    pub(crate) fn new() -> Arc<Self> {
        let site = Arc::new(Self::default());
        site.serve("/", "text/html", "<h1>home</h1>");
        site.serve("/offline.html", "text/html", "<h1>offline</h1>");
        site.serve("/a.png", "image/png", "PNG");
        site
    }

    pub(crate) fn serve(&self, path: &str, content_type: &str, body: &str) {
        let url = format!("{ORIGIN}{path}");
        let response = Response::new(url.clone(), 200, body).with_header("Content-Type", content_type);
        self.pages.lock().unwrap().insert(url, response);
    }

    pub(crate) fn take_down(&self) {
        self.pages.lock().unwrap().clear();
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Network for StubSite {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.lock().unwrap().push(request.url.clone());
        let pages = self.pages.lock().unwrap();
        let found = pages.get(&request.url).cloned();
        drop(pages);
        found.ok_or_else(|| Error::FetchFailure(format!("{}: connection reset", request.url)))
    }
}

pub(crate) fn site_config(cache_name: &str) -> GatewayConfig {
    GatewayConfig {
        cache_name: cache_name.to_string(),
        core_assets: ["/", "/offline.html", "/a.png"].iter().map(|p| format!("{ORIGIN}{p}")).collect(),
        offline_url: format!("{ORIGIN}/offline.html"),
        skip_waiting: true,
    }
}

/// An in-memory database with generation `v1` installed and active.
pub(crate) async fn activated(site: &Arc<StubSite>) -> (CacheDb, Registration, Arc<Gateway<Arc<StubSite>>>) {
    let db = CacheDb::open_in_memory().await.unwrap();
    let registration = Registration::new();
    let gateway = Arc::new(Gateway::new(db.clone(), site.clone(), site_config("v1")));
    registration.register(gateway.clone()).await.unwrap();
    (db, registration, gateway)
}

/// Decode the JSON text content of a successful tool result.
pub(crate) fn output<T: DeserializeOwned>(result: &CallToolResult) -> T {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    let text = content
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
