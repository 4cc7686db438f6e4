//! Offline cache gateway.
//!
//! A gateway generation mediates every request a page makes. Its lifecycle
//! is driven from outside through [`LifecycleHandler`]:
//!
//! - **install**: fetch every core asset, then store them all in one
//!   transaction. Any failure aborts the install and nothing is committed.
//! - **activate**: delete every store except the current generation's, then
//!   claim open clients.
//! - **fetch**: non-GET requests pass through. Navigations (`Accept`
//!   contains `text/html`) are network-first; everything else is
//!   cache-first. Both fall back to the offline document.

pub mod lifecycle;
pub mod registration;
mod strategy;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;

pub use lifecycle::{LifecycleHandler, Phase};
pub use registration::{Registration, RegistrationStatus};

use crate::Error;
use crate::cache::{CacheDb, Store};
use crate::message::{Request, Response};

/// Source of live responses.
///
/// Implementations resolve with any HTTP status; only transport failures
/// are errors, reported as [`Error::FetchFailure`].
#[async_trait]
pub trait Network: Send + Sync + 'static {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

#[async_trait]
impl<T: Network + ?Sized> Network for Arc<T> {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        (**self).fetch(request).await
    }
}

/// Per-generation settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Generation identifier and store name.
    pub cache_name: String,
    /// URLs stored at install, in order.
    pub core_assets: Vec<String>,
    /// URL of the offline fallback document; expected among `core_assets`.
    pub offline_url: String,
    /// Activate immediately after install instead of waiting for clients to close.
    pub skip_waiting: bool,
}

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
    Offline,
}

/// Outcome of intercepting one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchDisposition {
    /// The gateway takes no action; the host performs the request itself.
    PassThrough(Request),
    /// The gateway answered.
    Respond { response: Response, source: ResponseSource },
}

/// One gateway generation.
pub struct Gateway<N> {
    db: CacheDb,
    network: N,
    config: GatewayConfig,
    phase: RwLock<Phase>,
    clients_claimed: AtomicBool,
    pending_writes: Mutex<JoinSet<()>>,
}

impl<N: Network> Gateway<N> {
    pub fn new(db: CacheDb, network: N, config: GatewayConfig) -> Self {
        Self {
            db,
            network,
            config,
            phase: RwLock::new(Phase::Parsed),
            clients_claimed: AtomicBool::new(false),
            pending_writes: Mutex::new(JoinSet::new()),
        }
    }

    /// Whether activation has taken control of open clients.
    pub fn has_claimed_clients(&self) -> bool {
        self.clients_claimed.load(Ordering::Acquire)
    }

    /// Handle to this generation's store, re-opened by name.
    pub fn store(&self) -> Store {
        self.db.store_handle(&self.config.cache_name)
    }

    /// Wait for every background cache write started so far.
    ///
    /// The set is taken out under the lock and drained after it is released,
    /// so writes started meanwhile are never held up.
    pub async fn flush(&self) {
        let mut pending = std::mem::take(&mut *self.pending_writes.lock().await);
        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "cache write task did not complete");
            }
        }
    }

    async fn transition(&self, from: Phase, to: Phase) -> Result<(), Error> {
        let mut phase = self.phase.write().await;
        if *phase != from {
            return Err(Error::InvalidState(format!(
                "{}: cannot move to {to} from {}",
                self.config.cache_name, *phase
            )));
        }
        *phase = to;
        Ok(())
    }

    async fn set_phase(&self, to: Phase) {
        *self.phase.write().await = to;
    }

    async fn install(&self) -> Result<(), Error> {
        self.transition(Phase::Parsed, Phase::Installing).await?;

        match self.precache().await {
            Ok(count) => {
                self.set_phase(Phase::Installed).await;
                tracing::info!(cache = %self.config.cache_name, assets = count, "installed");
                Ok(())
            }
            Err(e) => {
                self.set_phase(Phase::Redundant).await;
                tracing::warn!(cache = %self.config.cache_name, error = %e, "install failed");
                Err(e)
            }
        }
    }

    /// Fetch all core assets, then commit them together.
    async fn precache(&self) -> Result<usize, Error> {
        let mut pairs = Vec::with_capacity(self.config.core_assets.len());
        for asset in &self.config.core_assets {
            let request = Request::get(asset);
            let response = self
                .network
                .fetch(&request)
                .await
                .map_err(|e| Error::BootstrapFailure(format!("{asset}: {e}")))?;
            if !response.is_success() {
                return Err(Error::BootstrapFailure(format!("{asset}: status {}", response.status)));
            }
            pairs.push((request, response));
        }

        let count = pairs.len();
        let store = self
            .db
            .open_store(&self.config.cache_name)
            .await
            .map_err(|e| Error::BootstrapFailure(format!("open {}: {e}", self.config.cache_name)))?;
        store
            .put_all(pairs)
            .await
            .map_err(|e| Error::BootstrapFailure(format!("store {}: {e}", self.config.cache_name)))?;
        Ok(count)
    }

    async fn activate(&self) -> Result<(), Error> {
        self.transition(Phase::Installed, Phase::Activating).await?;

        let pruned = self.prune_stale_stores().await;

        if let Err(e) = self.db.open_store(&self.config.cache_name).await {
            tracing::warn!(cache = %self.config.cache_name, error = %e, "could not reopen current store");
        }

        self.clients_claimed.store(true, Ordering::Release);
        self.set_phase(Phase::Activated).await;
        tracing::info!(cache = %self.config.cache_name, pruned, "activated");
        Ok(())
    }

    /// Best-effort delete of every store that is not this generation's.
    async fn prune_stale_stores(&self) -> usize {
        let names = match self.db.store_names().await {
            Ok(names) => names,
            Err(e) => {
                let err = Error::StalePruneFailure(format!("list stores: {e}"));
                tracing::warn!(error = %err, "skipping prune");
                return 0;
            }
        };

        let mut pruned = 0;
        for name in names.into_iter().filter(|name| name != &self.config.cache_name) {
            match self.db.delete_store(&name).await {
                Ok(_) => pruned += 1,
                Err(e) => {
                    let err = Error::StalePruneFailure(format!("{name}: {e}"));
                    tracing::warn!(store = %name, error = %err, "stale store not deleted");
                }
            }
        }
        pruned
    }

    async fn intercept(&self, request: Request) -> Result<FetchDisposition, Error> {
        if !request.is_get() {
            return Ok(FetchDisposition::PassThrough(request));
        }

        if *self.phase.read().await != Phase::Activated {
            tracing::debug!(url = %request.url, "generation not in control, passing through");
            return Ok(FetchDisposition::PassThrough(request));
        }

        let store = self.store();
        let (response, source) = if request.is_navigation() {
            self.network_first(&store, &request).await?
        } else {
            self.cache_first(&store, &request).await?
        };

        tracing::debug!(url = %request.url, status = response.status, ?source, "answered");
        Ok(FetchDisposition::Respond { response, source })
    }

    /// Store a copy of `response` in the background.
    async fn cache_copy(&self, store: &Store, request: &Request, response: &Response) {
        if *self.phase.read().await == Phase::Redundant {
            tracing::debug!(url = %request.url, "generation retired, response not cached");
            return;
        }

        let store = store.clone();
        let request = request.clone();
        let response = response.clone();

        let mut pending = self.pending_writes.lock().await;
        while let Some(done) = pending.try_join_next() {
            if let Err(e) = done {
                tracing::warn!(error = %e, "cache write task did not complete");
            }
        }
        pending.spawn(async move {
            if let Err(e) = store.put(&request, &response).await {
                let err = Error::CacheWriteFailure(e.to_string());
                tracing::warn!(url = %request.url, error = %err, "response not cached");
            }
        });
    }
}

#[async_trait]
impl<N: Network> LifecycleHandler for Gateway<N> {
    fn generation(&self) -> &str {
        &self.config.cache_name
    }

    fn skips_waiting(&self) -> bool {
        self.config.skip_waiting
    }

    async fn phase(&self) -> Phase {
        *self.phase.read().await
    }

    async fn on_install(&self) -> Result<(), Error> {
        self.install().await
    }

    async fn on_activate(&self) -> Result<(), Error> {
        self.activate().await
    }

    async fn on_fetch(&self, request: Request) -> Result<FetchDisposition, Error> {
        self.intercept(request).await
    }

    async fn on_redundant(&self) {
        self.flush().await;
        self.clients_claimed.store(false, Ordering::Release);
        self.set_phase(Phase::Redundant).await;
        tracing::info!(cache = %self.config.cache_name, "generation retired");
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{ScriptedNetwork, gateway_config};
    use super::*;

    async fn activated(db: &CacheDb, network: Arc<ScriptedNetwork>) -> Gateway<Arc<ScriptedNetwork>> {
        let gateway = Gateway::new(db.clone(), network, gateway_config("v1"));
        gateway.on_install().await.unwrap();
        gateway.on_activate().await.unwrap();
        gateway
    }

    fn respond(disposition: FetchDisposition) -> (Response, ResponseSource) {
        match disposition {
            FetchDisposition::Respond { response, source } => (response, source),
            FetchDisposition::PassThrough(req) => panic!("expected a response for {}", req.url),
        }
    }

    #[tokio::test]
    async fn test_install_populates_core_assets() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = ScriptedNetwork::with_site();
        let gateway = Gateway::new(db.clone(), network.clone(), gateway_config("v1"));

        gateway.on_install().await.unwrap();

        assert_eq!(gateway.phase().await, Phase::Installed);
        let store = db.store_handle("v1");
        for asset in ["/", "/index.html", "/offline.html", "/a.png"] {
            assert!(store.match_request(&Request::get(asset)).await.unwrap().is_some(), "{asset} missing");
        }
    }

    #[tokio::test]
    async fn test_install_failure_commits_nothing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = ScriptedNetwork::with_site();
        network.fail("/a.png");
        let gateway = Gateway::new(db.clone(), network, gateway_config("v1"));

        let err = gateway.on_install().await.unwrap_err();

        assert!(matches!(err, Error::BootstrapFailure(ref msg) if msg.contains("/a.png")));
        assert_eq!(gateway.phase().await, Phase::Redundant);
        assert!(!db.has_store("v1").await.unwrap());
        assert_eq!(db.store_handle("v1").len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_install_rejects_error_status() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = ScriptedNetwork::with_site();
        network.serve_response("/index.html", Response::new("/index.html", 404, "not found"));
        let gateway = Gateway::new(db.clone(), network, gateway_config("v1"));

        let err = gateway.on_install().await.unwrap_err();
        assert!(matches!(err, Error::BootstrapFailure(ref msg) if msg.contains("404")));
        assert!(!db.has_store("v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_install_twice_is_invalid() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let gateway = Gateway::new(db, ScriptedNetwork::with_site(), gateway_config("v1"));
        gateway.on_install().await.unwrap();
        assert!(matches!(gateway.on_install().await, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_activate_requires_install() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let gateway = Gateway::new(db, ScriptedNetwork::with_site(), gateway_config("v1"));
        assert!(matches!(gateway.on_activate().await, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_activate_prunes_stale_generations() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let v0 = db.open_store("v0").await.unwrap();
        v0.put(&Request::get("/"), &Response::new("/", 200, "old")).await.unwrap();
        db.open_store("legacy-cache").await.unwrap();

        let gateway = activated(&db, ScriptedNetwork::with_site()).await;

        assert_eq!(db.store_names().await.unwrap(), vec!["v1".to_string()]);
        assert_eq!(gateway.phase().await, Phase::Activated);
        assert!(gateway.has_claimed_clients());
    }

    #[tokio::test]
    async fn test_non_get_passes_through_without_store_access() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = ScriptedNetwork::with_site();
        let gateway = activated(&db, network.clone()).await;
        let before = gateway.store().keys().await.unwrap();
        let calls = network.calls();

        let post = Request::new("POST", "/api/chat").with_header("Accept", "text/html");
        let disposition = gateway.on_fetch(post.clone()).await.unwrap();

        assert_eq!(disposition, FetchDisposition::PassThrough(post));
        assert_eq!(network.calls(), calls);
        gateway.flush().await;
        assert_eq!(gateway.store().keys().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_fetch_before_activation_passes_through() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let gateway = Gateway::new(db, ScriptedNetwork::with_site(), gateway_config("v1"));
        gateway.on_install().await.unwrap();

        let req = Request::get("/a.png");
        assert_eq!(gateway.on_fetch(req.clone()).await.unwrap(), FetchDisposition::PassThrough(req));
    }

    #[tokio::test]
    async fn test_navigation_network_first_caches_live_response() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = ScriptedNetwork::with_site();
        let gateway = activated(&db, network.clone()).await;
        network.serve("/about", "<h1>about v2</h1>");

        let (response, source) = respond(gateway.on_fetch(Request::navigation("/about")).await.unwrap());
        assert_eq!(source, ResponseSource::Network);
        assert_eq!(response.text(), "<h1>about v2</h1>");

        gateway.flush().await;
        let cached = gateway.store().match_request(&Request::get("/about")).await.unwrap().unwrap();
        assert_eq!(cached.text(), "<h1>about v2</h1>");
    }

    #[tokio::test]
    async fn test_navigation_refreshes_stale_cache() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = ScriptedNetwork::with_site();
        let gateway = activated(&db, network.clone()).await;
        network.serve("/index.html", "<h1>fresh</h1>");

        let (response, source) = respond(gateway.on_fetch(Request::navigation("/index.html")).await.unwrap());
        assert_eq!(source, ResponseSource::Network);
        assert_eq!(response.text(), "<h1>fresh</h1>");
    }

    #[tokio::test]
    async fn test_navigation_offline_returns_cached_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = ScriptedNetwork::with_site();
        let gateway = activated(&db, network.clone()).await;
        network.fail("/index.html");

        let (response, source) = respond(gateway.on_fetch(Request::navigation("/index.html")).await.unwrap());
        assert_eq!(source, ResponseSource::Cache);
        assert_eq!(response.text(), "<h1>index</h1>");
    }

    #[tokio::test]
    async fn test_navigation_offline_without_entry_returns_offline_document() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = ScriptedNetwork::with_site();
        let gateway = activated(&db, network.clone()).await;
        network.fail("/projects");

        let (response, source) = respond(gateway.on_fetch(Request::navigation("/projects")).await.unwrap());
        assert_eq!(source, ResponseSource::Offline);
        assert_eq!(response.text(), "<h1>offline</h1>");
    }

    #[tokio::test]
    async fn test_asset_cache_hit_skips_network() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = ScriptedNetwork::with_site();
        let gateway = activated(&db, network.clone()).await;
        let calls = network.calls();

        let (response, source) = respond(gateway.on_fetch(Request::get("/a.png")).await.unwrap());

        assert_eq!(source, ResponseSource::Cache);
        assert_eq!(response.body, vec![0x89, b'P', b'N', b'G']);
        assert_eq!(network.calls(), calls);
    }

    #[tokio::test]
    async fn test_asset_miss_fetches_and_caches() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = ScriptedNetwork::with_site();
        let gateway = activated(&db, network.clone()).await;
        network.serve_response(
            "/report.json",
            Response::new("/report.json", 200, r#"{"ok":true}"#).with_header("Content-Type", "application/json"),
        );

        let req = Request::get("/report.json").with_header("Accept", "application/json");
        let (response, source) = respond(gateway.on_fetch(req).await.unwrap());
        assert_eq!(source, ResponseSource::Network);
        assert_eq!(response.text(), r#"{"ok":true}"#);

        gateway.flush().await;
        let urls: Vec<String> = gateway.store().keys().await.unwrap().into_iter().map(|k| k.url).collect();
        assert!(urls.contains(&"/report.json".to_string()));

        let again = network.calls_for("/report.json");
        let (_, source) = respond(gateway.on_fetch(Request::get("/report.json")).await.unwrap());
        assert_eq!(source, ResponseSource::Cache);
        assert_eq!(network.calls_for("/report.json"), again);
    }

    #[tokio::test]
    async fn test_asset_miss_offline_returns_offline_document() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = ScriptedNetwork::with_site();
        let gateway = activated(&db, network.clone()).await;
        network.fail("/b.png");

        let (response, source) = respond(gateway.on_fetch(Request::get("/b.png")).await.unwrap());
        assert_eq!(source, ResponseSource::Offline);
        assert_eq!(response.text(), "<h1>offline</h1>");
    }

    #[tokio::test]
    async fn test_no_cache_no_network_no_fallback_fails() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = ScriptedNetwork::with_site();
        let gateway = activated(&db, network.clone()).await;
        gateway.store().delete(&Request::get("/offline.html")).await.unwrap();
        network.fail("/projects");

        let err = gateway.on_fetch(Request::navigation("/projects")).await.unwrap_err();
        assert!(matches!(err, Error::FetchFailure(_)));
    }

    #[tokio::test]
    async fn test_cache_write_failure_keeps_live_response() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = ScriptedNetwork::with_site();
        let gateway = activated(&db, network.clone()).await;
        network.serve("/c.css", "body{}");
        db.conn
            .call(|conn| conn.execute_batch("DROP TABLE entries"))
            .await
            .unwrap();

        let (response, source) = respond(gateway.on_fetch(Request::get("/c.css")).await.unwrap());
        gateway.flush().await;

        assert_eq!(source, ResponseSource::Network);
        assert_eq!(response.text(), "body{}");
    }

    #[tokio::test]
    async fn test_redundant_generation_stops_intercepting() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let gateway = activated(&db, ScriptedNetwork::with_site()).await;

        gateway.on_redundant().await;

        assert_eq!(gateway.phase().await, Phase::Redundant);
        assert!(!gateway.has_claimed_clients());
        let req = Request::get("/a.png");
        assert_eq!(gateway.on_fetch(req.clone()).await.unwrap(), FetchDisposition::PassThrough(req));
    }

    #[tokio::test]
    async fn test_retired_generation_does_not_cache_in_flight_response() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = ScriptedNetwork::with_site();
        let gateway = Arc::new(activated(&db, network.clone()).await);
        let gate = network.gate("/late", "<h1>late</h1>");

        let in_flight = {
            let gateway = gateway.clone();
            tokio::spawn(async move { gateway.on_fetch(Request::navigation("/late")).await })
        };
        while network.calls_for("/late") == 0 {
            tokio::task::yield_now().await;
        }
        gateway.on_redundant().await;
        gate.notify_one();

        let (response, source) = respond(in_flight.await.unwrap().unwrap());
        assert_eq!(source, ResponseSource::Network);
        assert_eq!(response.text(), "<h1>late</h1>");

        gateway.flush().await;
        assert!(gateway.store().match_request(&Request::get("/late")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_flush_does_not_hold_up_new_writes() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = ScriptedNetwork::with_site();
        let gateway = Arc::new(activated(&db, network.clone()).await);
        network.serve("/c.css", "body{}");

        let slow_write = Arc::new(tokio::sync::Notify::new());
        {
            let slow_write = slow_write.clone();
            gateway
                .pending_writes
                .lock()
                .await
                .spawn(async move { slow_write.notified().await });
        }
        let flushing = {
            let gateway = gateway.clone();
            tokio::spawn(async move { gateway.flush().await })
        };
        tokio::task::yield_now().await;

        let answered =
            tokio::time::timeout(std::time::Duration::from_secs(5), gateway.on_fetch(Request::get("/c.css"))).await;
        assert!(answered.is_ok(), "fetch waited on flush");

        slow_write.notify_one();
        flushing.await.unwrap();
        gateway.flush().await;
        assert!(gateway.store().match_request(&Request::get("/c.css")).await.unwrap().is_some());
    }
}
