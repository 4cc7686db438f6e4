//! Scripted in-process network for gateway tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{GatewayConfig, Network};
use crate::Error;
use crate::message::{Request, Response};

enum Route {
    Serve(Response),
    Gated(Response, Arc<Notify>),
    Fail,
}

/// Answers from a route table and counts every call.
#[derive(Default)]
pub(crate) struct ScriptedNetwork {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedNetwork {
    /// A small site matching [`gateway_config`]'s core assets.
    pub(crate) fn with_site() -> Arc<Self> {
        let network = Arc::new(Self::default());
        network.serve("/", "<h1>home</h1>");
        network.serve("/index.html", "<h1>index</h1>");
        network.serve("/offline.html", "<h1>offline</h1>");
        network.serve_response(
            "/a.png",
            Response::new("/a.png", 200, vec![0x89, b'P', b'N', b'G']).with_header("Content-Type", "image/png"),
        );
        network
    }

    pub(crate) fn serve(&self, url: &str, body: &str) {
        let response = Response::new(url, 200, body).with_header("Content-Type", "text/html");
        self.serve_response(url, response);
    }

    pub(crate) fn serve_response(&self, url: &str, response: Response) {
        self.routes.lock().unwrap().insert(url.to_string(), Route::Serve(response));
    }

    /// Serve `url` only once the returned gate is notified.
    pub(crate) fn gate(&self, url: &str, body: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        let response = Response::new(url, 200, body).with_header("Content-Type", "text/html");
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Route::Gated(response, gate.clone()));
        gate
    }

    /// Make `url` fail as if the network were down.
    pub(crate) fn fail(&self, url: &str) {
        self.routes.lock().unwrap().insert(url.to_string(), Route::Fail);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.lock().unwrap().push(request.url.clone());
        let (result, gate) = {
            let routes = self.routes.lock().unwrap();
            match routes.get(&request.url) {
                Some(Route::Serve(response)) => (Ok(response.clone()), None),
                Some(Route::Gated(response, gate)) => (Ok(response.clone()), Some(gate.clone())),
                Some(Route::Fail) => (Err(Error::FetchFailure(format!("{}: connection refused", request.url))), None),
                None => (Err(Error::FetchFailure(format!("{}: no route", request.url))), None),
            }
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        result
    }
}

pub(crate) fn gateway_config(cache_name: &str) -> GatewayConfig {
    GatewayConfig {
        cache_name: cache_name.to_string(),
        core_assets: vec!["/".into(), "/index.html".into(), "/offline.html".into(), "/a.png".into()],
        offline_url: "/offline.html".into(),
        skip_waiting: true,
    }
}
