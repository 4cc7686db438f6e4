//! The hosting side of the lifecycle: registers generations and dispatches
//! install, activate and fetch events to them.
//!
//! A new generation installs while the current one keeps answering
//! requests. It replaces the current one only after its own activation
//! completes. A failed install leaves the current generation in place.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{FetchDisposition, LifecycleHandler, Phase};
use crate::Error;
use crate::message::Request;

/// Generation name and phase, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GenerationStatus {
    pub generation: String,
    pub phase: Phase,
}

/// Snapshot of what the registration currently holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RegistrationStatus {
    pub active: Option<GenerationStatus>,
    pub waiting: Option<GenerationStatus>,
}

/// Event source for gateway generations.
#[derive(Default)]
pub struct Registration {
    active: RwLock<Option<Arc<dyn LifecycleHandler>>>,
    waiting: RwLock<Option<Arc<dyn LifecycleHandler>>>,
}

impl Registration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler`, then activate it or park it as the waiting
    /// generation.
    ///
    /// It activates right away when it skips waiting or nothing is active.
    /// Otherwise it waits until [`Registration::release_clients`].
    ///
    /// # Errors
    ///
    /// Returns the install error (`BootstrapFailure`); the registration is
    /// unchanged in that case.
    pub async fn register(&self, handler: Arc<dyn LifecycleHandler>) -> Result<(), Error> {
        tracing::info!(generation = handler.generation(), "registering");

        if let Err(e) = handler.on_install().await {
            tracing::warn!(
                generation = handler.generation(),
                error = %e,
                "install failed; keeping current generation"
            );
            return Err(e);
        }

        let has_active = self.active.read().await.is_some();
        if handler.skips_waiting() || !has_active {
            let superseded = self.waiting.write().await.take();
            if let Some(previous) = superseded {
                previous.on_redundant().await;
            }
            return self.activate(handler).await;
        }

        tracing::info!(generation = handler.generation(), "installed; waiting for clients to close");
        let superseded = self.waiting.write().await.replace(handler);
        if let Some(previous) = superseded {
            previous.on_redundant().await;
        }
        Ok(())
    }

    /// Every client of the active generation has gone away: promote the
    /// waiting generation, if any.
    pub async fn release_clients(&self) -> Result<(), Error> {
        let waiting = self.waiting.write().await.take();
        match waiting {
            Some(handler) => self.activate(handler).await,
            None => Ok(()),
        }
    }

    async fn activate(&self, handler: Arc<dyn LifecycleHandler>) -> Result<(), Error> {
        handler.on_activate().await?;

        let previous = self.active.write().await.replace(handler);
        if let Some(previous) = previous {
            previous.on_redundant().await;
        }
        Ok(())
    }

    /// Route a request to the active generation. With no active generation
    /// the request passes through.
    pub async fn fetch(&self, request: Request) -> Result<FetchDisposition, Error> {
        let active = self.active.read().await.clone();
        match active {
            Some(handler) => handler.on_fetch(request).await,
            None => Ok(FetchDisposition::PassThrough(request)),
        }
    }

    /// Drop every generation, active and waiting. Returns how many were
    /// dropped. Their stores stay until the next activation prunes them.
    pub async fn unregister_all(&self) -> usize {
        let active = self.active.write().await.take();
        let waiting = self.waiting.write().await.take();

        let mut dropped = 0;
        for handler in [active, waiting].into_iter().flatten() {
            tracing::info!(generation = handler.generation(), "unregistering");
            handler.on_redundant().await;
            dropped += 1;
        }
        dropped
    }

    pub async fn status(&self) -> RegistrationStatus {
        let active = self.active.read().await.clone();
        let waiting = self.waiting.read().await.clone();
        RegistrationStatus { active: describe(active).await, waiting: describe(waiting).await }
    }
}

async fn describe(handler: Option<Arc<dyn LifecycleHandler>>) -> Option<GenerationStatus> {
    match handler {
        Some(h) => Some(GenerationStatus { generation: h.generation().to_string(), phase: h.phase().await }),
        None => None,
    }
}
