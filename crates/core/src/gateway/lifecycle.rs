//! Lifecycle phases and the handler interface the event source drives.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::FetchDisposition;
use crate::Error;
use crate::message::Request;

/// Where a generation is in its lifecycle.
///
/// Phases only move forward: `Parsed -> Installing -> Installed ->
/// Activating -> Activated`. A failed install or a superseded generation
/// ends in `Redundant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Parsed => "parsed",
            Phase::Installing => "installing",
            Phase::Installed => "installed",
            Phase::Activating => "activating",
            Phase::Activated => "activated",
            Phase::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

/// The three transition handlers of a gateway generation, plus the
/// bookkeeping an event source needs to schedule them.
#[async_trait]
pub trait LifecycleHandler: Send + Sync {
    /// Generation identifier (the store name).
    fn generation(&self) -> &str;

    /// Whether this generation wants to activate as soon as it is installed.
    fn skips_waiting(&self) -> bool;

    async fn phase(&self) -> Phase;

    /// Populate the store. Failure discards this generation.
    async fn on_install(&self) -> Result<(), Error>;

    /// Prune stale stores and take control of open clients.
    async fn on_activate(&self) -> Result<(), Error>;

    /// Decide how to answer one outgoing request.
    async fn on_fetch(&self, request: Request) -> Result<FetchDisposition, Error>;

    /// Called when the event source drops this generation.
    async fn on_redundant(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display_matches_serde() {
        for phase in [Phase::Parsed, Phase::Installing, Phase::Activated, Phase::Redundant] {
            let json = serde_json::to_string(&phase).unwrap();
            assert_eq!(json, format!("\"{phase}\""));
        }
    }
}
