//! Core types and shared functionality for shelter.
//!
//! This crate provides:
//! - The offline cache gateway and its lifecycle event source
//! - Named cache stores with SQLite backend
//! - Request/response snapshots
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod message;

pub use cache::{CacheDb, EntrySummary, Store};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use gateway::{
    FetchDisposition, Gateway, GatewayConfig, LifecycleHandler, Network, Phase, Registration, RegistrationStatus,
    ResponseSource,
};
pub use message::{Request, Response};
