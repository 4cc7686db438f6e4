//! SQLite-backed set of named cache stores.
//!
//! Each gateway generation owns one store, named by its generation
//! identifier. Entries are response snapshots keyed by a SHA-256 request
//! descriptor. Stores are only ever pruned whole.

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::EntrySummary;
pub use stores::Store;
