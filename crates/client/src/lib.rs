//! Client code for shelter.
//!
//! This crate provides the live HTTP network behind the gateway, URL
//! resolution against the site origin, and the chat assistant client.

pub mod chat;
pub mod fetch;

pub use chat::{
    Author, ChatClient, ChatConfig, ChatError, ChatMessage, Conversation, HistoryTurn, Role, paragraphs,
};

pub use fetch::{FetchClient, FetchConfig, UrlError, canonicalize, resolve};
