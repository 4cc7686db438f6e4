//! Chat assistant client.
//!
//! Posts the new message and the prior transcript to a remote endpoint and
//! returns its answer. What the assistant says is entirely up to the
//! backend; this module only moves the conversation over HTTP and keeps the
//! transcript consistent when the backend misbehaves.
//!
//! ### Wire format
//!
//! - **Request**: `POST` JSON `{"message": ..., "history": [{"role", "content"}]}`
//! - **Response**: JSON `{"answer"?, "error"?}`. A non-2xx status or an
//!   `error` field is a backend error; a missing `answer` yields a fixed
//!   reply rather than an error.

pub mod error;
pub mod request;
pub mod response;

pub use error::ChatError;
pub use request::{ChatRequest, HistoryTurn, Role};
pub use response::{ApiResponse, paragraphs};

use reqwest::header;
use std::time::{Duration, Instant};

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "shelter/0.1";

/// First assistant turn of every conversation.
pub const GREETING: &str =
    "Hi, I'm the portfolio assistant. Ask me which projects and skills are worth a look for your role.";

/// Error text when the backend fails without saying why.
pub const BACKEND_TROUBLE: &str = "The assistant had trouble reaching the model. Try again or check the API config.";

/// Reply when the backend answered but no answer could be read.
pub const UNPARSED_REPLY: &str =
    "I couldn't parse a response, but every section of the site is still available while this is checked.";

/// Transcript reply after a backend error.
pub const BACKEND_FALLBACK_REPLY: &str =
    "I'm having some trouble talking to my backend right now, but the portfolio is fully browsable.";

/// Transcript reply after a network failure.
pub const UNREACHABLE_FALLBACK_REPLY: &str =
    "Looks like the assistant API isn't reachable from here. Try again once the connection is back.";

/// Chat client configuration.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Endpoint receiving the POST.
    pub api_url: String,
    /// Request timeout (default: 30s).
    pub timeout: Duration,
    /// User-agent string (default: shelter/0.x).
    pub user_agent: String,
}

impl ChatConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self { api_url: api_url.into(), timeout: DEFAULT_TIMEOUT, user_agent: DEFAULT_USER_AGENT.to_string() }
    }
}

/// HTTP client for the chat backend.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    config: ChatConfig,
}

impl ChatClient {
    /// Create a new chat client with the given configuration.
    pub fn new(config: ChatConfig) -> Result<Self, ChatError> {
        if config.api_url.trim().is_empty() {
            return Err(ChatError::MissingEndpoint);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(ChatError::from)?;

        Ok(Self { http, config })
    }

    /// Send `message` with `history` and return the answer text.
    pub async fn ask(&self, message: &str, history: &[HistoryTurn]) -> Result<String, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let start = Instant::now();
        let body = ChatRequest { message: message.to_string(), history: history.to_vec() };

        let http_response = self
            .http
            .post(&self.config.api_url)
            .header(header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = http_response.status();
        let bytes = http_response.bytes().await?;
        let data = ApiResponse::parse(&bytes);

        tracing::debug!(status = status.as_u16(), elapsed_ms = start.elapsed().as_millis() as u64, "chat reply");

        if !status.is_success() || data.error.is_some() {
            let reason = data.error.unwrap_or_else(|| BACKEND_TROUBLE.to_string());
            return Err(ChatError::Backend(reason));
        }

        Ok(data
            .answer
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| UNPARSED_REPLY.to_string()))
    }
}

/// Who wrote a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    User,
    Assistant,
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub author: Author,
    pub text: String,
}

impl ChatMessage {
    fn turn(&self) -> HistoryTurn {
        let role = match self.author {
            Author::User => Role::User,
            Author::Assistant => Role::Assistant,
        };
        HistoryTurn { role, content: self.text.clone() }
    }
}

/// A running conversation that always ends with an assistant turn after
/// each send, even when the backend fails.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self { messages: vec![ChatMessage { author: Author::Assistant, text: GREETING.to_string() }] }
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Send `input` through `client`.
    ///
    /// Blank input is ignored and returns `Ok(false)`. Otherwise the user turn
    /// is appended, followed by the answer or a fallback reply. Errors are
    /// returned after the fallback reply has been appended.
    pub async fn send(&mut self, client: &ChatClient, input: &str) -> Result<bool, ChatError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(false);
        }

        let history: Vec<HistoryTurn> = self.messages.iter().map(ChatMessage::turn).collect();
        self.messages.push(ChatMessage { author: Author::User, text: trimmed.to_string() });

        match client.ask(trimmed, &history).await {
            Ok(answer) => {
                self.messages.push(ChatMessage { author: Author::Assistant, text: answer });
                Ok(true)
            }
            Err(e) => {
                let fallback = match e {
                    ChatError::Backend(_) => BACKEND_FALLBACK_REPLY,
                    _ => UNREACHABLE_FALLBACK_REPLY,
                };
                tracing::warn!(error = %e, "chat request failed");
                self.messages.push(ChatMessage { author: Author::Assistant, text: fallback.to_string() });
                Err(e)
            }
        }
    }
}
