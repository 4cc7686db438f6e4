//! Chat response parsing and reply formatting.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

/// Raw backend response. Every field is optional; a body that is not JSON
/// parses as the empty response.
#[derive(Debug, Default, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn parse(bytes: &[u8]) -> Self {
        serde_json::from_slice(bytes).unwrap_or_default()
    }
}

static PARAGRAPH_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{2,}").expect("valid regex"));

/// Split a reply into paragraphs on blank lines.
///
/// Single newlines stay inside a paragraph as soft breaks.
pub fn paragraphs(text: &str) -> Vec<String> {
    PARAGRAPH_BREAK
        .split(text.trim())
        .map(|p| p.trim().to_string())
        .collect()
}
