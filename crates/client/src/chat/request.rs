//! Chat request body.

use serde::{Deserialize, Serialize};

/// Speaker of a history turn, as the backend names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One prior turn sent as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

/// POST body: the new message plus every earlier turn.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<HistoryTurn>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let req = ChatRequest {
            message: "which projects use Rust?".into(),
            history: vec![HistoryTurn { role: Role::Assistant, content: "hi".into() }],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "message": "which projects use Rust?",
                "history": [{"role": "assistant", "content": "hi"}]
            })
        );
    }
}
