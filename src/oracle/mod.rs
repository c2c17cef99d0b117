//! Oracle trait and wire types
//!
//! The oracle is the external language-model backend. History turns and
//! content parts use the Gemini wire shape directly so the model-facing
//! history can be replayed verbatim on every request.

use crate::error::Result;
use crate::tools::FunctionDeclaration;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

pub mod gemini;
pub use gemini::GeminiOracle;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

/// One content part. A part carries text, a tool invocation, or a tool
/// result; the oracle may mix them freely within a turn.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn function_call(name: impl Into<String>, args: Value) -> Self {
        Self {
            function_call: Some(FunctionCall {
                name: name.into(),
                args,
            }),
            ..Default::default()
        }
    }

    pub fn function_response(name: impl Into<String>, response: Value) -> Self {
        Self {
            function_response: Some(FunctionResponse {
                name: name.into(),
                response,
            }),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

/// One turn of the model-facing history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub parts: Vec<Part>,
}

impl Turn {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: TurnRole::User,
            parts,
        }
    }

    pub fn model(parts: Vec<Part>) -> Self {
        Self {
            role: TurnRole::Model,
            parts,
        }
    }
}

/// External language-model backend contract.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// One request/response round: full turn history, system instruction,
    /// and the tool schema. Returns the model's raw content parts.
    async fn generate(
        &self,
        history: &[Turn],
        system_instruction: &str,
        tools: &[FunctionDeclaration],
    ) -> Result<Vec<Part>>;

    /// Short (≤ 4 words) title for a conversation seeded by `message`.
    async fn generate_title(&self, message: &str) -> Result<String>;

    /// One-word category suggestion for a transaction title.
    async fn suggest_category(&self, title: &str) -> Result<String>;

    /// Monthly budget limit suggestion from past expense amounts.
    async fn suggest_budget_amount(&self, category: &str, amounts: &[f64]) -> Result<f64>;
}

//
// ================= Mock Oracle =================
//

/// Scripted reply for the mock oracle.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Parts(Vec<Part>),
    Failure(String),
}

/// Mock oracle for development & testing. Replays scripted replies in
/// order and records the history length of every `generate` request.
#[derive(Default)]
pub struct MockOracle {
    replies: Mutex<VecDeque<ScriptedReply>>,
    request_history_lens: Mutex<Vec<usize>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            request_history_lens: Mutex::new(Vec::new()),
        }
    }

    pub fn push_reply(&self, reply: ScriptedReply) {
        self.replies
            .lock()
            .expect("mock replies lock poisoned")
            .push_back(reply);
    }

    /// History lengths observed so far, one entry per `generate` call.
    pub fn request_history_lens(&self) -> Vec<usize> {
        self.request_history_lens
            .lock()
            .expect("mock request log lock poisoned")
            .clone()
    }
}

#[async_trait]
impl Oracle for MockOracle {
    async fn generate(
        &self,
        history: &[Turn],
        _system_instruction: &str,
        _tools: &[FunctionDeclaration],
    ) -> Result<Vec<Part>> {
        self.request_history_lens
            .lock()
            .expect("mock request log lock poisoned")
            .push(history.len());

        let next = self
            .replies
            .lock()
            .expect("mock replies lock poisoned")
            .pop_front();

        match next {
            Some(ScriptedReply::Parts(parts)) => Ok(parts),
            Some(ScriptedReply::Failure(message)) => {
                Err(crate::error::AssistantError::LlmError(message))
            }
            None => Ok(vec![Part::text("Done.")]),
        }
    }

    async fn generate_title(&self, _message: &str) -> Result<String> {
        Ok("Test Chat".to_string())
    }

    async fn suggest_category(&self, _title: &str) -> Result<String> {
        Ok("General".to_string())
    }

    async fn suggest_budget_amount(&self, _category: &str, amounts: &[f64]) -> Result<f64> {
        if amounts.is_empty() {
            Ok(100.0)
        } else {
            Ok(amounts.iter().sum::<f64>() / amounts.len() as f64)
        }
    }
}
