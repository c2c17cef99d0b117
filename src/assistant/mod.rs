//! Turn orchestrator
//!
//! Drives one user submission through the oracle round loop: send the
//! model-facing history plus a fresh context snapshot, split the reply
//! into visible text and tool calls, execute the calls against the
//! ledger, feed the results back, and repeat until the oracle stops
//! requesting tools or the round cap is hit.

use crate::context::{build_system_instruction, ContextSnapshot};
use crate::error::{AssistantError, Result};
use crate::ledger::Ledger;
use crate::models::{ChatMessage, ChatRole};
use crate::oracle::{Oracle, Part, Turn};
use crate::sessions::SessionStore;
use crate::tools::{advisor_tools, ToolExecutor};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Hard cap on chained tool-calling rounds per user submission. A
/// misbehaving oracle must not loop forever.
pub const MAX_TOOL_ROUNDS: u32 = 5;

const ORACLE_FAILURE_MESSAGE: &str = "I encountered an error. Please try again.";
const MAX_ROUNDS_MESSAGE: &str =
    "I couldn't finish that request because it needed too many tool steps. Please try again.";

pub struct Assistant {
    oracle: Arc<dyn Oracle>,
    ledger: Arc<RwLock<Ledger>>,
    sessions: Arc<RwLock<SessionStore>>,
    /// Model-facing history. Carries tool calls and results the visible
    /// transcript never shows; reset on every session switch.
    api_history: Vec<Turn>,
    busy: bool,
}

impl Assistant {
    pub fn new(
        oracle: Arc<dyn Oracle>,
        ledger: Arc<RwLock<Ledger>>,
        sessions: Arc<RwLock<SessionStore>>,
    ) -> Self {
        Self {
            oracle,
            ledger,
            sessions,
            api_history: Vec::new(),
            busy: false,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn ledger(&self) -> Arc<RwLock<Ledger>> {
        Arc::clone(&self.ledger)
    }

    pub fn sessions(&self) -> Arc<RwLock<SessionStore>> {
        Arc::clone(&self.sessions)
    }

    /// The raw model-facing history since the last session switch.
    pub fn model_history(&self) -> &[Turn] {
        &self.api_history
    }

    //
    // ================= Session Management =================
    //

    pub async fn create_session(&mut self) -> Uuid {
        let id = self.sessions.write().await.create_session();
        self.api_history.clear();
        id
    }

    pub async fn select_session(&mut self, id: Uuid) {
        let mut sessions = self.sessions.write().await;
        let previous = sessions.current_id();
        sessions.select_session(id);
        if sessions.current_id() != previous {
            self.api_history.clear();
        }
    }

    pub async fn rename_session(&mut self, id: Uuid, title: String) {
        self.sessions.write().await.rename_session(id, title);
    }

    pub async fn delete_session(&mut self, id: Uuid) {
        let mut sessions = self.sessions.write().await;
        let previous = sessions.current_id();
        sessions.delete_session(id);
        if sessions.current_id() != previous {
            self.api_history.clear();
        }
    }

    /// Visible transcript of the current session.
    pub async fn visible_history(&self) -> Vec<ChatMessage> {
        self.sessions
            .read()
            .await
            .current_session()
            .map(|s| s.messages.clone())
            .unwrap_or_default()
    }

    //
    // ================= Turn Loop =================
    //

    /// Process one user submission to completion. Oracle failures are
    /// absorbed into a fallback message; the only error surfaced to the
    /// caller is `Busy`.
    pub async fn submit(&mut self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        if self.busy {
            return Err(AssistantError::Busy);
        }

        self.busy = true;
        let result = self.run_turn(text).await;
        self.busy = false;
        result
    }

    async fn run_turn(&mut self, text: &str) -> Result<()> {
        // Visible transcript first, then the model-facing turn.
        {
            let mut sessions = self.sessions.write().await;
            let session_id = sessions.ensure_current();
            let needs_title = sessions.append_message(ChatMessage::new(ChatRole::User, text));
            if needs_title {
                self.spawn_auto_title(session_id, text.to_string());
            }
        }
        self.api_history.push(Turn::user(vec![Part::text(text)]));

        info!(text_len = text.len(), "Processing user submission");

        let tools = advisor_tools();

        for round in 0..MAX_TOOL_ROUNDS {
            let snapshot = {
                let ledger = self.ledger.read().await;
                ContextSnapshot::capture(&ledger)
            };
            let instruction = build_system_instruction(&snapshot);

            let parts = match self
                .oracle
                .generate(&self.api_history, &instruction, &tools)
                .await
            {
                Ok(parts) => parts,
                Err(e) => {
                    warn!(round, error = %e, "Oracle call failed");
                    self.append_model_message(ORACLE_FAILURE_MESSAGE).await;
                    return Ok(());
                }
            };

            // Preserve the exact reply shape for re-grounding.
            self.api_history.push(Turn::model(parts.clone()));

            let text_reply: String = parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n");
            if !text_reply.trim().is_empty() {
                self.append_model_message(text_reply.trim()).await;
            }

            let calls: Vec<_> = parts
                .into_iter()
                .filter_map(|p| p.function_call)
                .collect();

            if calls.is_empty() {
                debug!(round, "Turn complete");
                return Ok(());
            }

            debug!(round, call_count = calls.len(), "Dispatching tool calls");

            // Sequential execution: later calls may depend on ledger
            // state mutated by earlier ones. A failed call never
            // short-circuits its siblings.
            let responses = {
                let mut ledger = self.ledger.write().await;
                calls
                    .iter()
                    .map(|fc| {
                        let outcome = ToolExecutor::execute(&mut ledger, &fc.name, &fc.args);
                        Part::function_response(&fc.name, json!({ "result": outcome }))
                    })
                    .collect::<Vec<_>>()
            };

            // One synthetic user turn asking the oracle to continue.
            self.api_history.push(Turn::user(responses));
        }

        warn!(max_rounds = MAX_TOOL_ROUNDS, "Tool round cap exceeded");
        self.append_model_message(MAX_ROUNDS_MESSAGE).await;
        Ok(())
    }

    async fn append_model_message(&self, text: &str) {
        self.sessions
            .write()
            .await
            .append_message(ChatMessage::new(ChatRole::Model, text));
    }

    /// Request a short auto-title off the turn path. Failure is swallowed
    /// and the default title stays.
    fn spawn_auto_title(&self, session_id: Uuid, seed: String) {
        let oracle = Arc::clone(&self.oracle);
        let sessions = Arc::clone(&self.sessions);

        tokio::spawn(async move {
            match oracle.generate_title(&seed).await {
                Ok(title) if !title.trim().is_empty() => {
                    sessions
                        .write()
                        .await
                        .rename_session(session_id, title.trim().to_string());
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Auto-title failed, keeping default"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{MockOracle, ScriptedReply};
    use crate::tools::ToolStatus;

    fn assistant_with(oracle: MockOracle) -> (Assistant, Arc<MockOracle>) {
        let oracle = Arc::new(oracle);
        let assistant = Assistant::new(
            Arc::clone(&oracle) as Arc<dyn Oracle>,
            Arc::new(RwLock::new(Ledger::new())),
            Arc::new(RwLock::new(SessionStore::new())),
        );
        (assistant, oracle)
    }

    #[tokio::test]
    async fn test_text_only_turn() {
        let (mut assistant, oracle) = assistant_with(MockOracle::with_replies(vec![
            ScriptedReply::Parts(vec![Part::text("Hello! How can I help?")]),
        ]));

        assistant.submit("hi").await.unwrap();

        let visible = assistant.visible_history().await;
        assert_eq!(visible.len(), 2);
        assert_eq!(visible[0].role, ChatRole::User);
        assert_eq!(visible[1].text, "Hello! How can I help?");

        // user turn + model turn, nothing synthetic
        assert_eq!(assistant.model_history().len(), 2);
        assert_eq!(oracle.request_history_lens(), vec![1]);
        assert!(!assistant.is_busy());
    }

    #[tokio::test]
    async fn test_tool_round_then_final_answer() {
        let (mut assistant, oracle) = assistant_with(MockOracle::with_replies(vec![
            ScriptedReply::Parts(vec![
                Part::text("Adding that now."),
                Part::function_call(
                    "addTransaction",
                    json!({ "title": "Coffee", "amount": 4.5, "type": "expense", "category": "Food" }),
                ),
            ]),
            ScriptedReply::Parts(vec![Part::text("Your coffee is logged!")]),
        ]));

        assistant.submit("add 4.50 coffee").await.unwrap();

        let ledger = assistant.ledger();
        let ledger = ledger.read().await;
        assert_eq!(ledger.transactions().len(), 1);
        assert_eq!(ledger.transactions()[0].title, "Coffee");
        drop(ledger);

        let visible = assistant.visible_history().await;
        let texts: Vec<&str> = visible.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["add 4.50 coffee", "Adding that now.", "Your coffee is logged!"]
        );

        // user, model(raw), synthetic user(results), model(final)
        let history = assistant.model_history();
        assert_eq!(history.len(), 4);
        assert!(history[2].parts[0].function_response.is_some());

        // Second request saw the first three turns.
        assert_eq!(oracle.request_history_lens(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_batch_partial_failure() {
        let (mut assistant, _oracle) = assistant_with(MockOracle::with_replies(vec![
            ScriptedReply::Parts(vec![
                Part::function_call(
                    "addTransaction",
                    json!({ "title": "Bad", "amount": "not-a-number" }),
                ),
                Part::function_call(
                    "addGoal",
                    json!({ "title": "Vacation", "targetAmount": 5000.0 }),
                ),
            ]),
            ScriptedReply::Parts(vec![Part::text("One of those failed.")]),
        ]));

        assistant.submit("do both").await.unwrap();

        // Both calls produced a tagged result part.
        let results = &assistant.model_history()[2].parts;
        assert_eq!(results.len(), 2);

        let first = results[0].function_response.as_ref().unwrap();
        let second = results[1].function_response.as_ref().unwrap();
        assert_eq!(first.name, "addTransaction");
        assert_eq!(second.name, "addGoal");
        assert_eq!(first.response["result"]["status"], "error");
        assert_eq!(second.response["result"]["status"], "success");

        // Only the valid call's mutation landed.
        let ledger = assistant.ledger();
        let ledger = ledger.read().await;
        assert!(ledger.transactions().is_empty());
        assert_eq!(ledger.goals().len(), 1);
    }

    #[tokio::test]
    async fn test_session_switch_resets_model_history() {
        let (mut assistant, oracle) = assistant_with(MockOracle::with_replies(vec![
            ScriptedReply::Parts(vec![Part::text("First session reply.")]),
            ScriptedReply::Parts(vec![Part::text("Fresh start.")]),
        ]));

        assistant.submit("remember this").await.unwrap();
        assert_eq!(assistant.model_history().len(), 2);

        assistant.create_session().await;
        assert!(assistant.model_history().is_empty());

        assistant.submit("new topic").await.unwrap();
        // The second request carried only the new session's single turn.
        assert_eq!(oracle.request_history_lens(), vec![1, 1]);
    }

    #[tokio::test]
    async fn test_selecting_previous_session_also_resets() {
        let (mut assistant, _oracle) = assistant_with(MockOracle::new());

        let first = assistant.create_session().await;
        assistant.submit("hello").await.unwrap();
        assistant.create_session().await;
        assistant.select_session(first).await;

        // Transcript persists, model-facing grounding does not.
        assert_eq!(assistant.visible_history().await.len(), 2);
        assert!(assistant.model_history().is_empty());
    }

    #[tokio::test]
    async fn test_oracle_failure_yields_fallback_message() {
        let (mut assistant, _oracle) = assistant_with(MockOracle::with_replies(vec![
            ScriptedReply::Failure("rate limited".to_string()),
        ]));

        assistant.submit("hi").await.unwrap();

        let visible = assistant.visible_history().await;
        assert_eq!(visible.last().unwrap().text, ORACLE_FAILURE_MESSAGE);
        assert!(!assistant.is_busy());

        // Not retried automatically; a fresh submission works.
        assistant.submit("again").await.unwrap();
        let visible = assistant.visible_history().await;
        assert_eq!(visible.last().unwrap().text, "Done.");
    }

    #[tokio::test]
    async fn test_tool_round_cap() {
        let looping: Vec<ScriptedReply> = (0..MAX_TOOL_ROUNDS)
            .map(|n| {
                ScriptedReply::Parts(vec![Part::function_call(
                    "addCategory",
                    json!({ "name": format!("Category {}", n) }),
                )])
            })
            .collect();
        let (mut assistant, oracle) = assistant_with(MockOracle::with_replies(looping));

        assistant.submit("loop forever").await.unwrap();

        assert_eq!(
            oracle.request_history_lens().len(),
            MAX_TOOL_ROUNDS as usize
        );
        let visible = assistant.visible_history().await;
        assert_eq!(visible.last().unwrap().text, MAX_ROUNDS_MESSAGE);
    }

    #[tokio::test]
    async fn test_tool_results_never_surface_in_transcript() {
        let (mut assistant, _oracle) = assistant_with(MockOracle::with_replies(vec![
            ScriptedReply::Parts(vec![Part::function_call(
                "addGoal",
                json!({ "title": "Bike", "targetAmount": 800.0 }),
            )]),
            ScriptedReply::Parts(vec![Part::text("Goal created.")]),
        ]));

        assistant.submit("save for a bike").await.unwrap();

        for msg in assistant.visible_history().await {
            assert!(!msg.text.contains("functionResponse"));
            assert!(!msg.text.contains("status"));
        }
    }

    #[tokio::test]
    async fn test_model_history_alternates_roles() {
        let (mut assistant, _oracle) = assistant_with(MockOracle::with_replies(vec![
            ScriptedReply::Parts(vec![Part::function_call(
                "addCategory",
                json!({ "name": "Travel" }),
            )]),
            ScriptedReply::Parts(vec![Part::text("Added.")]),
        ]));

        assistant.submit("new category travel").await.unwrap();

        let roles: Vec<_> = assistant
            .model_history()
            .iter()
            .map(|t| t.role)
            .collect();
        for pair in roles.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[tokio::test]
    async fn test_empty_submission_is_ignored() {
        let (mut assistant, oracle) = assistant_with(MockOracle::new());
        assistant.submit("   ").await.unwrap();
        assert!(oracle.request_history_lens().is_empty());
        assert!(assistant.model_history().is_empty());
    }

    #[tokio::test]
    async fn test_first_submission_outcome_includes_status_parts() {
        // Regression guard on the wire shape of tool results.
        let (mut assistant, _oracle) = assistant_with(MockOracle::with_replies(vec![
            ScriptedReply::Parts(vec![Part::function_call(
                "updateGoal",
                json!({ "goalName": "nothing", "amount": 10.0 }),
            )]),
            ScriptedReply::Parts(vec![Part::text("That goal doesn't exist.")]),
        ]));

        assistant.submit("put 10 into nothing").await.unwrap();

        let result =
            &assistant.model_history()[2].parts[0].function_response.as_ref().unwrap().response;
        let outcome: crate::tools::ToolOutcome =
            serde_json::from_value(result["result"].clone()).unwrap();
        assert_eq!(outcome.status, ToolStatus::Error);
        assert!(outcome.message.contains("not found"));
    }
}
