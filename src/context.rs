//! Context snapshotter
//!
//! Builds the bounded ledger summary that grounds the oracle's answers
//! and tool suggestions. Snapshots are taken per round; nothing here
//! holds a reference into the ledger afterwards.

use crate::ledger::Ledger;
use crate::models::{Account, Budget, SavingsGoal, Transaction};
use serde::Serialize;

/// Most recent transactions included in a snapshot. The full history
/// must never be sent to the oracle.
pub const RECENT_TRANSACTION_LIMIT: usize = 15;

/// Read-only snapshot of the ledger, shaped for the system instruction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnapshot {
    pub recent_transactions: Vec<Transaction>,
    pub active_goals: Vec<SavingsGoal>,
    pub budgets: Vec<Budget>,
    pub available_categories: Vec<String>,
    pub accounts: Vec<Account>,
}

impl ContextSnapshot {
    pub fn capture(ledger: &Ledger) -> Self {
        Self {
            recent_transactions: ledger
                .transactions()
                .iter()
                .take(RECENT_TRANSACTION_LIMIT)
                .cloned()
                .collect(),
            active_goals: ledger
                .goals()
                .iter()
                .filter(|g| !g.completed)
                .cloned()
                .collect(),
            budgets: ledger.budgets().to_vec(),
            available_categories: ledger.categories().to_vec(),
            accounts: ledger.accounts().to_vec(),
        }
    }
}

/// Build the full system instruction: persona plus serialized snapshot.
pub fn build_system_instruction(snapshot: &ContextSnapshot) -> String {
    let context_data =
        serde_json::to_string(snapshot).unwrap_or_else(|_| "{}".to_string());

    format!(
        r#"You are SpendPal, an expert personal finance AI assistant.
You have FULL control to manage the user's financial data.

Tone: Friendly, professional, and precise.

Context Data: {}

Rules:
- If user says "Add 20 at mcdonalds", infer expense, food, today.
- If user says "Budget 500 for food", use addBudget.
- If user says "New wallet Chase with 5000", use addAccount.
"#,
        context_data
    )
}
