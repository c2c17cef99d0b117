//! Full-state export
//!
//! Serializes the ledger, chat sessions, and profile into a single JSON
//! document. Read-only over the stores.

use crate::error::{AssistantError, Result};
use crate::ledger::Ledger;
use crate::models::{
    Account, Budget, ChatSession, SavingsGoal, Subscription, Transaction, UserProfile,
};
use crate::sessions::SessionStore;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub user_profile: UserProfile,
    pub transactions: Vec<Transaction>,
    pub goals: Vec<SavingsGoal>,
    pub budgets: Vec<Budget>,
    pub subscriptions: Vec<Subscription>,
    pub accounts: Vec<Account>,
    pub chat_sessions: Vec<ChatSession>,
}

impl ExportDocument {
    pub fn collect(ledger: &Ledger, sessions: &SessionStore, profile: &UserProfile) -> Self {
        Self {
            user_profile: profile.clone(),
            transactions: ledger.transactions().to_vec(),
            goals: ledger.goals().to_vec(),
            budgets: ledger.budgets().to_vec(),
            subscriptions: ledger.subscriptions().to_vec(),
            accounts: ledger.accounts().to_vec(),
            chat_sessions: sessions.sessions().to_vec(),
        }
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| AssistantError::ExportError(e.to_string()))
    }
}
