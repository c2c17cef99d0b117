//! Core data models for the ledger and chat state

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Expense,
    Income,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccountKind {
    Asset,
    Liability,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

//
// ================= Ledger Entities =================
//

/// A single expense or income entry. The amount is always positive;
/// direction is carried by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub title: String,
    pub amount: f64,
    pub kind: TransactionKind,
    pub category: String,
    pub date: NaiveDate,
    pub payment_method: String,
    pub recurring: bool,
}

/// Savings goal. `completed` is derived and recomputed by the ledger
/// whenever `saved_amount` changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsGoal {
    pub id: Uuid,
    pub title: String,
    pub target_amount: f64,
    pub saved_amount: f64,
    pub icon: String,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub category: String,
    pub limit: f64,
    pub spent: f64,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub name: String,
    pub cost: f64,
    pub billing_cycle: BillingCycle,
    pub next_billing_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub kind: AccountKind,
    pub balance: f64,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub main_goal: String,
    pub currency: String,
    pub timezone: String,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: "John Doe".to_string(),
            email: "john.doe@example.com".to_string(),
            main_goal: "Financial Freedom".to_string(),
            currency: "USD".to_string(),
            timezone: "GMT-5".to_string(),
        }
    }
}

//
// ================= Chat Entities =================
//

/// One human-readable message in the visible transcript. Tool calls and
/// tool results never appear here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl ChatSession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: "New Chat".to_string(),
            messages: Vec::new(),
            created_at: now,
            last_modified: now,
        }
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionKind::Expense => "Expense",
            TransactionKind::Income => "Income",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccountKind::Asset => "Asset",
            AccountKind::Liability => "Liability",
        };
        write!(f, "{}", s)
    }
}
