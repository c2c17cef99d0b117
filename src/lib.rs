//! SpendPal assistant engine
//!
//! A personal-finance assistant that:
//! - Keeps an in-memory ledger (transactions, goals, budgets,
//!   subscriptions, accounts, categories)
//! - Tracks multiple chat sessions with a visible transcript per session
//! - Drives a function-calling oracle through a bounded round loop
//! - Executes validated tool calls against the ledger with per-call
//!   error capture
//!
//! TURN LOOP:
//! SUBMIT → ORACLE → TEXT + TOOL CALLS → EXECUTE → RESULTS → ORACLE → ... → DONE

pub mod api;
pub mod assistant;
pub mod context;
pub mod error;
pub mod export;
pub mod ledger;
pub mod models;
pub mod oracle;
pub mod sessions;
pub mod tools;

pub use error::Result;

// Re-export common types
pub use assistant::Assistant;
pub use ledger::Ledger;
pub use models::*;
pub use sessions::SessionStore;
