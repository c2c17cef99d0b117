//! In-memory ledger store
//!
//! Owns every financial collection and the CRUD operations over them.
//! Aggregates are pure recomputations over the current collections and
//! are never cached.

use crate::models::{
    Account, AccountKind, Budget, SavingsGoal, Subscription, Transaction, TransactionKind,
};
use tracing::debug;
use uuid::Uuid;

/// Categories seeded into every fresh ledger.
const DEFAULT_CATEGORIES: &[&str] = &[
    "Food",
    "Transport",
    "Salary",
    "Entertainment",
    "Health",
    "Shopping",
    "Investment",
    "Utilities",
];

#[derive(Debug, Clone)]
pub struct Ledger {
    transactions: Vec<Transaction>,
    goals: Vec<SavingsGoal>,
    budgets: Vec<Budget>,
    subscriptions: Vec<Subscription>,
    accounts: Vec<Account>,
    categories: Vec<String>,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            transactions: Vec::new(),
            goals: Vec::new(),
            budgets: Vec::new(),
            subscriptions: Vec::new(),
            accounts: Vec::new(),
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn ensure_id(id: Uuid) -> Uuid {
        if id.is_nil() {
            Uuid::new_v4()
        } else {
            id
        }
    }

    //
    // ================= Transactions =================
    //

    /// Add a transaction, newest first. Expense additions increment the
    /// `spent` of every budget whose category matches.
    pub fn add_transaction(&mut self, mut t: Transaction) -> Uuid {
        t.id = Self::ensure_id(t.id);
        let id = t.id;

        if t.kind == TransactionKind::Expense {
            for budget in self
                .budgets
                .iter_mut()
                .filter(|b| b.category == t.category)
            {
                budget.spent += t.amount;
            }
        }

        debug!(transaction_id = %id, title = %t.title, amount = t.amount, "Transaction added");
        self.transactions.insert(0, t);
        id
    }

    /// Replace a transaction by id. Silent no-op when the id is unknown.
    /// Budget `spent` is deliberately not readjusted on edit.
    pub fn edit_transaction(&mut self, updated: Transaction) {
        if let Some(existing) = self.transactions.iter_mut().find(|t| t.id == updated.id) {
            *existing = updated;
        }
    }

    pub fn delete_transaction(&mut self, id: Uuid) {
        self.transactions.retain(|t| t.id != id);
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    //
    // ================= Goals =================
    //

    pub fn add_goal(&mut self, mut g: SavingsGoal) -> Uuid {
        g.id = Self::ensure_id(g.id);
        g.completed = g.saved_amount >= g.target_amount;
        let id = g.id;
        self.goals.push(g);
        id
    }

    /// Deposit funds into a goal (additive path). Recomputes `completed`.
    pub fn deposit_to_goal(&mut self, id: Uuid, amount: f64) {
        if let Some(goal) = self.goals.iter_mut().find(|g| g.id == id) {
            goal.saved_amount += amount;
            goal.completed = goal.saved_amount >= goal.target_amount;
        }
    }

    /// Replace a goal's details. Can set any saved amount; `completed`
    /// is recomputed from the new values.
    pub fn edit_goal(&mut self, mut updated: SavingsGoal) {
        updated.completed = updated.saved_amount >= updated.target_amount;
        if let Some(existing) = self.goals.iter_mut().find(|g| g.id == updated.id) {
            *existing = updated;
        }
    }

    pub fn delete_goal(&mut self, id: Uuid) {
        self.goals.retain(|g| g.id != id);
    }

    pub fn goals(&self) -> &[SavingsGoal] {
        &self.goals
    }

    //
    // ================= Budgets =================
    //

    pub fn add_budget(&mut self, mut b: Budget) -> Uuid {
        b.id = Self::ensure_id(b.id);
        let id = b.id;
        self.budgets.push(b);
        id
    }

    pub fn edit_budget(&mut self, updated: Budget) {
        if let Some(existing) = self.budgets.iter_mut().find(|b| b.id == updated.id) {
            *existing = updated;
        }
    }

    pub fn delete_budget(&mut self, id: Uuid) {
        self.budgets.retain(|b| b.id != id);
    }

    pub fn budgets(&self) -> &[Budget] {
        &self.budgets
    }

    //
    // ================= Subscriptions =================
    //

    pub fn add_subscription(&mut self, mut s: Subscription) -> Uuid {
        s.id = Self::ensure_id(s.id);
        let id = s.id;
        self.subscriptions.push(s);
        id
    }

    pub fn edit_subscription(&mut self, updated: Subscription) {
        if let Some(existing) = self.subscriptions.iter_mut().find(|s| s.id == updated.id) {
            *existing = updated;
        }
    }

    pub fn delete_subscription(&mut self, id: Uuid) {
        self.subscriptions.retain(|s| s.id != id);
    }

    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    //
    // ================= Accounts =================
    //

    pub fn add_account(&mut self, mut a: Account) -> Uuid {
        a.id = Self::ensure_id(a.id);
        let id = a.id;
        self.accounts.push(a);
        id
    }

    pub fn edit_account(&mut self, updated: Account) {
        if let Some(existing) = self.accounts.iter_mut().find(|a| a.id == updated.id) {
            *existing = updated;
        }
    }

    pub fn delete_account(&mut self, id: Uuid) {
        self.accounts.retain(|a| a.id != id);
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    //
    // ================= Categories =================
    //

    /// Add a category name. Case-insensitive dedup; adding an existing
    /// name is a silent no-op.
    pub fn add_category(&mut self, name: impl Into<String>) {
        let name = name.into();
        let exists = self
            .categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&name));
        if !exists {
            self.categories.push(name);
        }
    }

    /// Remove a category. Transactions and budgets referencing it keep
    /// their (now dangling) category string.
    pub fn delete_category(&mut self, name: &str) {
        self.categories.retain(|c| c != name);
    }

    pub fn has_category(&self, name: &str) -> bool {
        self.categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    //
    // ================= Aggregates =================
    //

    pub fn total_income(&self) -> f64 {
        self.transactions
            .iter()
            .filter(|t| t.kind == TransactionKind::Income)
            .map(|t| t.amount)
            .sum()
    }

    pub fn total_expenses(&self) -> f64 {
        self.transactions
            .iter()
            .filter(|t| t.kind == TransactionKind::Expense)
            .map(|t| t.amount)
            .sum()
    }

    pub fn balance(&self) -> f64 {
        self.total_income() - self.total_expenses()
    }

    pub fn net_worth(&self) -> f64 {
        let assets: f64 = self
            .accounts
            .iter()
            .filter(|a| a.kind == AccountKind::Asset)
            .map(|a| a.balance)
            .sum();
        let liabilities: f64 = self
            .accounts
            .iter()
            .filter(|a| a.kind == AccountKind::Liability)
            .map(|a| a.balance)
            .sum();
        assets - liabilities
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
