//! Tool schema, typed tool calls, and the tool executor
//!
//! Tool calls arrive from the oracle as a name plus a JSON argument bag.
//! They are parsed into a closed enum with one typed argument struct per
//! tool, then dispatched against the ledger. Every call produces exactly
//! one outcome record; failures are data, never panics.

use crate::error::AssistantError;
use crate::ledger::Ledger;
use crate::models::{
    Account, AccountKind, BillingCycle, Budget, SavingsGoal, Subscription, Transaction,
    TransactionKind,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

//
// ================= Schema Declarations =================
//

/// One function declaration of the oracle-facing tool schema.
/// Descriptions exist solely for the oracle's benefit.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

fn declaration(name: &str, description: &str, parameters: Value) -> FunctionDeclaration {
    FunctionDeclaration {
        name: name.to_string(),
        description: description.to_string(),
        parameters,
    }
}

/// The fixed, versioned list of the seven advisor tools.
pub fn advisor_tools() -> Vec<FunctionDeclaration> {
    vec![
        declaration(
            "addTransaction",
            "Add a new financial transaction (expense or income).",
            json!({
                "type": "OBJECT",
                "properties": {
                    "title": { "type": "STRING", "description": "Description or merchant name (e.g. 'Starbucks', 'Salary')" },
                    "amount": { "type": "NUMBER", "description": "The numeric amount" },
                    "type": { "type": "STRING", "description": "Type of transaction: 'expense' or 'income'", "enum": ["expense", "income"] },
                    "category": { "type": "STRING", "description": "Category (e.g. Food, Transport, Salary, Entertainment, Health, Shopping, Utilities)" },
                    "date": { "type": "STRING", "description": "Date in YYYY-MM-DD format. Default to today if not specified." },
                    "paymentMethod": { "type": "STRING", "description": "Payment method (e.g. Credit Card, Cash, Bank Transfer)" },
                    "isRecurring": { "type": "BOOLEAN", "description": "True if this is a recurring monthly payment" }
                },
                "required": ["title", "amount", "type", "category"]
            }),
        ),
        declaration(
            "addGoal",
            "Create a new savings goal.",
            json!({
                "type": "OBJECT",
                "properties": {
                    "title": { "type": "STRING", "description": "Name of the goal (e.g. 'New Laptop')" },
                    "targetAmount": { "type": "NUMBER", "description": "The target amount to save" }
                },
                "required": ["title", "targetAmount"]
            }),
        ),
        declaration(
            "updateGoal",
            "Add funds (deposit) to an existing savings goal.",
            json!({
                "type": "OBJECT",
                "properties": {
                    "goalName": { "type": "STRING", "description": "The name of the goal to update (fuzzy match)" },
                    "amount": { "type": "NUMBER", "description": "Amount to add to the saved total" }
                },
                "required": ["goalName", "amount"]
            }),
        ),
        declaration(
            "addSubscription",
            "Add a new recurring subscription.",
            json!({
                "type": "OBJECT",
                "properties": {
                    "name": { "type": "STRING", "description": "Name of the service (e.g. 'Netflix')" },
                    "cost": { "type": "NUMBER", "description": "Monthly or yearly cost" },
                    "billingCycle": { "type": "STRING", "description": "'monthly' or 'yearly'", "enum": ["monthly", "yearly"] }
                },
                "required": ["name", "cost", "billingCycle"]
            }),
        ),
        declaration(
            "addBudget",
            "Set a monthly budget limit for a specific category.",
            json!({
                "type": "OBJECT",
                "properties": {
                    "category": { "type": "STRING", "description": "Category name (e.g. Food, Dining)" },
                    "limit": { "type": "NUMBER", "description": "The maximum spending amount" }
                },
                "required": ["category", "limit"]
            }),
        ),
        declaration(
            "addAccount",
            "Add a new financial account (Wallet, Bank, Credit Card).",
            json!({
                "type": "OBJECT",
                "properties": {
                    "name": { "type": "STRING", "description": "Account name (e.g. Chase Savings)" },
                    "type": { "type": "STRING", "description": "Type: 'Asset' (cash/bank) or 'Liability' (credit/debt)", "enum": ["Asset", "Liability"] },
                    "balance": { "type": "NUMBER", "description": "Current balance" }
                },
                "required": ["name", "type", "balance"]
            }),
        ),
        declaration(
            "addCategory",
            "Create a new expense category.",
            json!({
                "type": "OBJECT",
                "properties": {
                    "name": { "type": "STRING", "description": "New category name" }
                },
                "required": ["name"]
            }),
        ),
    ]
}

//
// ================= Typed Arguments =================
//

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTransactionArgs {
    pub title: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
    pub payment_method: Option<String>,
    pub is_recurring: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddGoalArgs {
    pub title: String,
    pub target_amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGoalArgs {
    pub goal_name: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddSubscriptionArgs {
    pub name: String,
    pub cost: f64,
    pub billing_cycle: BillingCycle,
    pub next_billing_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBudgetArgs {
    pub category: String,
    pub limit: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAccountArgs {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AccountKind,
    pub balance: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddCategoryArgs {
    pub name: String,
}

/// Closed set of tool kinds. Adding a tool means adding a variant here,
/// a handler below, and a declaration in `advisor_tools`.
#[derive(Debug, Clone)]
pub enum ToolCall {
    AddTransaction(AddTransactionArgs),
    AddGoal(AddGoalArgs),
    UpdateGoal(UpdateGoalArgs),
    AddSubscription(AddSubscriptionArgs),
    AddBudget(AddBudgetArgs),
    AddAccount(AddAccountArgs),
    AddCategory(AddCategoryArgs),
}

impl ToolCall {
    /// Parse a named argument bag into a typed call. `Ok(None)` for tool
    /// names outside the schema; `Err` when arguments do not deserialize.
    pub fn parse(name: &str, args: &Value) -> Result<Option<ToolCall>, AssistantError> {
        fn args_for<T: serde::de::DeserializeOwned>(
            name: &str,
            args: &Value,
        ) -> Result<T, AssistantError> {
            serde_json::from_value(args.clone())
                .map_err(|e| AssistantError::InvalidToolArgs(format!("{}: {}", name, e)))
        }

        let call = match name {
            "addTransaction" => ToolCall::AddTransaction(args_for(name, args)?),
            "addGoal" => ToolCall::AddGoal(args_for(name, args)?),
            "updateGoal" => ToolCall::UpdateGoal(args_for(name, args)?),
            "addSubscription" => ToolCall::AddSubscription(args_for(name, args)?),
            "addBudget" => ToolCall::AddBudget(args_for(name, args)?),
            "addAccount" => ToolCall::AddAccount(args_for(name, args)?),
            "addCategory" => ToolCall::AddCategory(args_for(name, args)?),
            _ => return Ok(None),
        };
        Ok(Some(call))
    }
}

//
// ================= Outcomes =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Error,
}

/// Structured result of a single tool call, round-tripped back to the
/// oracle as a function response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub status: ToolStatus,
    pub message: String,
}

impl ToolOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            message: message.into(),
        }
    }
}

//
// ================= Executor =================
//

pub struct ToolExecutor;

impl ToolExecutor {
    /// Execute one tool call against the ledger. All-or-nothing per call:
    /// validation runs before any mutation, and every failure is captured
    /// as an error outcome rather than propagated.
    pub fn execute(ledger: &mut Ledger, name: &str, args: &Value) -> ToolOutcome {
        let call = match ToolCall::parse(name, args) {
            Ok(Some(call)) => call,
            Ok(None) => {
                // Silent-ignore policy for tools outside the schema.
                warn!(tool_name = %name, "Ignoring unrecognized tool call");
                return ToolOutcome::success("ok");
            }
            Err(e) => {
                warn!(tool_name = %name, error = %e, "Tool arguments failed to parse");
                return ToolOutcome::error(e.to_string());
            }
        };

        match Self::dispatch(ledger, call) {
            Ok(message) => ToolOutcome::success(message),
            Err(message) => {
                warn!(tool_name = %name, error = %message, "Tool call rejected");
                ToolOutcome::error(message)
            }
        }
    }

    fn dispatch(ledger: &mut Ledger, call: ToolCall) -> Result<String, String> {
        match call {
            ToolCall::AddTransaction(args) => Self::add_transaction(ledger, args),
            ToolCall::AddGoal(args) => Self::add_goal(ledger, args),
            ToolCall::UpdateGoal(args) => Self::update_goal(ledger, args),
            ToolCall::AddSubscription(args) => Self::add_subscription(ledger, args),
            ToolCall::AddBudget(args) => Self::add_budget(ledger, args),
            ToolCall::AddAccount(args) => Self::add_account(ledger, args),
            ToolCall::AddCategory(args) => Self::add_category(ledger, args),
        }
    }

    fn add_transaction(ledger: &mut Ledger, args: AddTransactionArgs) -> Result<String, String> {
        if args.amount <= 0.0 {
            return Err(format!("Transaction amount must be positive, got {}", args.amount));
        }

        // Category strings carry no referential integrity; whatever the
        // oracle names is kept verbatim so budget matching still works.
        // Only an absent or blank category falls back.
        let category = match args.category {
            Some(c) if !c.trim().is_empty() => c,
            _ => "General".to_string(),
        };

        let title = args.title;
        let amount = args.amount;
        ledger.add_transaction(Transaction {
            id: Uuid::nil(),
            title: title.clone(),
            amount,
            kind: args.kind,
            category,
            date: args.date.unwrap_or_else(today),
            payment_method: args.payment_method.unwrap_or_else(|| "Other".to_string()),
            recurring: args.is_recurring.unwrap_or(false),
        });

        Ok(format!("{} '{}' of ${} added.", args.kind, title, amount))
    }

    fn add_goal(ledger: &mut Ledger, args: AddGoalArgs) -> Result<String, String> {
        if args.target_amount <= 0.0 {
            return Err(format!(
                "Goal target must be positive, got {}",
                args.target_amount
            ));
        }

        let title = args.title;
        ledger.add_goal(SavingsGoal {
            id: Uuid::nil(),
            title: title.clone(),
            target_amount: args.target_amount,
            saved_amount: 0.0,
            icon: "🎯".to_string(),
            completed: false,
        });

        Ok(format!("Goal '{}' created.", title))
    }

    fn update_goal(ledger: &mut Ledger, args: UpdateGoalArgs) -> Result<String, String> {
        if args.amount <= 0.0 {
            return Err(format!("Deposit amount must be positive, got {}", args.amount));
        }

        let needle = args.goal_name.to_lowercase();
        let matched = ledger
            .goals()
            .iter()
            .find(|g| g.title.to_lowercase().contains(&needle))
            .map(|g| (g.id, g.title.clone(), g.saved_amount));

        let Some((id, title, saved)) = matched else {
            return Err(format!("Goal '{}' not found.", args.goal_name));
        };

        ledger.deposit_to_goal(id, args.amount);
        Ok(format!(
            "Added ${} to goal '{}'. New total: ${}.",
            args.amount,
            title,
            saved + args.amount
        ))
    }

    fn add_subscription(ledger: &mut Ledger, args: AddSubscriptionArgs) -> Result<String, String> {
        if args.cost <= 0.0 {
            return Err(format!("Subscription cost must be positive, got {}", args.cost));
        }

        let name = args.name;
        ledger.add_subscription(Subscription {
            id: Uuid::nil(),
            name: name.clone(),
            cost: args.cost,
            billing_cycle: args.billing_cycle,
            next_billing_date: args.next_billing_date.unwrap_or_else(today),
        });

        Ok(format!("Subscription '{}' added.", name))
    }

    fn add_budget(ledger: &mut Ledger, args: AddBudgetArgs) -> Result<String, String> {
        if args.limit <= 0.0 {
            return Err(format!("Budget limit must be positive, got {}", args.limit));
        }

        let category = args.category;
        ledger.add_budget(Budget {
            id: Uuid::nil(),
            category: category.clone(),
            limit: args.limit,
            spent: 0.0,
            color: "#3b82f6".to_string(),
        });

        Ok(format!("Budget for {} set to ${}.", category, args.limit))
    }

    fn add_account(ledger: &mut Ledger, args: AddAccountArgs) -> Result<String, String> {
        if args.balance < 0.0 {
            return Err(format!(
                "Account balance must not be negative, got {}",
                args.balance
            ));
        }

        let name = args.name;
        ledger.add_account(Account {
            id: Uuid::nil(),
            name: name.clone(),
            kind: args.kind,
            balance: args.balance,
            icon: "🏦".to_string(),
        });

        Ok(format!(
            "Account '{}' added with balance ${}.",
            name, args.balance
        ))
    }

    fn add_category(ledger: &mut Ledger, args: AddCategoryArgs) -> Result<String, String> {
        if args.name.trim().is_empty() {
            return Err("Category name must not be empty".to_string());
        }

        let name = args.name;
        ledger.add_category(name.clone());
        Ok(format!("Category '{}' added.", name))
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_transaction_round_trip_with_defaults() {
        let mut ledger = Ledger::new();
        let outcome = ToolExecutor::execute(
            &mut ledger,
            "addTransaction",
            &json!({
                "title": "Coffee",
                "amount": 4.5,
                "type": "expense",
                "category": "Food"
            }),
        );

        assert_eq!(outcome.status, ToolStatus::Success);
        assert!(outcome.message.contains("Coffee"));
        assert!(outcome.message.contains("4.5"));

        let t = &ledger.transactions()[0];
        assert_eq!(t.date, today());
        assert_eq!(t.payment_method, "Other");
        assert!(!t.recurring);
        assert_eq!(t.category, "Food");
    }

    #[test]
    fn test_add_transaction_keeps_unregistered_category() {
        let mut ledger = Ledger::new();
        ToolExecutor::execute(
            &mut ledger,
            "addTransaction",
            &json!({
                "title": "Dog food",
                "amount": 10.0,
                "type": "expense",
                "category": "Pets"
            }),
        );
        // Category strings are kept verbatim even when not in the
        // registered set; only a missing one falls back.
        assert_eq!(ledger.transactions()[0].category, "Pets");
    }

    #[test]
    fn test_add_transaction_without_category_falls_back_to_general() {
        let mut ledger = Ledger::new();
        ToolExecutor::execute(
            &mut ledger,
            "addTransaction",
            &json!({ "title": "Mystery", "amount": 10.0, "type": "expense" }),
        );
        assert_eq!(ledger.transactions()[0].category, "General");

        ToolExecutor::execute(
            &mut ledger,
            "addTransaction",
            &json!({ "title": "Blank", "amount": 5.0, "type": "expense", "category": "  " }),
        );
        assert_eq!(ledger.transactions()[0].category, "General");
    }

    #[test]
    fn test_budget_linkage_for_freshly_budgeted_category() {
        let mut ledger = Ledger::new();
        ToolExecutor::execute(
            &mut ledger,
            "addBudget",
            &json!({ "category": "Dining", "limit": 500.0 }),
        );
        ToolExecutor::execute(
            &mut ledger,
            "addTransaction",
            &json!({
                "title": "Pasta",
                "amount": 30.0,
                "type": "expense",
                "category": "Dining"
            }),
        );

        assert_eq!(ledger.transactions()[0].category, "Dining");
        assert_eq!(ledger.budgets()[0].spent, 30.0);
    }

    #[test]
    fn test_add_transaction_rejects_non_positive_amount() {
        let mut ledger = Ledger::new();
        let outcome = ToolExecutor::execute(
            &mut ledger,
            "addTransaction",
            &json!({
                "title": "Refund",
                "amount": -4.5,
                "type": "expense",
                "category": "Food"
            }),
        );

        assert_eq!(outcome.status, ToolStatus::Error);
        assert!(ledger.transactions().is_empty());
    }

    #[test]
    fn test_update_goal_fuzzy_match_first_wins() {
        let mut ledger = Ledger::new();
        ToolExecutor::execute(
            &mut ledger,
            "addGoal",
            &json!({ "title": "New Laptop", "targetAmount": 2000.0 }),
        );
        ToolExecutor::execute(
            &mut ledger,
            "addGoal",
            &json!({ "title": "Laptop Bag", "targetAmount": 100.0 }),
        );

        let outcome = ToolExecutor::execute(
            &mut ledger,
            "updateGoal",
            &json!({ "goalName": "laptop", "amount": 250.0 }),
        );

        assert_eq!(outcome.status, ToolStatus::Success);
        assert!(outcome.message.contains("New Laptop"));
        assert_eq!(ledger.goals()[0].saved_amount, 250.0);
        assert_eq!(ledger.goals()[1].saved_amount, 0.0);
    }

    #[test]
    fn test_update_goal_not_found_is_non_throwing() {
        let mut ledger = Ledger::new();
        ToolExecutor::execute(
            &mut ledger,
            "addGoal",
            &json!({ "title": "Vacation", "targetAmount": 5000.0 }),
        );

        let outcome = ToolExecutor::execute(
            &mut ledger,
            "updateGoal",
            &json!({ "goalName": "yacht", "amount": 100.0 }),
        );

        assert_eq!(outcome.status, ToolStatus::Error);
        assert!(outcome.message.contains("not found"));
        assert_eq!(ledger.goals()[0].saved_amount, 0.0);
    }

    #[test]
    fn test_unknown_tool_is_ignored_with_success() {
        let mut ledger = Ledger::new();
        let outcome = ToolExecutor::execute(&mut ledger, "launchRocket", &json!({}));
        assert_eq!(outcome.status, ToolStatus::Success);
    }

    #[test]
    fn test_malformed_args_produce_error_without_mutation() {
        let mut ledger = Ledger::new();
        let outcome = ToolExecutor::execute(
            &mut ledger,
            "addTransaction",
            &json!({ "amount": "not a number" }),
        );

        assert_eq!(outcome.status, ToolStatus::Error);
        assert!(outcome.message.contains("Invalid tool arguments"));
        assert!(ledger.transactions().is_empty());
    }

    #[test]
    fn test_add_budget_and_account_and_subscription_defaults() {
        let mut ledger = Ledger::new();

        let outcome = ToolExecutor::execute(
            &mut ledger,
            "addBudget",
            &json!({ "category": "Food", "limit": 500.0 }),
        );
        assert_eq!(outcome.status, ToolStatus::Success);
        assert_eq!(ledger.budgets()[0].spent, 0.0);

        let outcome = ToolExecutor::execute(
            &mut ledger,
            "addAccount",
            &json!({ "name": "Chase Savings", "type": "Asset", "balance": 5000.0 }),
        );
        assert_eq!(outcome.status, ToolStatus::Success);
        assert_eq!(ledger.net_worth(), 5000.0);

        let outcome = ToolExecutor::execute(
            &mut ledger,
            "addSubscription",
            &json!({ "name": "Netflix", "cost": 15.99, "billingCycle": "monthly" }),
        );
        assert_eq!(outcome.status, ToolStatus::Success);
        assert_eq!(ledger.subscriptions()[0].next_billing_date, today());
    }

    #[test]
    fn test_add_category_via_tool() {
        let mut ledger = Ledger::new();
        let outcome =
            ToolExecutor::execute(&mut ledger, "addCategory", &json!({ "name": "Pets" }));
        assert_eq!(outcome.status, ToolStatus::Success);
        assert!(ledger.has_category("Pets"));

        let outcome =
            ToolExecutor::execute(&mut ledger, "addCategory", &json!({ "name": "   " }));
        assert_eq!(outcome.status, ToolStatus::Error);
    }

    #[test]
    fn test_advisor_tools_schema_is_complete() {
        let tools = advisor_tools();
        assert_eq!(tools.len(), 7);
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert!(names.contains(&"addTransaction"));
        assert!(names.contains(&"updateGoal"));
        for tool in &tools {
            assert!(tool.parameters.get("required").is_some());
        }
    }
}
