//! Expense logging for the signed-in user

use std::sync::Arc;

use crate::auth_store::AuthStore;
use crate::budget::BudgetSummary;
use crate::db::{Expense, ExpenseStore, ExpenseUpdate, NewExpense};
use crate::error::{Error, Result};

/// Adds, edits and removes expenses of the identity held by an [`AuthStore`]
#[derive(Clone)]
pub struct ExpenseLedger {
    expenses: Arc<dyn ExpenseStore>,
    auth: AuthStore,
}

impl ExpenseLedger {
    pub fn new(expenses: Arc<dyn ExpenseStore>, auth: AuthStore) -> Self {
        Self { expenses, auth }
    }

    fn user_id(&self) -> Result<String> {
        self.auth
            .state()
            .identity()
            .map(|identity| identity.id.clone())
            .ok_or(Error::NotAuthenticated)
    }

    /// The user's expenses, newest first
    pub async fn list(&self) -> Result<Vec<Expense>> {
        let user_id = self.user_id()?;
        self.expenses.list_expenses(&user_id).await
    }

    pub async fn add(&self, title: &str, cost: f64) -> Result<()> {
        let user_id = self.user_id()?;
        let valid = ExpenseUpdate::validated(title, cost)?;
        self.expenses
            .add_expense(&NewExpense {
                user_id,
                title: valid.title,
                cost: valid.cost,
            })
            .await
    }

    pub async fn edit(&self, id: i64, title: &str, cost: f64) -> Result<()> {
        self.user_id()?;
        let update = ExpenseUpdate::validated(title, cost)?;
        self.expenses.update_expense(id, &update).await
    }

    pub async fn remove(&self, id: i64) -> Result<()> {
        self.user_id()?;
        self.expenses.delete_expense(id).await
    }

    /// Current expenses measured against the cached profile's budget
    pub async fn summary(&self) -> Result<(Vec<Expense>, BudgetSummary)> {
        let expenses = self.list().await?;
        let budget = self
            .auth
            .state()
            .profile()
            .map(|profile| profile.monthly_budget)
            .unwrap_or(0.0);
        let summary = BudgetSummary::compute(budget, &expenses);
        Ok((expenses, summary))
    }
}
