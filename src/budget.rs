//! Budget consumption arithmetic

use crate::db::Expense;

/// Percentage at which spending is flagged as a warning
pub const WARNING_PERCENT: f64 = 75.0;
/// Percentage at which spending is flagged as critical
pub const CRITICAL_PERCENT: f64 = 90.0;

/// How close spending is to the monthly budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetLevel {
    Healthy,
    Warning,
    Critical,
}

impl BudgetLevel {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= CRITICAL_PERCENT {
            BudgetLevel::Critical
        } else if percentage >= WARNING_PERCENT {
            BudgetLevel::Warning
        } else {
            BudgetLevel::Healthy
        }
    }
}

/// Spending measured against a monthly budget
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetSummary {
    pub monthly_budget: f64,
    pub total: f64,
    /// Negative once the budget is overspent
    pub remaining: f64,
    /// Share of the budget used, capped at 100; 0 without a budget
    pub percentage: f64,
    pub level: BudgetLevel,
}

impl BudgetSummary {
    pub fn compute(monthly_budget: f64, expenses: &[Expense]) -> Self {
        let total: f64 = expenses.iter().map(|expense| expense.cost).sum();
        Self::from_total(monthly_budget, total)
    }

    pub fn from_total(monthly_budget: f64, total: f64) -> Self {
        let percentage = if monthly_budget > 0.0 {
            (total / monthly_budget * 100.0).min(100.0)
        } else {
            0.0
        };
        Self {
            monthly_budget,
            total,
            remaining: monthly_budget - total,
            percentage,
            level: BudgetLevel::from_percentage(percentage),
        }
    }
}
