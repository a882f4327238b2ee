//! Expense records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One logged expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<String>,
    pub title: String,
    pub cost: f64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of an expense insert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewExpense {
    pub user_id: String,
    pub title: String,
    pub cost: f64,
}

/// Body of an expense update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseUpdate {
    pub title: String,
    pub cost: f64,
}

impl ExpenseUpdate {
    /// Trim the title and check both fields
    pub fn validated(title: &str, cost: f64) -> Result<Self> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::invalid_input("title is required"));
        }
        if !cost.is_finite() || cost <= 0.0 {
            return Err(Error::invalid_input(format!(
                "cost must be a positive amount, got {}",
                cost
            )));
        }
        Ok(Self {
            title: title.to_string(),
            cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_trims_and_rejects() {
        let update = ExpenseUpdate::validated("  Coffee ", 3.5).unwrap();
        assert_eq!(update.title, "Coffee");

        assert!(ExpenseUpdate::validated("   ", 3.5).is_err());
        assert!(ExpenseUpdate::validated("Coffee", 0.0).is_err());
        assert!(ExpenseUpdate::validated("Coffee", -2.0).is_err());
        assert!(ExpenseUpdate::validated("Coffee", f64::INFINITY).is_err());
    }

    #[test]
    fn parses_table_timestamps() {
        let expense: Expense = serde_json::from_str(
            r#"{"id":3,"user_id":"u1","title":"Rent","cost":800,"created_at":"2024-05-02T08:30:00.123456+00:00"}"#,
        )
        .unwrap();
        let created_at = expense.created_at.unwrap();
        assert_eq!(created_at.timestamp(), 1_714_638_600);
        assert_eq!(expense.cost, 800.0);
    }
}
