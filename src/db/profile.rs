//! Budgeting profile records

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A profile row as the table API returns it; nothing is guaranteed present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRow {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub monthly_budget: Option<f64>,
}

impl ProfileRow {
    /// A profile counts as complete once it has a name and a budget
    pub fn is_complete(&self) -> bool {
        self.full_name.as_deref().is_some_and(|name| !name.is_empty())
            && self.monthly_budget.is_some()
    }
}

/// A validated profile held by the profile cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Server-assigned row id, rendered as text
    pub id: Option<String>,
    pub created_at: Option<String>,
    pub user_id: String,
    pub full_name: String,
    pub email: String,
    pub monthly_budget: f64,
}

impl Profile {
    /// Build a cache entry from a remote row owned by `user_id`.
    ///
    /// Missing fields get defaults; a row owned by someone else is rejected.
    pub fn from_row(row: ProfileRow, user_id: &str) -> Result<Self> {
        if let Some(owner) = row.user_id.as_deref() {
            if owner != user_id {
                return Err(Error::general(format!(
                    "profile row belongs to {}, expected {}",
                    owner, user_id
                )));
            }
        }

        let id = row.id.and_then(|id| match id {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        });

        Ok(Self {
            id,
            created_at: row.created_at,
            user_id: user_id.to_string(),
            full_name: row.full_name.unwrap_or_default(),
            email: row.email.unwrap_or_default(),
            monthly_budget: row
                .monthly_budget
                .filter(|budget| budget.is_finite())
                .unwrap_or(0.0),
        })
    }
}

/// Input to `save_profile`
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileInput {
    pub full_name: String,
    pub monthly_budget: f64,
    /// Falls back to the identity's email
    pub email: Option<String>,
}

impl ProfileInput {
    pub fn new(full_name: &str, monthly_budget: f64) -> Self {
        Self {
            full_name: full_name.to_string(),
            monthly_budget,
            email: None,
        }
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    /// Name must be non-blank and the budget a non-negative number
    pub fn validate(&self) -> Result<()> {
        if self.full_name.trim().is_empty() {
            return Err(Error::invalid_input("full_name is required"));
        }
        validate_budget(self.monthly_budget)
    }
}

pub(crate) fn validate_budget(monthly_budget: f64) -> Result<()> {
    if !monthly_budget.is_finite() || monthly_budget < 0.0 {
        return Err(Error::invalid_input(format!(
            "monthly_budget must be a non-negative number, got {}",
            monthly_budget
        )));
    }
    Ok(())
}

/// Body of a profile upsert keyed by `user_id`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileUpsert {
    pub user_id: String,
    pub full_name: String,
    pub email: String,
    pub monthly_budget: f64,
}

/// Body of a partial profile update
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_budget: Option<f64>,
}
