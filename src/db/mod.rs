//! Profile and expense tables
//!
//! The traits are the seams the app core is written against; [`RemoteStore`]
//! implements them over PostgREST using the access token of the active session.

mod expense;
mod profile;

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;

use crate::auth::Auth;
use crate::config::ClientOptions;
use crate::error::{Error, Result};
use crate::postgrest::{PostgrestClient, SortOrder};

pub use expense::*;
pub use profile::*;

/// Access to the one-profile-per-user table
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Only `full_name` and `monthly_budget` of the user's row.
    ///
    /// Returns [`crate::error::Error::NotFound`] when the user has no row.
    async fn profile_completion(&self, user_id: &str) -> Result<ProfileRow>;

    /// The user's full row, or [`crate::error::Error::NotFound`]
    async fn find_profile(&self, user_id: &str) -> Result<ProfileRow>;

    /// Create the row, or update it when one exists for `user_id`
    async fn upsert_profile(&self, profile: &ProfileUpsert) -> Result<()>;

    /// Update the existing row of `user_id`.
    ///
    /// Returns [`Error::NotFound`] when no row matched.
    async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<()>;
}

/// Access to the expense table
#[async_trait]
pub trait ExpenseStore: Send + Sync {
    /// The user's expenses, newest first
    async fn list_expenses(&self, user_id: &str) -> Result<Vec<Expense>>;

    async fn add_expense(&self, expense: &NewExpense) -> Result<()>;

    /// Returns [`Error::NotFound`] when no expense has `id`
    async fn update_expense(&self, id: i64, update: &ExpenseUpdate) -> Result<()>;

    async fn delete_expense(&self, id: i64) -> Result<()>;
}

/// A filtered PATCH that matched nothing still succeeds at the HTTP level
fn require_row<T>(rows: Vec<T>) -> Result<()> {
    if rows.is_empty() {
        return Err(Error::NotFound);
    }
    Ok(())
}

/// PostgREST-backed implementation of the store traits
pub struct RemoteStore {
    url: String,
    key: String,
    client: Client,
    options: ClientOptions,
    auth: Arc<Auth>,
}

impl RemoteStore {
    pub fn new(url: &str, key: &str, client: Client, options: ClientOptions, auth: Arc<Auth>) -> Self {
        Self {
            url: url.to_string(),
            key: key.to_string(),
            client,
            options,
            auth,
        }
    }

    /// A table client authenticated as the active session's user, if any
    fn from(&self, table: &str) -> PostgrestClient {
        let client = PostgrestClient::new(
            &self.url,
            &self.key,
            table,
            self.client.clone(),
            &self.options,
        );
        match self.auth.cached_session() {
            Some(session) => client.with_auth(&session.access_token),
            None => client,
        }
    }

    fn profiles(&self) -> PostgrestClient {
        self.from(&self.options.profile_table)
    }

    fn expenses(&self) -> PostgrestClient {
        self.from(&self.options.expense_table)
    }
}

#[async_trait]
impl ProfileStore for RemoteStore {
    async fn profile_completion(&self, user_id: &str) -> Result<ProfileRow> {
        self.profiles()
            .select("full_name, monthly_budget")
            .eq("user_id", user_id)
            .execute_single::<ProfileRow>()
            .await
    }

    async fn find_profile(&self, user_id: &str) -> Result<ProfileRow> {
        self.profiles()
            .select("*")
            .eq("user_id", user_id)
            .execute_single::<ProfileRow>()
            .await
    }

    async fn upsert_profile(&self, profile: &ProfileUpsert) -> Result<()> {
        self.profiles()
            .upsert(profile)
            .on_conflict("user_id")
            .execute_empty()
            .await
    }

    async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<()> {
        self.profiles()
            .update(update)
            .eq("user_id", user_id)
            .execute::<ProfileRow>()
            .await
            .and_then(require_row)
    }
}

#[async_trait]
impl ExpenseStore for RemoteStore {
    async fn list_expenses(&self, user_id: &str) -> Result<Vec<Expense>> {
        self.expenses()
            .select("*")
            .eq("user_id", user_id)
            .order("created_at", SortOrder::Descending)
            .execute::<Expense>()
            .await
    }

    async fn add_expense(&self, expense: &NewExpense) -> Result<()> {
        self.expenses().insert(expense).execute_empty().await
    }

    async fn update_expense(&self, id: i64, update: &ExpenseUpdate) -> Result<()> {
        self.expenses()
            .update(update)
            .eq("id", id)
            .execute::<Expense>()
            .await
            .and_then(require_row)
    }

    async fn delete_expense(&self, id: i64) -> Result<()> {
        self.expenses().delete().eq("id", id).execute_empty().await
    }
}
