//! Query builders for PostgrestClient

use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use crate::error::Error;
use crate::fetch::{FetchBuilder, Service};
use crate::postgrest::types::{ReturnOption, SortOrder};

/// Everything needed to address one table
#[derive(Debug, Clone)]
pub(crate) struct Target {
    pub(crate) url: String,
    pub(crate) key: String,
    pub(crate) schema: String,
    pub(crate) client: Client,
    pub(crate) token: Option<String>,
    pub(crate) timeout: Option<Duration>,
}

impl Target {
    fn fetch(&self, method: Method) -> FetchBuilder<'_> {
        let profile_header = if method == Method::GET {
            "Accept-Profile"
        } else {
            "Content-Profile"
        };
        let bearer = self.token.as_deref().unwrap_or(&self.key);

        FetchBuilder::new(&self.client, &self.url, method, Service::Rest)
            .header("apikey", &self.key)
            .bearer_auth(bearer)
            .header(profile_header, &self.schema)
            .timeout(self.timeout)
    }
}

/// Ordered query parameters; filters on the same column may repeat
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    params: Vec<(String, String)>,
}

impl QueryBuilder {
    /// Create a new QueryBuilder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter to the query
    pub fn add_param(&mut self, key: &str, value: &str) {
        self.params.push((key.to_string(), value.to_string()));
    }

    /// Replace a parameter, used for settings that may appear once
    pub fn set_param(&mut self, key: &str, value: &str) {
        self.params.retain(|(k, _)| k != key);
        self.add_param(key, value);
    }

    /// Match rows where `column` equals `value`
    pub fn add_eq(&mut self, column: &str, value: &str) {
        self.add_param(column, &format!("eq.{}", value));
    }

    /// Get the query parameters
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

/// Builder for SELECT queries
pub struct SelectBuilder {
    target: Target,
    query: QueryBuilder,
}

impl SelectBuilder {
    pub(crate) fn new(target: Target, columns: &str) -> Self {
        let mut query = QueryBuilder::new();
        query.add_param("select", columns);
        Self { target, query }
    }

    /// Filter rows where column equals a value
    pub fn eq<T: ToString>(mut self, column: &str, value: T) -> Self {
        self.query.add_eq(column, &value.to_string());
        self
    }

    /// Order the results by a column
    pub fn order(mut self, column: &str, order: SortOrder) -> Self {
        self.query
            .set_param("order", &format!("{}.{}", column, order.as_str()));
        self
    }

    /// The query parameters built so far
    pub fn params(&self) -> &[(String, String)] {
        self.query.params()
    }

    /// Execute the query and return the results
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<Vec<T>, Error> {
        self.target
            .fetch(Method::GET)
            .query(self.query.params())
            .execute::<Vec<T>>()
            .await
    }

    /// Execute the query expecting exactly one row.
    ///
    /// Zero rows come back as [`Error::NotFound`].
    pub async fn execute_single<T: DeserializeOwned>(&self) -> Result<T, Error> {
        self.target
            .fetch(Method::GET)
            .header("Accept", "application/vnd.pgrst.object+json")
            .query(self.query.params())
            .execute::<T>()
            .await
    }
}

/// Builder for INSERT queries
pub struct InsertBuilder<T: Serialize> {
    target: Target,
    values: T,
}

impl<T: Serialize> InsertBuilder<T> {
    pub(crate) fn new(target: Target, values: T) -> Self {
        Self { target, values }
    }

    /// Execute the insert without returning the inserted data
    pub async fn execute_empty(&self) -> Result<(), Error> {
        self.target
            .fetch(Method::POST)
            .header("Prefer", ReturnOption::Minimal.as_prefer())
            .json(&self.values)?
            .execute_empty()
            .await
    }
}

/// Builder for UPDATE queries
pub struct UpdateBuilder<T: Serialize> {
    target: Target,
    values: T,
    query: QueryBuilder,
}

impl<T: Serialize> UpdateBuilder<T> {
    pub(crate) fn new(target: Target, values: T) -> Self {
        Self {
            target,
            values,
            query: QueryBuilder::new(),
        }
    }

    /// Filter rows where column equals a value
    pub fn eq<V: ToString>(mut self, column: &str, value: V) -> Self {
        self.query.add_eq(column, &value.to_string());
        self
    }

    fn check_filtered(&self) -> Result<(), Error> {
        if self.query.params().is_empty() {
            return Err(Error::invalid_input("update without a filter"));
        }
        Ok(())
    }

    /// Execute the update and return the updated rows; an empty list means nothing matched
    pub async fn execute<R: DeserializeOwned>(&self) -> Result<Vec<R>, Error> {
        self.check_filtered()?;
        self.target
            .fetch(Method::PATCH)
            .header("Prefer", ReturnOption::Representation.as_prefer())
            .query(self.query.params())
            .json(&self.values)?
            .execute::<Vec<R>>()
            .await
    }

}

/// Builder for UPSERT queries
pub struct UpsertBuilder<T: Serialize> {
    target: Target,
    values: T,
    query: QueryBuilder,
}

impl<T: Serialize> UpsertBuilder<T> {
    pub(crate) fn new(target: Target, values: T) -> Self {
        Self {
            target,
            values,
            query: QueryBuilder::new(),
        }
    }

    /// Specify the unique column(s) that decide between insert and update
    pub fn on_conflict(mut self, columns: &str) -> Self {
        self.query.set_param("on_conflict", columns);
        self
    }

    fn prefer(returning: ReturnOption) -> String {
        format!("resolution=merge-duplicates,{}", returning.as_prefer())
    }

    /// Execute the upsert without returning data
    pub async fn execute_empty(&self) -> Result<(), Error> {
        self.target
            .fetch(Method::POST)
            .header("Prefer", &Self::prefer(ReturnOption::Minimal))
            .query(self.query.params())
            .json(&self.values)?
            .execute_empty()
            .await
    }
}

/// Builder for DELETE queries
pub struct DeleteBuilder {
    target: Target,
    query: QueryBuilder,
}

impl DeleteBuilder {
    pub(crate) fn new(target: Target) -> Self {
        Self {
            target,
            query: QueryBuilder::new(),
        }
    }

    /// Filter rows where column equals a value
    pub fn eq<V: ToString>(mut self, column: &str, value: V) -> Self {
        self.query.add_eq(column, &value.to_string());
        self
    }

    /// Execute the delete; an unfiltered delete is refused
    pub async fn execute_empty(&self) -> Result<(), Error> {
        if self.query.params().is_empty() {
            return Err(Error::invalid_input("delete without a filter"));
        }
        self.target
            .fetch(Method::DELETE)
            .header("Prefer", ReturnOption::Minimal.as_prefer())
            .query(self.query.params())
            .execute_empty()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_param_replaces_previous_value() {
        let mut query = QueryBuilder::new();
        query.add_eq("user_id", "u1");
        query.set_param("order", "id.asc");
        query.set_param("order", "id.desc");
        query.add_eq("id", "3");

        assert_eq!(
            query.params(),
            &[
                ("user_id".to_string(), "eq.u1".to_string()),
                ("order".to_string(), "id.desc".to_string()),
                ("id".to_string(), "eq.3".to_string()),
            ]
        );
    }

    #[test]
    fn select_keeps_columns_first() {
        let target = Target {
            url: "http://localhost/rest/v1/Expenses".to_string(),
            key: "anon".to_string(),
            schema: "public".to_string(),
            client: Client::new(),
            token: None,
            timeout: None,
        };
        let select = SelectBuilder::new(target, "*")
            .eq("user_id", "u1")
            .order("id", SortOrder::Descending);

        assert_eq!(select.params()[0], ("select".to_string(), "*".to_string()));
        assert_eq!(select.params()[1], ("user_id".to_string(), "eq.u1".to_string()));
    }
}
