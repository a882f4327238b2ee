//! Table operations through the PostgREST API

mod query;
mod types;

use reqwest::Client;
use serde::Serialize;

use crate::config::ClientOptions;

pub use query::*;
pub use types::*;

use query::Target;

/// Client for operations on one table
#[derive(Debug, Clone)]
pub struct PostgrestClient {
    target: Target,
}

impl PostgrestClient {
    /// Create a new PostgrestClient for `table`
    pub fn new(url: &str, key: &str, table: &str, client: Client, options: &ClientOptions) -> Self {
        Self {
            target: Target {
                url: format!("{}/rest/v1/{}", url.trim_end_matches('/'), table),
                key: key.to_string(),
                schema: options.db_schema.clone(),
                client,
                token: None,
                timeout: options.request_timeout,
            },
        }
    }

    /// Send requests with the user's access token instead of the anon key
    pub fn with_auth(mut self, access_token: &str) -> Self {
        self.target.token = Some(access_token.to_string());
        self
    }

    /// Select specific columns from the table
    pub fn select(&self, columns: &str) -> SelectBuilder {
        SelectBuilder::new(self.target.clone(), columns)
    }

    /// Insert rows into the table
    pub fn insert<T: Serialize>(&self, values: T) -> InsertBuilder<T> {
        InsertBuilder::new(self.target.clone(), values)
    }

    /// Update rows in the table
    pub fn update<T: Serialize>(&self, values: T) -> UpdateBuilder<T> {
        UpdateBuilder::new(self.target.clone(), values)
    }

    /// Insert rows, or update them when they collide on a unique column
    pub fn upsert<T: Serialize>(&self, values: T) -> UpsertBuilder<T> {
        UpsertBuilder::new(self.target.clone(), values)
    }

    /// Delete rows from the table
    pub fn delete(&self) -> DeleteBuilder {
        DeleteBuilder::new(self.target.clone())
    }
}
