use crate::error::{ForkfixError, Result};
use crate::store::{IssueRecord, IssueStore};
use async_trait::async_trait;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Reads pending issues from a table exposed over Supabase's PostgREST API.
#[derive(Clone)]
pub struct SupabaseStore {
    http: reqwest::Client,
    base_url: String,
    key: String,
    table: String,
    order_column: Option<String>,
}

impl std::fmt::Debug for SupabaseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseStore")
            .field("base_url", &self.base_url)
            .field("key", &"[REDACTED]")
            .field("table", &self.table)
            .field("order_column", &self.order_column)
            .finish()
    }
}

impl SupabaseStore {
    pub fn new(base_url: &str, key: &str, table: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            table: table.to_string(),
            order_column: None,
        })
    }

    pub fn with_order_column(mut self, column: Option<String>) -> Self {
        self.order_column = column;
        self
    }

    fn rows_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }
}

#[async_trait]
impl IssueStore for SupabaseStore {
    async fn fetch_all(&self) -> Result<Vec<IssueRecord>> {
        let mut query = vec![("select", "*".to_string())];
        if let Some(column) = &self.order_column {
            query.push(("order", format!("{column}.asc")));
        }

        let response = self
            .http
            .get(self.rows_url())
            .query(&query)
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ForkfixError::Store(format!(
                "{} returned {status}: {body}",
                self.table
            )));
        }

        let rows: Vec<IssueRecord> = response.json().await?;
        tracing::debug!(table = %self.table, rows = rows.len(), "fetched issue rows");
        Ok(rows)
    }
}
