//! Row-level access to the shared backend.

use std::fmt;

use async_trait::async_trait;
use orcamentos_shared::Table;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;
use tracing::debug;

use crate::config::RemoteConfig;
use crate::error::{NetError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Lt,
}

impl FilterOp {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Lt => "lt",
        }
    }
}

/// A `column op value` row predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    pub fn lt(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Lt,
            value: value.into(),
        }
    }

    /// `(column, "op.value")` query pair.
    pub fn to_query(&self) -> (String, String) {
        (self.column.clone(), format!("{}.{}", self.op.as_str(), self.value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = if self.ascending { "asc" } else { "desc" };
        write!(f, "{}.{dir}", self.column)
    }
}

/// Transport for table rows. Rows are plain JSON objects; the backend
/// assigns `id`, `created_at` and `updated_at`.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn select(&self, table: Table, filters: &[Filter], order: Option<&Order>)
        -> Result<Vec<Value>>;

    /// Insert one row and return it as stored.
    async fn insert(&self, table: Table, row: Value) -> Result<Value>;

    /// Patch every row matching `filters` and return the updated rows.
    async fn update(&self, table: Table, filters: &[Filter], patch: Value) -> Result<Vec<Value>>;

    /// Delete every row matching `filters` and return the removed rows.
    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<Vec<Value>>;
}

/// [`Backend`] over the PostgREST-style HTTP surface
/// (`{url}/rest/v1/{table}?column=op.value&order=column.dir`).
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: Client,
    config: RemoteConfig,
}

impl RestBackend {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }

    pub fn with_client(client: Client, config: RemoteConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn request(&self, method: Method, table: Table, filters: &[Filter]) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.config.url, table);
        let query: Vec<(String, String)> = filters.iter().map(Filter::to_query).collect();
        debug!(%method, %url, ?query, "Backend request");

        self.client
            .request(method, url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
            .header("Prefer", "return=representation")
            .query(&query)
    }
}

/// Turn a response into its JSON rows, mapping error statuses to
/// [`NetError::Status`] with the backend's `error` message when present.
pub(crate) async fn read_rows(response: Response) -> Result<Vec<Value>> {
    let response = check_status(response).await?;
    Ok(response.json().await?)
}

pub(crate) async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body);
    Err(NetError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl Backend for RestBackend {
    async fn select(
        &self,
        table: Table,
        filters: &[Filter],
        order: Option<&Order>,
    ) -> Result<Vec<Value>> {
        let mut request = self.request(Method::GET, table, filters);
        if let Some(order) = order {
            request = request.query(&[("order", order.to_string())]);
        }
        read_rows(request.send().await?).await
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value> {
        let response = self
            .request(Method::POST, table, &[])
            .json(&row)
            .send()
            .await?;
        read_rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or(NetError::EmptyResponse)
    }

    async fn update(&self, table: Table, filters: &[Filter], patch: Value) -> Result<Vec<Value>> {
        let response = self
            .request(Method::PATCH, table, filters)
            .json(&patch)
            .send()
            .await?;
        read_rows(response).await
    }

    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<Vec<Value>> {
        let response = self.request(Method::DELETE, table, filters).send().await?;
        read_rows(response).await
    }
}
