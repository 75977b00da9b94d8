//! PostgREST-style HTTP backend.
//!
//! Uses the REST conventions of hosted Postgres backends:
//! - `GET  {base}/rest/v1/{table}?{col}=eq.{owner}&order={col}.desc&limit=N`
//! - `POST {base}/rest/v1/{table}` with `Prefer: resolution=merge-duplicates`

use serde_json::Value;
use tracing::debug;

use super::{RemoteBackend, RemoteError, RemoteQuery};

/// HTTP client for the remote backend.
#[derive(Debug, Clone)]
pub struct RestRemote {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

impl RestRemote {
    /// Create a client for `base_url` authenticated with `api_key`.
    ///
    /// When `access_token` is set it is sent as the bearer token so rows are
    /// scoped to the signed-in user; otherwise the API key is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: &str, access_token: Option<String>) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("kicksync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            access_token,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        request
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// Query-string pairs for a select.
pub(crate) fn query_params(query: &RemoteQuery) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    if let Some((column, owner)) = &query.owner {
        params.push(((*column).to_string(), format!("eq.{owner}")));
    }
    if let Some(order) = query.order {
        let dir = if order.descending { "desc" } else { "asc" };
        params.push(("order".to_string(), format!("{}.{dir}", order.column)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

impl RemoteBackend for RestRemote {
    async fn select(&self, query: &RemoteQuery) -> Result<Vec<Value>, RemoteError> {
        let request = self
            .client
            .get(self.table_url(query.table))
            .query(&query_params(query));
        let response = Self::check(self.authorize(request).send().await?).await?;

        let rows: Value = response.json().await?;
        match rows {
            Value::Array(rows) => {
                debug!(table = query.table, count = rows.len(), "Fetched remote rows");
                Ok(rows)
            }
            other => Err(RemoteError::InvalidResponse(format!(
                "expected an array of rows from {}, got {}",
                query.table,
                type_name(&other)
            ))),
        }
    }

    async fn upsert(&self, table: &'static str, rows: Vec<Value>) -> Result<(), RemoteError> {
        if rows.is_empty() {
            return Ok(());
        }
        let count = rows.len();
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&rows);
        Self::check(self.authorize(request).send().await?).await?;

        debug!(table, count, "Upserted remote rows");
        Ok(())
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_params_for_capped_owner_select() {
        let query = RemoteQuery::table("symptom_logs")
            .owned_by("user_id", "u1")
            .order_by("logged_at", true)
            .limit(Some(200));

        assert_eq!(
            query_params(&query),
            vec![
                ("select".to_string(), "*".to_string()),
                ("user_id".to_string(), "eq.u1".to_string()),
                ("order".to_string(), "logged_at.desc".to_string()),
                ("limit".to_string(), "200".to_string()),
            ]
        );
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let remote = RestRemote::new("https://api.example.test/", "key", None).unwrap();
        assert_eq!(remote.table_url("goals"), "https://api.example.test/rest/v1/goals");
    }
}
