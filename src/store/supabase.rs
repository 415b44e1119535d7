//! PostgREST (Supabase) client for the health probes.

use super::{DataStore, StoreError};
use crate::config::MonitorConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_RANGE};
use serde::Deserialize;
use tracing::debug;

/// PostgREST error body, e.g.
/// `{"code":"42P01","message":"relation \"public.users\" does not exist"}`
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// HTTP client for a Supabase project's REST endpoint
#[derive(Clone)]
pub struct SupabaseStore {
    http: reqwest::Client,
    rest_url: String,
}

impl SupabaseStore {
    /// Build a store from the configured connection parameters.
    ///
    /// Returns `Ok(None)` when either parameter is missing; the probes then
    /// report "not configured" instead of failing.
    pub fn from_config(config: &MonitorConfig) -> Result<Option<Self>, StoreError> {
        let (Some(url), Some(key)) = (
            config.data_store_url.as_deref().filter(|s| !s.is_empty()),
            config.data_store_key.as_deref().filter(|s| !s.is_empty()),
        ) else {
            return Ok(None);
        };
        Self::new(url, key, config.request_timeout()).map(Some)
    }

    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: std::time::Duration,
    ) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key)
            .map_err(|e| StoreError::InvalidResponse(format!("invalid API key header: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| StoreError::InvalidResponse(format!("invalid API key header: {e}")))?;
        headers.insert("apikey", key);
        headers.insert(reqwest::header::AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
        })
    }

    /// REST root; answers without touching any table.
    fn root_url(&self) -> String {
        format!("{}/", self.rest_url)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    /// Turn a non-success response into a `StoreError`, preferring the
    /// PostgREST message so callers can match on it.
    async fn error_from(resp: reqwest::Response) -> StoreError {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        match serde_json::from_str::<PostgrestError>(&body) {
            Ok(err) => {
                debug!(status = %status, code = ?err.code, "PostgREST error");
                StoreError::Query(err.message)
            }
            Err(_) => StoreError::Status { status, body },
        }
    }
}

/// Parse the total from a `Content-Range` header (`0-0/42`, `*/0`).
pub fn parse_content_range_total(value: &str) -> Result<u64, StoreError> {
    let total = value
        .rsplit_once('/')
        .map(|(_, total)| total)
        .ok_or_else(|| StoreError::InvalidResponse(format!("malformed Content-Range '{value}'")))?;
    total.parse().map_err(|_| {
        StoreError::InvalidResponse(format!("Content-Range has no exact total: '{value}'"))
    })
}

#[async_trait]
impl DataStore for SupabaseStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let resp = self.http.get(self.root_url()).send().await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from(resp).await)
        }
    }

    async fn count_rows(&self, table: &str) -> Result<u64, StoreError> {
        let resp = self
            .http
            .head(self.table_url(table))
            .query(&[("select", "*")])
            .header("Prefer", "count=exact")
            .header("Range", "0-0")
            .send()
            .await?;

        if !resp.status().is_success() {
            // HEAD responses carry no body; repeat as GET to read the message.
            let resp = self
                .http
                .get(self.table_url(table))
                .query(&[("select", "*"), ("limit", "1")])
                .send()
                .await?;
            return Err(Self::error_from(resp).await);
        }

        let range = resp
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| StoreError::InvalidResponse("missing Content-Range header".to_string()))?;
        parse_content_range_total(range)
    }
}
