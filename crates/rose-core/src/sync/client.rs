//! Remote sync client
//!
//! Thin HTTP client for a PostgREST-style REST endpoint (`{apiUrl}/rest/v1`).
//! Collections are fetched whole with GET; single records are pushed with
//! POST, and with PATCH/DELETE under the change-log policy.
//!
//! Failures never escape as errors: every call resolves to a typed outcome
//! and is logged. No call is made while the cloud config is inactive.

use std::future::Future;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::{Resource, Syncable};
use crate::models::{CloudConfig, Record};

/// Errors from a single remote call
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server responded {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Response body is not a record list: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Result of fetching a whole collection
#[derive(Debug)]
pub enum FetchOutcome<T> {
    /// Sync is disabled or no URL is configured; nothing was sent
    Disabled,
    /// The remote returned rows
    Records(Vec<T>),
    /// The remote answered with an empty list
    Empty,
    /// The request or decoding failed
    Failed(SyncError),
}

impl<T> FetchOutcome<T> {
    /// Collapse to "list or nothing": `Some` only for a successful fetch
    pub fn into_records(self) -> Option<Vec<T>> {
        match self {
            FetchOutcome::Records(records) => Some(records),
            FetchOutcome::Empty => Some(Vec::new()),
            FetchOutcome::Disabled | FetchOutcome::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FetchOutcome::Failed(_))
    }
}

/// Result of pushing one record change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Pushed,
    /// Sync is disabled or no URL is configured; nothing was sent
    Skipped,
    Failed(String),
}

/// Transport used by the coordinator
///
/// [`RemoteClient`] is the HTTP implementation.
pub trait Remote: Send + Sync + 'static {
    /// Fetch the whole remote collection of `T`
    fn fetch<T: Syncable>(
        &self,
        config: &CloudConfig,
    ) -> impl Future<Output = FetchOutcome<T>> + Send;

    /// Append one record
    fn create<T: Syncable>(
        &self,
        config: &CloudConfig,
        record: &T,
    ) -> impl Future<Output = PushOutcome> + Send;

    /// Overwrite the remote row with the same id
    fn update<T: Syncable>(
        &self,
        config: &CloudConfig,
        record: &T,
    ) -> impl Future<Output = PushOutcome> + Send;

    /// Delete the remote row with this id
    fn delete<T: Syncable>(
        &self,
        config: &CloudConfig,
        id: &str,
    ) -> impl Future<Output = PushOutcome> + Send;
}

/// HTTP client for the remote REST endpoint
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    push_sent_at: bool,
}

impl RemoteClient {
    /// Create a client whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rose/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            push_sent_at: false,
        })
    }

    /// Include the `sentAt` column in message push bodies
    ///
    /// Off by default; the shared messages table has no such column.
    pub fn with_sent_at(mut self, enabled: bool) -> Self {
        self.push_sent_at = enabled;
        self
    }

    fn endpoint(config: &CloudConfig, resource: Resource) -> String {
        format!("{}/rest/v1/{}", config.base_url(), resource.path())
    }

    fn authorized(builder: RequestBuilder, config: &CloudConfig) -> RequestBuilder {
        builder
            .header("apikey", &config.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", config.api_key))
    }

    /// GET the whole collection behind `resource`
    pub async fn fetch_collection<T: DeserializeOwned>(
        &self,
        config: &CloudConfig,
        resource: Resource,
    ) -> FetchOutcome<T> {
        if !config.is_active() {
            return FetchOutcome::Disabled;
        }

        let url = format!(
            "{}?{}",
            Self::endpoint(config, resource),
            resource.list_query()
        );
        debug!("GET {}", url);

        match self.get_rows(config, &url).await {
            Ok(rows) if rows.is_empty() => FetchOutcome::Empty,
            Ok(rows) => FetchOutcome::Records(rows),
            Err(e) => {
                warn!("Fetching {} failed: {}", resource, e);
                FetchOutcome::Failed(e)
            }
        }
    }

    async fn get_rows<T: DeserializeOwned>(
        &self,
        config: &CloudConfig,
        url: &str,
    ) -> Result<Vec<T>, SyncError> {
        let response = Self::authorized(self.http.get(url), config).send().await?;
        let response = check_status(response).await?;
        response.json().await.map_err(SyncError::Decode)
    }

    /// POST one record to `resource`
    pub async fn push_record<T: Serialize + ?Sized>(
        &self,
        config: &CloudConfig,
        resource: Resource,
        record: &T,
    ) -> PushOutcome {
        if !config.is_active() {
            return PushOutcome::Skipped;
        }

        let url = Self::endpoint(config, resource);
        debug!("POST {}", url);
        let request = self
            .http
            .post(&url)
            .header("Prefer", "return=minimal")
            .json(record);

        self.send_push(config, request, resource, "push").await
    }

    /// PATCH the row whose id equals `id`
    pub async fn update_record<T: Serialize + ?Sized>(
        &self,
        config: &CloudConfig,
        resource: Resource,
        id: &str,
        record: &T,
    ) -> PushOutcome {
        if !config.is_active() {
            return PushOutcome::Skipped;
        }

        let url = Self::endpoint(config, resource);
        debug!("PATCH {} id={}", url, id);
        let request = self
            .http
            .patch(&url)
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=minimal")
            .json(record);

        self.send_push(config, request, resource, "update").await
    }

    /// DELETE the row whose id equals `id`
    pub async fn delete_record(
        &self,
        config: &CloudConfig,
        resource: Resource,
        id: &str,
    ) -> PushOutcome {
        if !config.is_active() {
            return PushOutcome::Skipped;
        }

        let url = Self::endpoint(config, resource);
        debug!("DELETE {} id={}", url, id);
        let request = self
            .http
            .delete(&url)
            .query(&[("id", format!("eq.{}", id))]);

        self.send_push(config, request, resource, "delete").await
    }

    async fn send_push(
        &self,
        config: &CloudConfig,
        request: RequestBuilder,
        resource: Resource,
        verb: &str,
    ) -> PushOutcome {
        let result = match Self::authorized(request, config).send().await {
            Ok(response) => check_status(response).await.map(drop),
            Err(e) => Err(SyncError::Http(e)),
        };

        match result {
            Ok(()) => PushOutcome::Pushed,
            Err(e) => {
                warn!("Cloud {} to {} failed: {}", verb, resource, e);
                PushOutcome::Failed(e.to_string())
            }
        }
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SyncError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SyncError::Status { status, body })
}

impl Remote for RemoteClient {
    async fn fetch<T: Syncable>(&self, config: &CloudConfig) -> FetchOutcome<T> {
        self.fetch_collection(config, T::RESOURCE).await
    }

    async fn create<T: Syncable>(&self, config: &CloudConfig, record: &T) -> PushOutcome {
        let body = record.wire_body(self.push_sent_at);
        self.push_record(config, T::RESOURCE, &*body).await
    }

    async fn update<T: Syncable>(&self, config: &CloudConfig, record: &T) -> PushOutcome {
        let body = record.wire_body(self.push_sent_at);
        self.update_record(config, T::RESOURCE, record.id(), &*body)
            .await
    }

    async fn delete<T: Syncable>(&self, config: &CloudConfig, id: &str) -> PushOutcome {
        self.delete_record(config, T::RESOURCE, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = CloudConfig::new("https://x.supabase.co/", "k", true);
        assert_eq!(
            RemoteClient::endpoint(&config, Resource::Messages),
            "https://x.supabase.co/rest/v1/messages"
        );
    }

    #[test]
    fn test_into_records_shape() {
        assert_eq!(FetchOutcome::Records(vec![1, 2]).into_records(), Some(vec![1, 2]));
        assert_eq!(FetchOutcome::<i32>::Empty.into_records(), Some(vec![]));
        assert_eq!(FetchOutcome::<i32>::Disabled.into_records(), None);
    }

    #[tokio::test]
    async fn test_inactive_config_sends_nothing() {
        let client = RemoteClient::new(Duration::from_secs(1)).unwrap();
        // An unroutable URL would fail loudly if a request were attempted
        let disabled = CloudConfig::new("http://127.0.0.1:9", "k", false);
        let blank = CloudConfig::new("", "k", true);

        for config in [&disabled, &blank] {
            let fetched = client
                .fetch_collection::<serde_json::Value>(config, Resource::Tasks)
                .await;
            assert!(matches!(fetched, FetchOutcome::Disabled));
            assert_eq!(
                client.push_record(config, Resource::Tasks, &1).await,
                PushOutcome::Skipped
            );
            assert_eq!(
                client.delete_record(config, Resource::Tasks, "x").await,
                PushOutcome::Skipped
            );
        }
    }
}
