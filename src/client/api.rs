/**
 * Backend HTTP Client
 *
 * Thin JSON transport over the backend's REST-ish API. It knows how to build
 * URLs from the configured API root and how to tell a transport failure from
 * a reply, and nothing else: status codes are not interpreted, and the
 * decoded body is handed back as-is.
 *
 * A reply whose body is not JSON counts as a transport failure, like a
 * refused connection: the backend never produced an API answer.
 */
use reqwest::Client;
use serde_json::Value;

use crate::shared::config::SyncConfig;
use crate::shared::error::{Result, SyncError};
use crate::shared::operation::{BatchEntry, BatchRequest, BatchResponse, Method};

/// Endpoint probed for reachability
pub const PROBE_PATH: &str = "/config";

/// Batch-sync endpoint
pub const SYNC_PATH: &str = "/sync";

/// Backend API client
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    /// Create a client for the configured API root
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| SyncError::transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
        })
    }

    /// Full URL of a backend-relative path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send one request and decode the JSON reply
    ///
    /// # Errors
    ///
    /// `SyncError::Transport` when the request cannot be delivered or the
    /// reply is not JSON. HTTP error statuses are *not* errors here.
    pub async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = self.url(path);
        let mut request = self
            .client
            .request(to_reqwest(method), &url)
            .header("Accept", "application/json");

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let value = response.json::<Value>().await.map_err(|e| {
            SyncError::transport(format!("{} {} returned a non-JSON reply ({}): {}", method, path, status, e))
        })?;

        tracing::debug!(%method, path, %status, "[API] Reply received");
        Ok(value)
    }

    /// Lightweight reachability check
    ///
    /// Any reply, whatever its status or body, means the backend is reachable.
    pub async fn probe(&self) -> Result<()> {
        self.client
            .get(self.url(PROBE_PATH))
            .header("Accept", "application/json")
            .send()
            .await?;
        Ok(())
    }

    /// Submit operations to the batch-sync endpoint
    pub async fn submit_batch<T: BatchEntry>(&self, operations: &[T]) -> Result<BatchResponse> {
        let response = self
            .client
            .post(self.url(SYNC_PATH))
            .header("Accept", "application/json")
            .json(&BatchRequest { operations })
            .send()
            .await?;

        let status = response.status();
        response.json::<BatchResponse>().await.map_err(|e| {
            SyncError::transport(format!("batch endpoint returned an unreadable reply ({}): {}", status, e))
        })
    }
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
        Method::Patch => reqwest::Method::PATCH,
    }
}
