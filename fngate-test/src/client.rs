//! Client for invoking a running gateway

use fngate_core::REQUEST_ID_HEADER;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::REQUEST_TIMEOUT_SECS;

/// Status and raw body of a gateway response
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub request_id: Option<String>,
    pub text: String,
}

impl GatewayResponse {
    /// Parse the body as JSON
    pub fn json(&self) -> Result<Value, ClientError> {
        serde_json::from_str(&self.text).map_err(|e| ClientError::Parse(e.to_string()))
    }
}

/// Client for sending invocations to a gateway
pub struct GatewayClient {
    base_url: String,
    client: Client,
}

impl GatewayClient {
    /// Create a new client
    pub fn new(base_url: String) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    /// Create a client whose requests give up after `timeout`
    ///
    /// Hung invocations never respond; a short timeout makes them observable.
    pub fn with_timeout(base_url: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { base_url, client }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Invoke with a full set of body fields
    pub async fn invoke(
        &self,
        handler_path: &str,
        handler_name: &str,
        event: Value,
        context: Value,
    ) -> Result<GatewayResponse, ClientError> {
        let body = json!({
            "handlerPath": handler_path,
            "handlerName": handler_name,
            "event": event,
            "context": context,
        });
        self.post_json("/", &body).await
    }

    /// POST an arbitrary JSON body to `path`
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<GatewayResponse, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;
        Self::read(response).await
    }

    /// POST a text body to `path`
    pub async fn post_text(&self, path: &str, body: &str) -> Result<GatewayResponse, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "text/plain")
            .body(body.to_string())
            .send()
            .await?;
        Self::read(response).await
    }

    /// GET `path` without a body
    pub async fn get(&self, path: &str) -> Result<GatewayResponse, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).send().await?;
        Self::read(response).await
    }

    async fn read(response: reqwest::Response) -> Result<GatewayResponse, ClientError> {
        let status = response.status();
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        let content_type = header(CONTENT_TYPE.as_str());
        let request_id = header(REQUEST_ID_HEADER);
        let text = response.text().await?;

        Ok(GatewayResponse {
            status,
            content_type,
            request_id,
            text,
        })
    }
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl ClientError {
    /// Whether the request gave up waiting for a response
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Request(e) if e.is_timeout())
    }
}
