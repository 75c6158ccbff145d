//! HTTP Backend Implementation
//!
//! Client for the chat REST service.
//!
//! # API
//!
//! - `GET  {base}/models`      - available models and the default one
//! - `GET  {base}/health`      - liveness
//! - `POST {base}/chat`        - complete response in one body
//! - `POST {base}/chat/stream` - `data: ` framed chunk stream
//!
//! No read timeout is set on the client: a stalled stream stalls its turn
//! until the transport itself fails.

use std::time::Duration;

use async_trait::async_trait;

use super::traits::{
    ChatBackend, ChatRequest, ChatResponse, ChunkStream, HealthResponse, ModelsResponse,
};
use super::BackendError;
use crate::config::ClientConfig;
use crate::streaming::decode_chunks;

/// Health checks give up after this long
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP chat backend client
#[derive(Clone, Debug)]
pub struct HttpBackend {
    /// Base URL without trailing slash, e.g. `http://localhost:8000/api/v1`
    base_url: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpBackend {
    /// Create a backend for the given base URL
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendError> {
        Ok(Self::with_client(base_url, reqwest::Client::builder().build()?))
    }

    /// Create a backend with a preconfigured HTTP client
    #[must_use]
    pub fn with_client(base_url: impl Into<String>, http_client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http_client,
        }
    }

    /// Create from a [`ClientConfig`]
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, BackendError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        Ok(Self::with_client(config.api_base_url.clone(), builder.build()?))
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an endpoint URL
    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Send a request and reject non-success statuses
    async fn checked(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
    ) -> Result<reqwest::Response, BackendError> {
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(status = %status, operation, "Backend returned an error status");
            return Err(BackendError::status(operation, status));
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    fn name(&self) -> &str {
        "Http"
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(self.endpoint("health"))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                match response.json::<HealthResponse>().await {
                    Ok(health) => tracing::debug!(
                        status = %health.status,
                        version = %health.version,
                        "Backend healthy"
                    ),
                    Err(e) => tracing::debug!(error = %e, "Health body not understood"),
                }
                true
            }
            Ok(response) => {
                tracing::debug!(status = %response.status(), "Health check failed");
                false
            }
            Err(e) => {
                tracing::debug!(error = %e, "Health check failed");
                false
            }
        }
    }

    async fn list_models(&self) -> Result<ModelsResponse, BackendError> {
        let response = self
            .checked(self.http_client.get(self.endpoint("models")), "fetch models")
            .await?;
        let body = response.bytes().await?;
        let models: ModelsResponse = serde_json::from_slice(&body)?;

        tracing::debug!(
            count = models.models.len(),
            default_model = %models.default_model,
            "Fetched models"
        );
        Ok(models)
    }

    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChunkStream, BackendError> {
        let body = request.clone().with_stream(true);
        tracing::info!(
            model = body.model.as_deref().unwrap_or("<default>"),
            history = body.conversation_history.len(),
            "Opening chat stream"
        );

        let response = self
            .checked(
                self.http_client.post(self.endpoint("chat/stream")).json(&body),
                "start chat stream",
            )
            .await?;

        if response.content_length() == Some(0) {
            tracing::error!("Chat stream response has no body");
            return Err(BackendError::NoStream);
        }

        Ok(decode_chunks(response.bytes_stream()))
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse, BackendError> {
        let body = request.clone().with_stream(false);
        let response = self
            .checked(
                self.http_client.post(self.endpoint("chat")).json(&body),
                "send chat message",
            )
            .await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
