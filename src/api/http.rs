//! reqwest-backed [`ApiClient`].
//!
//! The bearer token is read from the key store on every request so a token
//! written by the host after construction is picked up without rebuilding
//! the client. Each request carries an `X-Request-ID` that is also logged.

use agrifield_cache::{KeyStore, keys};
use agrifield_config::ApiConfig;
use agrifield_core::ApiError;
use agrifield_models::{Coordinates, DailyStatus, PermissionsResponse, PunchId, PunchInResponse};
use async_trait::async_trait;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::client::ApiClient;

const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Fields checked, in order, for a human-readable error message.
const MESSAGE_FIELDS: &[&str] = &["message", "detail", "error"];

pub struct HttpApiClient {
    http: reqwest::Client,
    config: ApiConfig,
    store: Arc<dyn KeyStore>,
}

impl HttpApiClient {
    /// Builds the underlying client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Fails when the TLS backend cannot be initialized.
    pub fn new(config: ApiConfig, store: Arc<dyn KeyStore>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("agrifield/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            config,
            store,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    async fn bearer_token(&self) -> Option<String> {
        match self.store.get(keys::AUTH_TOKEN).await {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                warn!(error = %e, "Could not read auth token, sending request without it");
                None
            }
        }
    }

    /// Sends a request and returns the response if its status is a success.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Coordinates>,
    ) -> Result<Response, ApiError> {
        let url = self.config.url(path);
        let request_id = Uuid::new_v4().to_string();
        let start = Instant::now();

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(REQUEST_ID_HEADER, &request_id);
        if let Some(token) = self.bearer_token().await {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(request_id = %request_id, method = %method, url = %url, "Sending request");

        let response = request.send().await.map_err(|e| {
            warn!(
                request_id = %request_id,
                method = %method,
                url = %url,
                error = %e,
                "Request produced no response"
            );
            ApiError::network(e.to_string())
        })?;

        let status = response.status();
        let latency_ms = start.elapsed().as_millis();
        if status.is_success() {
            debug!(
                request_id = %request_id,
                status = %status.as_u16(),
                latency_ms = %latency_ms,
                "Request completed"
            );
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = error_message(status, &text);
        warn!(
            request_id = %request_id,
            method = %method,
            url = %url,
            status = %status.as_u16(),
            latency_ms = %latency_ms,
            message = %message,
            "Request rejected"
        );
        Err(ApiError::status(status.as_u16(), message))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::network(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Picks a message out of an error body, falling back to the raw text and
/// then to the status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(serde_json::Value::Object(fields)) = serde_json::from_str(body) {
        for name in MESSAGE_FIELDS {
            if let Some(serde_json::Value::String(message)) = fields.get(*name)
                && !message.trim().is_empty()
            {
                return message.clone();
            }
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && !trimmed.starts_with('{') && !trimmed.starts_with('<') {
        return trimmed.to_string();
    }

    status
        .canonical_reason()
        .unwrap_or("Request failed")
        .to_string()
}

#[async_trait]
impl ApiClient for HttpApiClient {
    #[instrument(skip(self), fields(http.endpoint = "permissions"))]
    async fn fetch_permissions(&self) -> Result<PermissionsResponse, ApiError> {
        let response = self
            .execute(Method::GET, &self.config.permissions_path, None)
            .await?;
        Self::decode(response).await
    }

    #[instrument(skip(self), fields(http.endpoint = "dashboard"))]
    async fn fetch_daily_status(&self) -> Result<DailyStatus, ApiError> {
        let response = self
            .execute(Method::GET, &self.config.dashboard_path, None)
            .await?;
        Self::decode(response).await
    }

    #[instrument(skip(self, coords), fields(http.endpoint = "punch_in"))]
    async fn punch_in(&self, coords: Coordinates) -> Result<PunchInResponse, ApiError> {
        let response = self
            .execute(Method::POST, &self.config.punch_in_path, Some(&coords))
            .await?;
        Self::decode(response).await
    }

    #[instrument(skip(self, coords), fields(http.endpoint = "punch_out", punch.id = %punch_id))]
    async fn punch_out(&self, punch_id: &PunchId, coords: Coordinates) -> Result<(), ApiError> {
        let path = self.config.punch_out_path(punch_id.as_str());
        self.execute(Method::POST, &path, Some(&coords)).await?;
        Ok(())
    }
}
