//! services/gateway/src/adapters/gateway_client.rs
//!
//! The client side of the HTTP API: an adapter that implements the core's
//! `GatewayService` port with `reqwest`, so the client workflows in
//! `conceptify_core::app` can talk to a running gateway.

use async_trait::async_trait;
use conceptify_core::domain::{HealthStatus, OcrResult, ResultSummary, TextEdit};
use conceptify_core::ports::{GatewayService, PortError, PortResult, Upload};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// The `{error, details}` body of a failed request.
#[derive(Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    details: Option<String>,
}

#[derive(Deserialize)]
struct ResultsPage {
    #[serde(default)]
    results: Vec<ResultSummary>,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `GatewayService` port over HTTP.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
}

impl HttpGateway {
    /// Creates a client for the gateway at `base_url` (e.g. `http://localhost:5001`).
    pub fn new(base_url: &str) -> PortResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| PortError::Validation(format!("Invalid gateway URL '{}': {}", base_url, e)))?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    /// Builds `{base}/api/{segments...}`, escaping each segment.
    fn endpoint(&self, segments: &[&str]) -> PortResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                PortError::Validation(format!("{} cannot be used as a base URL", self.base_url))
            })?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> PortResult<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::failure(status, response).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|e| PortError::MalformedOutput(e.to_string()))
    }

    /// Maps an error response back onto the port's error taxonomy.
    async fn failure(status: StatusCode, response: Response) -> PortError {
        let body = response.text().await.unwrap_or_default();
        let (error, details) = match serde_json::from_str::<WireError>(&body) {
            Ok(wire) => (wire.error, wire.details),
            Err(_) => (body, None),
        };
        debug!("Gateway answered {}: {}", status, error);

        match status {
            StatusCode::BAD_REQUEST => PortError::Validation(error),
            StatusCode::NOT_FOUND => PortError::NotFound(details.unwrap_or(error)),
            StatusCode::CONFLICT => PortError::Conflict(details.unwrap_or(error)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PortError::Unauthorized,
            StatusCode::SERVICE_UNAVAILABLE => PortError::Busy,
            StatusCode::GATEWAY_TIMEOUT => PortError::Timeout(0),
            StatusCode::INTERNAL_SERVER_ERROR if error == "Failed to parse OCR results" => {
                PortError::MalformedOutput(details.unwrap_or_default())
            }
            StatusCode::INTERNAL_SERVER_ERROR => PortError::Extraction {
                message: error,
                details: details.unwrap_or_default(),
            },
            _ => PortError::Unexpected(format!("{}: {}", status, error)),
        }
    }
}

fn network(e: reqwest::Error) -> PortError {
    warn!("Gateway request failed: {}", e);
    PortError::Network(e.to_string())
}

//=========================================================================================
// `GatewayService` Trait Implementation
//=========================================================================================

#[async_trait]
impl GatewayService for HttpGateway {
    async fn health(&self) -> PortResult<HealthStatus> {
        let url = self.endpoint(&["health"])?;
        let response = self.client.get(url).send().await.map_err(network)?;
        Self::decode(response).await
    }

    async fn upload(&self, upload: Upload) -> PortResult<OcrResult> {
        let url = self.endpoint(&["ocr", "process"])?;
        let length = upload.bytes.len() as u64;
        let mut part = Part::stream_with_length(upload.bytes, length).file_name(upload.file_name);
        if let Some(content_type) = &upload.content_type {
            part = part
                .mime_str(content_type)
                .map_err(|e| PortError::Validation(e.to_string()))?;
        }
        let mut form = Form::new().part("file", part);
        if let Some(user_id) = upload.user_id {
            form = form.text("user_id", user_id);
        }

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(network)?;
        Self::decode(response).await
    }

    async fn list_results(&self) -> PortResult<Vec<ResultSummary>> {
        let url = self.endpoint(&["ocr", "results"])?;
        let response = self.client.get(url).send().await.map_err(network)?;
        let page: ResultsPage = Self::decode(response).await?;
        Ok(page.results)
    }

    async fn get_result(&self, filename: &str) -> PortResult<OcrResult> {
        let url = self.endpoint(&["ocr", "result", filename])?;
        let response = self.client.get(url).send().await.map_err(network)?;
        Self::decode(response).await
    }

    async fn update_result(&self, filename: &str, edit: TextEdit) -> PortResult<()> {
        let url = self.endpoint(&["ocr", "update", filename])?;
        let response = self
            .client
            .put(url)
            .json(&edit)
            .send()
            .await
            .map_err(network)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::failure(status, response).await)
        }
    }
}
