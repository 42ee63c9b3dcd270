use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;
use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkRequest {
    /// Standard base64 of the chunk bytes.
    #[serde(default)]
    pub chunk: Option<String>,
    pub file_name: String,
    pub chunk_index: u64,
    pub total_chunks: u64,
    pub upload_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkResponse {
    pub success: bool,
    pub chunk_index: u64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    pub file_name: String,
    pub total_chunks: u64,
    pub upload_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub file_name: String,
}

/// The two relay endpoints the uploader depends on.
///
/// `upload_chunk` makes exactly one attempt; retries belong to the caller.
/// `complete_upload` must report a non-2xx status as `CompletionFailed` and a
/// 2xx body that is not a successful completion as `MalformedResponse`.
#[async_trait]
pub trait RelayClient: Send + Sync {
    async fn upload_chunk(&self, request: &ChunkRequest) -> AppResult<ChunkResponse>;

    async fn complete_upload(&self, request: &CompleteRequest) -> AppResult<CompleteResponse>;
}

/// JSON-over-HTTP relay client
pub struct HttpRelayClient {
    client: Client,
    upload_chunk_url: String,
    complete_upload_url: String,
}

impl HttpRelayClient {
    pub fn new(
        upload_chunk_url: impl Into<String>,
        complete_upload_url: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            upload_chunk_url: upload_chunk_url.into(),
            complete_upload_url: complete_upload_url.into(),
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(
            config.upload_chunk_url(),
            config.complete_upload_url(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    async fn upload_chunk(&self, request: &ChunkRequest) -> AppResult<ChunkResponse> {
        log::debug!(
            "POST {} (chunk {} of {})",
            self.upload_chunk_url,
            request.chunk_index + 1,
            request.total_chunks
        );

        let response = self
            .client
            .post(&self.upload_chunk_url)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AppError::relay_error(status.as_u16(), &snippet(&body)));
        }

        let parsed: ChunkResponse = serde_json::from_str(&body)?;
        if !parsed.success {
            return Err(AppError::MalformedResponse(format!(
                "relay reported success=false: {}",
                parsed.message
            )));
        }

        Ok(parsed)
    }

    async fn complete_upload(&self, request: &CompleteRequest) -> AppResult<CompleteResponse> {
        log::debug!("POST {} (upload {})", self.complete_upload_url, request.upload_id);

        let response = self
            .client
            .post(&self.complete_upload_url)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::debug!("Completion response body: {}", snippet(&error_text));
            return Err(AppError::completion_failed(&request.upload_id, status.as_u16()));
        }

        let body = response.text().await?;
        let parsed: CompleteResponse = serde_json::from_str(&body).map_err(|e| {
            AppError::MalformedResponse(format!("completion body is not valid JSON: {}", e))
        })?;
        if !parsed.success {
            return Err(AppError::MalformedResponse(format!(
                "relay reported success=false for completion: {}",
                parsed.message
            )));
        }

        Ok(parsed)
    }
}

fn snippet(text: &str) -> String {
    text.chars().take(300).collect()
}
