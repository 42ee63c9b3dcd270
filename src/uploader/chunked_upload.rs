use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::sync::Arc;
use tokio::time::{sleep, Instant};

use crate::config::{Config, DEFAULT_CHUNK_SIZE};
use crate::errors::{AppError, AppResult};

use super::progress_tracker::{
    chunk_message, NoopObserver, ProgressObserver, ProgressUpdate, COMPLETED_MESSAGE,
};
use super::relay_client::{
    ChunkRequest, ChunkResponse, CompleteRequest, CompleteResponse, HttpRelayClient, RelayClient,
};
use super::retry::RetryPolicy;
use super::session::{UploadSession, UploadState};
use super::source::ChunkSource;

/// Result of a session that reached `Done`.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub upload_id: String,
    pub file_name: String,
    pub total_chunks: u64,
    pub bytes_sent: u64,
    pub completion: CompleteResponse,
}

/// Sequential chunked uploader. One chunk in flight at a time, in index order.
pub struct ChunkedUploader {
    client: Arc<dyn RelayClient>,
    observer: Arc<dyn ProgressObserver>,
    retry_policy: RetryPolicy,
    chunk_size: u64,
}

impl ChunkedUploader {
    pub fn new(client: Arc<dyn RelayClient>) -> Self {
        Self {
            client,
            observer: Arc::new(NoopObserver),
            retry_policy: RetryPolicy::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        let client = HttpRelayClient::from_config(config)?;
        Ok(Self::new(Arc::new(client))
            .with_retry_policy(config.retry_policy())
            .with_chunk_size(config.chunk_size_bytes))
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Upload every chunk of `source` in order, then ask the relay to combine them.
    pub async fn upload_file(&self, source: &dyn ChunkSource) -> AppResult<UploadOutcome> {
        let mut session = UploadSession::new(source.file_name(), source.size(), self.chunk_size);
        let start_time = Instant::now();

        log::info!(
            "Starting upload {} for {} ({} bytes, {} chunks)",
            session.upload_id,
            session.file_name,
            session.file_size,
            session.total_chunks
        );
        self.observer.on_state(&session.upload_id, session.state());

        let ranges: Vec<_> = session.chunk_ranges().collect();
        let mut bytes_sent = 0;
        for (chunk_index, range) in ranges {
            self.set_state(&mut session, UploadState::Uploading { chunk_index });

            let delivered = match source.read_range(range.start, range.end).await {
                Ok(chunk) => {
                    self.upload_chunk(
                        &chunk,
                        chunk_index,
                        session.total_chunks,
                        &session.file_name,
                        &session.upload_id,
                    )
                    .await
                }
                Err(e) => Err(e),
            };

            if let Err(e) = delivered {
                log::error!(
                    "Upload {} aborted at chunk {} of {}: {}",
                    session.upload_id,
                    chunk_index + 1,
                    session.total_chunks,
                    e
                );
                self.set_state(&mut session, UploadState::Failed);
                return Err(e);
            }

            bytes_sent += range.end - range.start;
            self.report(
                &session,
                session.progress_after(chunk_index),
                chunk_message(chunk_index, session.total_chunks),
            );
        }

        self.set_state(&mut session, UploadState::Completing);
        let completion = match self
            .complete_upload(&session.file_name, session.total_chunks, &session.upload_id)
            .await
        {
            Ok(completion) => completion,
            Err(e) => {
                log::error!("Completion failed for upload {}: {}", session.upload_id, e);
                self.set_state(&mut session, UploadState::Failed);
                return Err(e);
            }
        };

        self.report(&session, 100.0, COMPLETED_MESSAGE.to_string());
        self.set_state(&mut session, UploadState::Done);

        log::info!(
            "Upload {} finished: {} bytes in {} chunks ({:.1}s)",
            session.upload_id,
            bytes_sent,
            session.total_chunks,
            start_time.elapsed().as_secs_f64()
        );

        Ok(UploadOutcome {
            upload_id: session.upload_id,
            file_name: session.file_name,
            total_chunks: session.total_chunks,
            bytes_sent,
            completion,
        })
    }

    /// Send one chunk, retrying with backoff until the attempt budget runs out.
    pub async fn upload_chunk(
        &self,
        chunk: &[u8],
        chunk_index: u64,
        total_chunks: u64,
        file_name: &str,
        upload_id: &str,
    ) -> AppResult<ChunkResponse> {
        let request = ChunkRequest {
            chunk: Some(BASE64.encode(chunk)),
            file_name: file_name.to_string(),
            chunk_index,
            total_chunks,
            upload_id: upload_id.to_string(),
        };

        let mut attempt = 0;

        loop {
            let error = match self.client.upload_chunk(&request).await {
                Ok(response) => {
                    log::debug!(
                        "Chunk {} of {} accepted: {}",
                        chunk_index + 1,
                        total_chunks,
                        response.message
                    );
                    return Ok(response);
                }
                Err(e) => e,
            };

            log::warn!(
                "Upload attempt {} for chunk {} of {} failed: {}",
                attempt + 1,
                chunk_index + 1,
                total_chunks,
                error
            );

            if !error.is_retryable() {
                return Err(error);
            }

            if self.retry_policy.is_last_attempt(attempt) {
                return Err(AppError::upload_exhausted(chunk_index, attempt + 1, &error));
            }

            let delay = self.retry_policy.delay_for_attempt(attempt);
            log::debug!("Retrying chunk {} in {:?}", chunk_index + 1, delay);
            sleep(delay).await;
            attempt += 1;
        }
    }

    /// Single attempt; a failed completion is never retried.
    pub async fn complete_upload(
        &self,
        file_name: &str,
        total_chunks: u64,
        upload_id: &str,
    ) -> AppResult<CompleteResponse> {
        let request = CompleteRequest {
            file_name: file_name.to_string(),
            total_chunks,
            upload_id: upload_id.to_string(),
        };
        self.client.complete_upload(&request).await
    }

    fn set_state(&self, session: &mut UploadSession, next: UploadState) {
        session.transition(next);
        self.observer.on_state(&session.upload_id, session.state());
    }

    fn report(&self, session: &UploadSession, percent: f64, message: String) {
        self.observer.on_progress(&ProgressUpdate {
            upload_id: session.upload_id.clone(),
            percent,
            message,
        });
    }
}
