use serde::Serialize;

use super::session::UploadState;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub upload_id: String,
    pub percent: f64,
    pub message: String,
}

/// Receives progress for the single in-flight session.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, update: &ProgressUpdate);

    fn on_state(&self, _upload_id: &str, _state: &UploadState) {}
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressUpdate) + Send + Sync,
{
    fn on_progress(&self, update: &ProgressUpdate) {
        self(update)
    }
}

/// Discards every update.
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_progress(&self, _update: &ProgressUpdate) {}
}

/// Writes updates to the log, the way the CLI shows progress.
pub struct LogProgressObserver;

impl ProgressObserver for LogProgressObserver {
    fn on_progress(&self, update: &ProgressUpdate) {
        log::info!(
            "[{}] {:>3}% {}",
            update.upload_id,
            update.percent.round() as u32,
            update.message
        );
    }

    fn on_state(&self, upload_id: &str, state: &UploadState) {
        match state {
            UploadState::Idle => log::debug!("Session {} preparing upload", upload_id),
            UploadState::Uploading { chunk_index } => {
                log::debug!("Session {} uploading chunk {}", upload_id, chunk_index + 1)
            }
            UploadState::Completing => {
                log::info!("Session {}: all chunks delivered, combining", upload_id)
            }
            UploadState::Done => log::info!("Session {} completed", upload_id),
            UploadState::Failed => log::error!("Session {} failed", upload_id),
        }
    }
}

/// Format the status line shown after a chunk lands.
pub fn chunk_message(chunk_index: u64, total_chunks: u64) -> String {
    format!("Uploading chunk {} of {}", chunk_index + 1, total_chunks)
}

pub const COMPLETED_MESSAGE: &str = "Upload completed successfully!";
