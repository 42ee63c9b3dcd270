use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No chunk data provided")]
    ChunkMissing,

    #[error("Relay error {status}: {message}")]
    RelayError { status: u16, message: String },

    #[error("Malformed relay response: {0}")]
    MalformedResponse(String),

    #[error("Failed to upload chunk {chunk_index} after {attempts} attempts: {last_error}")]
    UploadExhausted {
        chunk_index: u64,
        attempts: u32,
        last_error: String,
    },

    #[error("Failed to complete upload {upload_id} (status {status})")]
    CompletionFailed { upload_id: String, status: u16 },

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Custom result type
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn relay_error(status: u16, message: &str) -> Self {
        Self::RelayError {
            status,
            message: message.to_string(),
        }
    }

    pub fn upload_exhausted(chunk_index: u64, attempts: u32, last_error: &AppError) -> Self {
        Self::UploadExhausted {
            chunk_index,
            attempts,
            last_error: last_error.to_string(),
        }
    }

    pub fn completion_failed(upload_id: &str, status: u16) -> Self {
        Self::CompletionFailed {
            upload_id: upload_id.to_string(),
            status,
        }
    }

    /// Failures a chunk attempt may recover from on the next try.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Network(_)
                | AppError::RelayError { .. }
                | AppError::MalformedResponse(_)
                | AppError::Json(_)
                | AppError::Io(_)
        )
    }
}
