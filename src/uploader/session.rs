use serde::Serialize;
use std::ops::Range;

/// Lifecycle of one upload session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UploadState {
    Idle,
    Uploading { chunk_index: u64 },
    Completing,
    Done,
    Failed,
}

impl UploadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Done | UploadState::Failed)
    }
}

/// One file transfer: every chunk upload plus the completion call.
#[derive(Debug, Clone)]
pub struct UploadSession {
    pub upload_id: String,
    pub file_name: String,
    pub file_size: u64,
    pub chunk_size: u64,
    pub total_chunks: u64,
    state: UploadState,
}

impl UploadSession {
    pub fn new(file_name: &str, file_size: u64, chunk_size: u64) -> Self {
        Self {
            upload_id: generate_upload_id(),
            file_name: file_name.to_string(),
            file_size,
            chunk_size,
            total_chunks: total_chunks(file_size, chunk_size),
            state: UploadState::Idle,
        }
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    /// Advance the state machine. Terminal states are never left.
    pub fn transition(&mut self, next: UploadState) {
        if self.state.is_terminal() {
            log::warn!(
                "Ignoring transition {:?} -> {:?} for finished session {}",
                self.state,
                next,
                self.upload_id
            );
            return;
        }
        log::debug!("Session {}: {:?} -> {:?}", self.upload_id, self.state, next);
        self.state = next;
    }

    pub fn chunk_range(&self, chunk_index: u64) -> Range<u64> {
        chunk_range(chunk_index, self.chunk_size, self.file_size)
    }

    pub fn chunk_ranges(&self) -> impl Iterator<Item = (u64, Range<u64>)> + '_ {
        (0..self.total_chunks).map(move |i| (i, self.chunk_range(i)))
    }

    /// Percentage reported once `chunk_index` has been delivered.
    pub fn progress_after(&self, chunk_index: u64) -> f64 {
        if self.total_chunks == 0 {
            return 100.0;
        }
        (chunk_index + 1) as f64 / self.total_chunks as f64 * 100.0
    }
}

pub fn total_chunks(file_size: u64, chunk_size: u64) -> u64 {
    file_size.div_ceil(chunk_size)
}

pub fn chunk_range(chunk_index: u64, chunk_size: u64, file_size: u64) -> Range<u64> {
    let start = chunk_index * chunk_size;
    let end = ((chunk_index + 1) * chunk_size).min(file_size);
    start..end
}

/// Time-based prefix plus random suffix, both base 36. Not checked for collisions.
pub fn generate_upload_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis().max(0) as u128;
    let random = uuid::Uuid::new_v4().as_u128() >> 64;
    format!("{}{}", to_base36(millis), to_base36(random))
}

fn to_base36(mut value: u128) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
