// Uploader module - sequences chunk uploads against the relay
//
// A file is cut into fixed-size chunks, each chunk is sent (with retries) before
// the next one starts, and a final completion call asks the relay to combine them.

pub mod chunked_upload;
pub mod progress_tracker;
pub mod relay_client;
pub mod retry;
pub mod session;
pub mod source;

pub use chunked_upload::{ChunkedUploader, UploadOutcome};
pub use progress_tracker::{LogProgressObserver, ProgressObserver, ProgressUpdate};
pub use relay_client::{HttpRelayClient, RelayClient};
pub use retry::RetryPolicy;
pub use session::{UploadSession, UploadState};
pub use source::{ChunkSource, FileSource, MemorySource};
