use async_trait::async_trait;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::errors::{AppError, AppResult};

/// A sized file that can hand out byte ranges on demand.
#[async_trait]
pub trait ChunkSource: Send + Sync {
    fn file_name(&self) -> &str;

    fn size(&self) -> u64;

    /// Bytes in `[start, end)`.
    async fn read_range(&self, start: u64, end: u64) -> AppResult<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    data: Vec<u8>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

#[async_trait]
impl ChunkSource for MemorySource {
    fn file_name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    async fn read_range(&self, start: u64, end: u64) -> AppResult<Vec<u8>> {
        let len = self.data.len();
        let (start, end) = (start as usize, end as usize);
        if start > end || end > len {
            return Err(AppError::Internal(format!(
                "range {}..{} out of bounds for {} bytes",
                start, end, len
            )));
        }
        Ok(self.data[start..end].to_vec())
    }
}

/// A file on disk. The size is captured when the source is opened.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    name: String,
    size: u64,
}

impl FileSource {
    pub async fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(AppError::validation("file_path", "Path is not a file"));
        }

        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        Ok(Self {
            path,
            name,
            size: metadata.len(),
        })
    }
}

#[async_trait]
impl ChunkSource for FileSource {
    fn file_name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    async fn read_range(&self, start: u64, end: u64) -> AppResult<Vec<u8>> {
        let mut file = tokio::fs::File::open(&self.path).await?;
        file.seek(SeekFrom::Start(start)).await?;

        let mut buffer = vec![0u8; end.saturating_sub(start) as usize];
        file.read_exact(&mut buffer).await?;
        Ok(buffer)
    }
}
