//! Local-file transport with the same range semantics as HTTP.

use std::io::SeekFrom;
use std::ops::Range;
use std::path::PathBuf;

use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::BoxFuture;

use super::{FetchError, RangeSource};

/// Reads byte ranges from a file on disk.
pub struct FileRangeSource {
    path: PathBuf,
    location: String,
}

impl FileRangeSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let location = path.display().to_string();
        Self { path, location }
    }
}

impl RangeSource for FileRangeSource {
    fn location(&self) -> &str {
        &self.location
    }

    fn read(&self, range: Range<u64>) -> BoxFuture<'_, Result<Vec<u8>, FetchError>> {
        Box::pin(async move {
            if range.is_empty() {
                return Ok(Vec::new());
            }

            let mut file = tokio::fs::File::open(&self.path).await?;
            file.seek(SeekFrom::Start(range.start)).await?;

            let mut buf = Vec::with_capacity((range.end - range.start) as usize);
            file.take(range.end - range.start)
                .read_to_end(&mut buf)
                .await?;
            Ok(buf)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_requested_range() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("corpus.dat");
        tokio::fs::write(&path, b"0123456789").await.unwrap();

        let source = FileRangeSource::new(&path);
        assert_eq!(source.read(2..5).await.unwrap(), b"234");
        assert_eq!(source.read(8..20).await.unwrap(), b"89");
        assert!(source.read(4..4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let source = FileRangeSource::new("/nonexistent/corpus.dat");
        assert!(matches!(source.read(0..4).await, Err(FetchError::Io(_))));
    }
}
