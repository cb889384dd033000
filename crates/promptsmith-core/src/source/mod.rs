//! Byte-range transports for the position table and the prompt corpus.
//!
//! Both remote files are only ever read in slices. [`RangeSource`] is the seam
//! the search engine talks to; [`HttpRangeSource`] serves it over HTTP range
//! requests and [`FileRangeSource`] from a local copy of the same file.

pub mod file;
pub mod http;

use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use crate::BoxFuture;

pub use file::FileRangeSource;
pub use http::HttpRangeSource;

/// Errors from reading a byte range.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed data: {0}")]
    Malformed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file that can be read in byte ranges.
///
/// Implementations must be `Send + Sync` so reads can be spawned onto the
/// runtime. Uses `BoxFuture` for object safety (allows `Arc<dyn RangeSource>`).
pub trait RangeSource: Send + Sync {
    /// Human-readable location, used in logs.
    fn location(&self) -> &str;

    /// Read the half-open byte range `range`.
    ///
    /// A range running past the end of the file yields the bytes that exist.
    fn read(&self, range: Range<u64>) -> BoxFuture<'_, Result<Vec<u8>, FetchError>>;
}

/// Open a source for `location`: HTTP(S) URLs use range requests, anything
/// else is a local file path.
pub fn open_source(location: &str, timeout: Duration) -> Result<Arc<dyn RangeSource>, FetchError> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Ok(Arc::new(HttpRangeSource::new(location, timeout)?))
    } else {
        Ok(Arc::new(FileRangeSource::new(location)))
    }
}

/// Read `range` from `source`, failing with [`FetchError::Timeout`] if it
/// takes longer than `timeout`.
pub async fn read_with_timeout(
    source: &dyn RangeSource,
    range: Range<u64>,
    timeout: Duration,
) -> Result<Vec<u8>, FetchError> {
    tokio::time::timeout(timeout, source.read(range))
        .await
        .map_err(|_| FetchError::Timeout(timeout))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_source_picks_transport() {
        let timeout = Duration::from_secs(1);
        let http = open_source("https://example.com/pos.dat", timeout).unwrap();
        assert_eq!(http.location(), "https://example.com/pos.dat");

        let file = open_source("/srv/pos.dat", timeout).unwrap();
        assert_eq!(file.location(), "/srv/pos.dat");
    }

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::Status {
            status: 416,
            url: "https://example.com/tags.dat".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unexpected HTTP status 416 from https://example.com/tags.dat"
        );
    }
}
