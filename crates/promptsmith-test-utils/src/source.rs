//! In-memory [`RangeSource`] with read accounting.

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use promptsmith_core::source::{FetchError, RangeSource};
use promptsmith_core::BoxFuture;

/// Serves byte ranges from a buffer and counts every read.
///
/// ```ignore
/// let source = Arc::new(MemorySource::new(bytes));
/// let resolver = QueryResolver::new(index, source.clone(), timeout);
/// // ...
/// assert_eq!(source.reads(), 2);
/// ```
pub struct MemorySource {
    data: Vec<u8>,
    location: String,
    delay: Option<Duration>,
    failing: bool,
    started: AtomicUsize,
    completed: AtomicUsize,
}

impl MemorySource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            location: "memory".to_string(),
            delay: None,
            failing: false,
            started: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    /// Sleep for `delay` before answering each read.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every read with a network error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Number of reads issued so far.
    pub fn reads(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Number of reads that ran to completion.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

impl RangeSource for MemorySource {
    fn location(&self) -> &str {
        &self.location
    }

    fn read(&self, range: Range<u64>) -> BoxFuture<'_, Result<Vec<u8>, FetchError>> {
        Box::pin(async move {
            self.started.fetch_add(1, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing {
                return Err(FetchError::Network("simulated failure".to_string()));
            }

            let len = self.data.len() as u64;
            let start = range.start.min(len) as usize;
            let end = range.end.min(len) as usize;
            let bytes = self.data[start..end].to_vec();

            self.completed.fetch_add(1, Ordering::SeqCst);
            Ok(bytes)
        })
    }
}
