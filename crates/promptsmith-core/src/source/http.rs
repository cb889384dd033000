//! HTTP range-request transport.

use std::ops::Range;
use std::time::Duration;

use reqwest::header::RANGE;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::BoxFuture;

use super::{FetchError, RangeSource};

/// Reads byte ranges from a remote file with `Range: bytes=` requests.
pub struct HttpRangeSource {
    client: Client,
    url: String,
    timeout: Duration,
}

impl HttpRangeSource {
    /// Create a source for `url` whose requests time out after `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }
}

impl RangeSource for HttpRangeSource {
    fn location(&self) -> &str {
        &self.url
    }

    fn read(&self, range: Range<u64>) -> BoxFuture<'_, Result<Vec<u8>, FetchError>> {
        Box::pin(async move {
            if range.is_empty() {
                return Ok(Vec::new());
            }

            // HTTP byte ranges are inclusive.
            let header = format!("bytes={}-{}", range.start, range.end - 1);
            debug!(url = %self.url, range = %header, "HTTP range request");

            let resp = self
                .client
                .get(&self.url)
                .header(RANGE, header)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        FetchError::Timeout(self.timeout)
                    } else {
                        FetchError::Network(e.to_string())
                    }
                })?;

            let status = resp.status();
            if status != StatusCode::PARTIAL_CONTENT && status != StatusCode::OK {
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    url: self.url.clone(),
                });
            }

            let body = resp
                .bytes()
                .await
                .map_err(|e| FetchError::Network(e.to_string()))?;

            if status == StatusCode::PARTIAL_CONTENT {
                return Ok(body.to_vec());
            }

            warn!(url = %self.url, "Server ignored range request, slicing full body");
            let len = body.len() as u64;
            let start = range.start.min(len) as usize;
            let end = range.end.min(len) as usize;
            Ok(body[start..end].to_vec())
        })
    }
}
