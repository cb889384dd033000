//! Prompt fetcher: reads one corpus line at a byte offset.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::debug;

use crate::source::{FetchError, RangeSource, read_with_timeout};

/// Reads single prompts out of the newline-delimited corpus.
pub struct CorpusReader {
    source: Arc<dyn RangeSource>,
    window: u64,
    timeout: Duration,
}

impl CorpusReader {
    /// `window` bytes are read per prompt, so it must cover the longest line.
    pub fn new(source: Arc<dyn RangeSource>, window: u64, timeout: Duration) -> Self {
        Self {
            source,
            window,
            timeout,
        }
    }

    /// Pick one candidate offset uniformly at random.
    pub fn pick<R: Rng + ?Sized>(candidates: &[u32], rng: &mut R) -> Option<u32> {
        candidates.choose(rng).copied()
    }

    /// Read the prompt whose line starts at `offset`.
    ///
    /// Fails with [`FetchError::Malformed`] when the window holds no line
    /// terminator or the line is not valid UTF-8.
    pub async fn prompt_at(&self, offset: u32) -> Result<String, FetchError> {
        let start = u64::from(offset);
        let bytes = read_with_timeout(self.source.as_ref(), start..start + self.window, self.timeout)
            .await?;

        let Some(end) = bytes.iter().position(|&b| b == b'\n') else {
            return Err(FetchError::Malformed(format!(
                "no line terminator within {} bytes of offset {offset} in {}",
                self.window,
                self.source.location()
            )));
        };

        let line = bytes[..end].strip_suffix(b"\r").unwrap_or(&bytes[..end]);
        let prompt = String::from_utf8(line.to_vec()).map_err(|e| {
            FetchError::Malformed(format!("prompt at offset {offset} is not UTF-8: {e}"))
        })?;

        debug!(offset, len = prompt.len(), "Fetched prompt");
        Ok(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_pick() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(CorpusReader::pick(&[], &mut rng), None);
        assert_eq!(CorpusReader::pick(&[42], &mut rng), Some(42));

        let picked = CorpusReader::pick(&[1, 2, 3], &mut rng).unwrap();
        assert!([1, 2, 3].contains(&picked));
    }
}
