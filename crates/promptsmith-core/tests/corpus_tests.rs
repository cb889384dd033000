//! Reading single prompt lines out of the corpus.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use promptsmith_core::source::{FetchError, FileRangeSource};
use promptsmith_core::CorpusReader;
use promptsmith_test_utils::{CorpusFixture, MemorySource};
use tempfile::TempDir;

const TIMEOUT: Duration = Duration::from_secs(5);

fn reader(bytes: &[u8], window: u64) -> CorpusReader {
    CorpusReader::new(Arc::new(MemorySource::new(bytes)), window, TIMEOUT)
}

#[tokio::test]
async fn test_reads_line_at_offset() {
    let fixture = CorpusFixture::build(&["1girl, solo", "1boy", "2girls, smile"]);
    let (_, corpus) = fixture.sources();
    let reader = CorpusReader::new(corpus, 10_001, TIMEOUT);

    for (offset, prompt) in fixture.offsets.iter().zip(&fixture.prompts) {
        assert_eq!(&reader.prompt_at(*offset).await.unwrap(), prompt);
    }
}

#[tokio::test]
async fn test_strips_carriage_return() {
    let reader = reader(b"a, b\r\nc\r\n", 64);
    assert_eq!(reader.prompt_at(0).await.unwrap(), "a, b");
    assert_eq!(reader.prompt_at(6).await.unwrap(), "c");
}

#[tokio::test]
async fn test_empty_line() {
    let reader = reader(b"a\n\nb\n", 64);
    assert_eq!(reader.prompt_at(2).await.unwrap(), "");
}

#[tokio::test]
async fn test_line_longer_than_window() {
    let reader = reader(b"a very long prompt line\n", 8);
    let err = reader.prompt_at(0).await.unwrap_err();
    assert!(matches!(err, FetchError::Malformed(_)));
}

#[tokio::test]
async fn test_final_line_without_terminator() {
    let reader = reader(b"a\nb", 64);
    assert_eq!(reader.prompt_at(0).await.unwrap(), "a");
    assert!(matches!(
        reader.prompt_at(2).await,
        Err(FetchError::Malformed(_))
    ));
}

#[tokio::test]
async fn test_invalid_utf8() {
    let reader = reader(b"\xff\xfe\n", 64);
    assert!(matches!(
        reader.prompt_at(0).await,
        Err(FetchError::Malformed(_))
    ));
}

#[tokio::test]
async fn test_slow_read_times_out() {
    let source = MemorySource::new(b"a\n".to_vec()).with_delay(Duration::from_millis(500));
    let reader = CorpusReader::new(Arc::new(source), 64, Duration::from_millis(20));
    assert!(matches!(
        reader.prompt_at(0).await,
        Err(FetchError::Timeout(_))
    ));
}

#[tokio::test]
async fn test_reads_from_local_file() {
    let dir = TempDir::new().unwrap();
    let fixture = CorpusFixture::build(&["x, y", "z"]);
    let paths = fixture.write_to(dir.path()).await;

    let reader = CorpusReader::new(Arc::new(FileRangeSource::new(&paths.corpus)), 10_001, TIMEOUT);
    assert_eq!(reader.prompt_at(fixture.offsets[1]).await.unwrap(), "z");
}
