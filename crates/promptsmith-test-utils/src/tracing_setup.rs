//! Captures `promptsmith_core` log output in test runs.

use tracing_subscriber::EnvFilter;

/// Install a subscriber on the test-harness writer, filtered by `RUST_LOG`
/// (default `info`). Later calls are no-ops.
///
/// # Example
///
/// ```ignore
/// #[tokio::test]
/// async fn resolve_logs_search_summary() {
///     promptsmith_test_utils::init_test_tracing();
///     let fixture = CorpusFixture::build(&["1girl, solo"]);
///     let (positions, _) = fixture.sources();
///     let resolver = QueryResolver::new(Arc::new(fixture.index()), positions, TIMEOUT);
///     // `RUST_LOG=promptsmith_core=debug` also shows each position fetch.
///     resolver.resolve(&Query::new(["1girl"], ["solo"]), None).await.unwrap_err();
/// }
/// ```
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_test_writer()
        .try_init();
}
