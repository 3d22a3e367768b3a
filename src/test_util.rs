/// Installs a `tracing` subscriber writing to the test output, filtered by `TEST_LOG`
/// (defaults to `error`). Safe to call from every test.
pub fn trace_init() {
    let filter = std::env::var("TEST_LOG").unwrap_or_else(|_| "error".to_owned());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
