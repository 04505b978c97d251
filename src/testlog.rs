//! Logging setup for tests.

/// Route `log` output through env_logger.  Safe to call from every test.
pub fn setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}
