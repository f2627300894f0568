//! Shared helpers for the `assetdag` integration tests: config builders, a
//! scripted executor, log capture and a timeout guard.

pub mod builders;
pub mod fake_executor;

use std::future::Future;
use std::time::Duration;

use assetdag::logging::LOG_ENV_VAR;
use tracing_subscriber::{EnvFilter, fmt};

/// Upper bound for any single awaited step in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Route `tracing` output into the test harness, which shows it for failing
/// tests only. The filter comes from `ASSETDAG_LOG`, then `RUST_LOG`, and
/// defaults to `info`. Safe to call from every test.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // Only the first call per test binary installs the subscriber.
    let _ = fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .with_target(true)
        .try_init();
}

/// Await `f`, failing the test if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("test step did not finish within {TEST_TIMEOUT:?}"),
    }
}
