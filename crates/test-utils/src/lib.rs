//! Shared fixtures for the `kiosk` integration tests: catalog builders,
//! scripted port fakes and a couple of harness helpers.

pub mod builders;
pub mod fakes;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

static TRACING: Once = Once::new();

/// Longer than any install or probe timeout the tests configure.
pub const TEST_DEADLINE: Duration = Duration::from_secs(30);

/// Install a test-captured subscriber once per test binary.
///
/// Output only shows for failing tests; `RUST_LOG=kiosk=trace` widens it.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("kiosk=debug,warn"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `fut`, failing the test if it outlives [`TEST_DEADLINE`].
pub async fn with_timeout<F, T>(fut: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_DEADLINE, fut).await {
        Ok(value) => value,
        Err(_) => panic!("test did not finish within {TEST_DEADLINE:?}"),
    }
}
