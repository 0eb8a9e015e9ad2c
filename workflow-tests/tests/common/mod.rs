//! Common helpers for workflow tests.

use workflow_tests::MockBackend;

/// Spawn a fresh mock backend with tracing initialized.
pub async fn setup() -> MockBackend {
    workflow_tests::init_tracing();
    MockBackend::spawn().await
}
