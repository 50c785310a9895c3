//! Logging setup for tests.

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize env_logger once for the whole test binary.
pub fn setup() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}
