//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system, honouring `RUST_LOG` and defaulting to `info`
pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Initialize logging for tests; repeated calls are ignored
pub fn init_for_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
}
