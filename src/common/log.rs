//! Logging helpers
//!
//! `RUST_LOG` wins over the level passed in, so a user can always turn on
//! more verbose output without touching the config file.

/// Initialize the global logger
///
/// # Parameters
///
/// * `level` - Default log filter when `RUST_LOG` is unset
pub fn init_logger(level: &str) {
    let env = env_logger::Env::default()
        .filter_or("RUST_LOG", level);

    // Tests and embedders may have installed a logger already
    let _ = env_logger::Builder::from_env(env).try_init();
}
