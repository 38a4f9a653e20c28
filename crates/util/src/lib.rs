pub mod config;

pub use config::{AppConfig, ConfigError, Environment};

/// Loads environment variables from `.env` when available. Missing files
/// are ignored so production deployments need not ship one.
pub fn load_env_file() {
    let _ = dotenvy::dotenv();
}

// Env-var mutations in tests are process-wide; every test module in this
// crate serializes on the same lock.
#[cfg(test)]
pub(crate) static ENV_GUARD: std::sync::LazyLock<std::sync::Mutex<()>> =
    std::sync::LazyLock::new(|| std::sync::Mutex::new(()));
