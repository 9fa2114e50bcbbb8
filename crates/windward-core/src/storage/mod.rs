mod config;
pub mod store;

pub use config::{CompanionConfig, Config, LimitConfig, LogConfig, ShieldConfig, WindConfig};
pub use store::{keys, MemoryStore, SharedStore, StateStore};

use std::path::PathBuf;

/// Returns `~/.config/windward[-dev]/` based on WINDWARD_ENV.
///
/// Set WINDWARD_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("WINDWARD_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("windward-dev")
    } else {
        base_dir.join("windward")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
