mod config;
pub mod database;
pub mod debounce;
pub mod snapshot;

pub use config::{BossConfig, Config, EngineConfig, FocusConfig, RewardConfig, RewardPair};
pub use database::{Database, MemoryStore, StateStore};
pub use debounce::Debouncer;
pub use snapshot::{load_state, save_state, LoadReport, BACKUP_KEY_PREFIX, STATE_KEY};

use std::path::PathBuf;

/// Returns `~/.config/questforge[-dev]/` based on QUESTFORGE_ENV.
///
/// Set QUESTFORGE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("QUESTFORGE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("questforge-dev")
    } else {
        base_dir.join("questforge")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
