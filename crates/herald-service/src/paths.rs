//! Locations of Herald's state and configuration files.
//!
//! # Storage Structure
//!
//! ```text
//! ~/.herald/
//! ├── config/
//! │   ├── herald.toml   # task and service settings
//! │   └── .env.local    # secrets (TELEGRAM_BOT_TOKEN, ...)
//! └── snapshots/        # last result of every task command
//! ```
//!
//! # Environment Variables
//!
//! - `HERALD_STATE_DIR`: Override the base state directory
//! - `HERALD_CONFIG`: Override the settings file

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Environment variable for custom state directory.
pub const STATE_DIR_ENV: &str = "HERALD_STATE_DIR";

/// Environment variable for a custom settings file.
pub const CONFIG_FILE_ENV: &str = "HERALD_CONFIG";

const DEFAULT_STATE_DIR: &str = ".herald";
const CONFIG_SUBDIR: &str = "config";
const CONFIG_FILE: &str = "herald.toml";
const ENV_FILE: &str = ".env.local";

static STATE_DIR_CACHE: OnceLock<PathBuf> = OnceLock::new();

/// Returns the Herald state directory.
///
/// `HERALD_STATE_DIR` if set (with `~` expanded), else `~/.herald`, else
/// `.herald` in the current directory.
pub fn state_dir() -> PathBuf {
    STATE_DIR_CACHE
        .get_or_init(|| resolve_state_dir(std::env::var(STATE_DIR_ENV).ok().as_deref(), dirs::home_dir()))
        .clone()
}

/// Resolves the state directory from an optional override and home dir.
pub fn resolve_state_dir(override_dir: Option<&str>, home: Option<PathBuf>) -> PathBuf {
    match override_dir.map(str::trim).filter(|s| !s.is_empty()) {
        Some(dir) => expand(dir),
        None => home
            .map(|h| h.join(DEFAULT_STATE_DIR))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR)),
    }
}

/// Returns the config directory.
pub fn config_dir() -> PathBuf {
    state_dir().join(CONFIG_SUBDIR)
}

/// Returns the settings file, honouring `HERALD_CONFIG`.
pub fn config_file() -> PathBuf {
    std::env::var(CONFIG_FILE_ENV)
        .map(|p| expand(&p))
        .unwrap_or_else(|_| config_dir().join(CONFIG_FILE))
}

/// Returns the secrets file loaded at start-up.
pub fn env_file() -> PathBuf {
    config_dir().join(ENV_FILE)
}

/// Expands `~` and environment variables in a user-supplied path.
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| shellexpand::tilde(path).into_owned());
    PathBuf::from(expanded)
}

/// Creates the state and config directories.
pub fn ensure_dirs(state_dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(state_dir.join(CONFIG_SUBDIR))
}
