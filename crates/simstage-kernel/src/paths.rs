//! XDG Base Directory paths for simstage.
//!
//! | Purpose | XDG Variable | Default | simstage Path |
//! |---------|--------------|---------|---------------|
//! | Config | `$XDG_CONFIG_HOME` | `~/.config` | `$XDG_CONFIG_HOME/simstage/config.toml` |

use std::path::PathBuf;

use directories::BaseDirs;

/// Get the config directory.
///
/// Uses `$XDG_CONFIG_HOME/simstage` or falls back to `~/.config/simstage`.
pub fn config_dir() -> PathBuf {
    BaseDirs::new()
        .map(|d| d.config_dir().to_path_buf())
        .unwrap_or_else(|| home_fallback().join(".config"))
        .join("simstage")
}

/// Default location of the user configuration file.
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Fallback home directory when BaseDirs fails.
fn home_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
