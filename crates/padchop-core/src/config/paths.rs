//! Standard locations for padchop configuration files

use std::path::PathBuf;

/// Directory holding padchop configuration
///
/// Returns `~/.config/padchop` (platform config dir), falling back to the
/// working directory when no config dir is known.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("padchop")
}

/// Path of a config file inside [`default_config_dir`]
pub fn default_config_path(filename: &str) -> PathBuf {
    default_config_dir().join(filename)
}
