//! Player configuration
//!
//! Stored as YAML in the user's config directory.
//! Default location: ~/.config/padchop/config.yaml

use std::path::PathBuf;

use padchop_core::audio::AudioConfig;
use padchop_core::config::EngineConfig;
use padchop_core::control::PlaybackParams;
use padchop_core::NUM_PADS;
use serde::{Deserialize, Serialize};

pub use padchop_core::config::load_config;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Output device and buffer settings
    pub audio: AudioConfig,
    /// Ring sizes, ramps and stretch quality
    pub engine: EngineConfig,
    /// Number of pads a loaded file is chopped into
    /// Default: 16
    pub pad_count: usize,
    /// Parameters every chopped pad starts with
    pub default_pad: PlaybackParams,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            engine: EngineConfig::default(),
            pad_count: NUM_PADS,
            default_pad: PlaybackParams::default(),
        }
    }
}

/// Get the default config file path
pub fn default_config_path() -> PathBuf {
    padchop_core::config::default_config_path("config.yaml")
}
