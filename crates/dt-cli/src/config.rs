//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Default capacity of the event channel between the feed reader and the accountant.
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Number of parsed feed messages buffered ahead of the accountant.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

const fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("channel_capacity", &self.channel_capacity)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("dt.db"),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (DT_*)
        figment = figment.merge(Env::prefixed("DT_"));

        figment.extract()
    }

    /// Path of the lock file guarding single-writer access to the database.
    pub fn lock_path(&self) -> PathBuf {
        self.database_path.with_extension("lock")
    }
}

/// Returns the platform-specific config directory for dt.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("dt"))
}

/// Returns the platform-specific data directory for dt.
///
/// On Linux: `~/.local/share/dt`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("dt"))
}
