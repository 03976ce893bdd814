//! User settings for commitguard
//!
//! Settings are loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (COMMITGUARD_*)
//! 3. Settings file (~/.config/commitguard/config.toml)
//! 4. Default values
//!
//! The per-project hook configuration lives in [`crate::hook`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::value::StrDeserializer;
use serde::de::IntoDeserializer;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Store-related settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Root directory of the hook repository cache
    pub home: Option<PathBuf>,

    /// Longest wait for another process holding a store lock
    #[serde(with = "humantime_serde")]
    pub lock_timeout: Duration,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            home: None,
            lock_timeout: Duration::from_secs(60),
        }
    }
}

/// Run-related settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RunSettings {
    /// Kill a hook that runs longer than this
    #[serde(with = "humantime_serde")]
    pub hook_timeout: Option<Duration>,
}

/// Root settings structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Store settings
    pub store: StoreSettings,

    /// Run settings
    pub run: RunSettings,
}

impl Settings {
    /// Load settings from the default file location
    ///
    /// Returns default settings if the file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_settings_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load settings from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Get the default settings file path
    ///
    /// Returns `~/.config/commitguard/config.toml` on Unix
    pub fn default_settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("commitguard").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - COMMITGUARD_HOME: store root
    /// - COMMITGUARD_LOCK_TIMEOUT: lock timeout, e.g. `90s`
    /// - COMMITGUARD_HOOK_TIMEOUT: hook timeout, e.g. `5m`
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    fn with_overrides_from(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(home) = var(commitguard_store::HOME_ENV).filter(|v| !v.is_empty()) {
            self.store.home = Some(PathBuf::from(home));
        }

        if let Some(value) = var("COMMITGUARD_LOCK_TIMEOUT") {
            self.store.lock_timeout = parse_duration("COMMITGUARD_LOCK_TIMEOUT", &value)?;
        }

        if let Some(value) = var("COMMITGUARD_HOOK_TIMEOUT") {
            self.run.hook_timeout = Some(parse_duration("COMMITGUARD_HOOK_TIMEOUT", &value)?);
        }

        Ok(self)
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, home: Option<PathBuf>) -> Self {
        if let Some(home) = home {
            self.store.home = Some(home);
        }

        self
    }

    /// Load settings with all overrides applied
    ///
    /// Priority: CLI > env > settings file > defaults
    pub fn load_with_overrides(home: Option<PathBuf>) -> Result<Self> {
        Ok(Self::load()?.with_env_overrides()?.with_cli_overrides(home))
    }

    /// Store root to use, falling back to the per-user cache directory
    pub fn store_root(&self) -> Result<PathBuf> {
        match &self.store.home {
            Some(home) => Ok(home.clone()),
            None => Ok(commitguard_store::Store::default_directory()?),
        }
    }
}

/// Parse a duration such as `90s` or `2m`; a bare number means seconds
fn parse_duration(name: &str, value: &str) -> Result<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let de: StrDeserializer<'_, serde::de::value::Error> = value.into_deserializer();
    humantime_serde::deserialize(de)
        .map_err(|e| Error::Config(format!("{name} is not a valid duration ({value:?}): {e}")))
}
