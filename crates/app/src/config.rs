use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use overdub_core::{SessionOptions, TimeScale};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("invalid {field} in {path}: {value} (must be a positive number)")]
    Invalid {
        path: PathBuf,
        field: &'static str,
        value: f64,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("no config directory on this platform")]
    NoConfigDir,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pixels_per_second: f64,
    pub channel_height: f64,
    pub snap_enabled: bool,
    pub snap_grid_seconds: f64,
    pub transport_length_seconds: f64,
    pub sample_rate: u32,
    /// Visual frame interval used when advancing a headless session.
    pub frame_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pixels_per_second: overdub_core::PIXELS_PER_SECOND,
            channel_height: overdub_core::time::CHANNEL_HEIGHT,
            snap_enabled: false,
            snap_grid_seconds: 0.5,
            transport_length_seconds: overdub_core::DEFAULT_TRANSPORT_LENGTH,
            sample_rate: 48_000,
            frame_interval_ms: 16,
        }
    }
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("overdub").join("config.toml"))
    }

    /// Load from the default location, falling back to defaults on any
    /// problem.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(%err, "using default config");
                Self::default()
            }
        }
    }

    /// Load from `path`. A missing file yields defaults; a malformed one
    /// is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        match config.invalid_field() {
            Some((field, value)) => Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                field,
                value,
            }),
            None => Ok(config),
        }
    }

    /// First scale setting that would break pixel conversions.
    fn invalid_field(&self) -> Option<(&'static str, f64)> {
        [
            ("pixels_per_second", self.pixels_per_second),
            ("channel_height", self.channel_height),
        ]
        .into_iter()
        .find(|(_, value)| !(value.is_finite() && *value > 0.0))
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            scale: TimeScale::new(self.pixels_per_second, self.channel_height),
            snap_grid: self.snap_enabled.then_some(self.snap_grid_seconds),
            transport_length: self.transport_length_seconds,
        }
    }
}
