//! YAML configuration file adapter.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::SystemConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Reads [`SystemConfig`] from a YAML file.  A missing file yields the
/// defaults; anything else that goes wrong is an error.
pub struct YamlConfigFile {
    path: PathBuf,
}

impl YamlConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for YamlConfigFile {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => SystemConfig::from_yaml(&text),
            // Logging is not up yet; the caller reports the fallback.
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(SystemConfig::default()),
            Err(e) => Err(ConfigError::Unreadable(e.kind())),
        }
    }
}
