//! TOML configuration of the backup.

use std::io;
use std::path::{Path, PathBuf};

use derive_more::{Display, Error};

use super::MongodumpConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Configuration file contents.
pub struct BackupConfig {
    /// Configuration of the [Mongodump](super::Mongodump) tool.
    #[serde(default)]
    pub dump: MongodumpConfig,
}

/// Errors on reading the configuration file.
#[derive(Debug, Display, Error)]
pub enum ConfigFileError {
    /// The file exists but can't be read.
    #[display("Reading {} failed: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    /// The file isn't valid TOML or has unknown values.
    #[display("Parsing {} failed: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl BackupConfig {
    /// Reads the config at `path`.
    ///
    /// If the file doesn't exist yet, the default config is written to `path` and returned.
    pub fn load_or_init(path: &Path) -> Result<Self, ConfigFileError> {
        match std::fs::read_to_string(path) {
            Ok(config_str) => toml::from_str(&config_str).map_err(|source| ConfigFileError::Parse {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!(
                    "Writing default config to {} because it doesn't exist yet",
                    path.display()
                );
                let default_config = Self::default();
                match toml::to_string_pretty(&default_config) {
                    Ok(config_str) => {
                        if let Err(e) = std::fs::write(path, config_str) {
                            log::warn!("Writing default config to {} failed: {e}", path.display());
                        }
                    }
                    Err(e) => log::warn!("Serializing the default config failed: {e}"),
                }

                Ok(default_config)
            }
            Err(source) => Err(ConfigFileError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}
