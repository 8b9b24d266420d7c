//! Run configuration, loaded from a JSON file.
//!
//! An explicitly given config file wins; otherwise `~/.dnabc.json` is used if
//! it exists; otherwise the defaults apply. Keys missing from a file take
//! their default values, and unrecognised keys are kept so they can be
//! reported in the run summary.

use anyhow::{Context, Error};
use log::info;
use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::read_pair_writer::OutputFormat;
use crate::utils;
use crate::DnabcError;

/// Name of the per-user config file, looked up in the home directory.
pub const DEFAULT_CONFIG_FILENAME: &str = ".dnabc.json";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub output_format: OutputFormat,
    /// Number of barcode mismatches tolerated.
    pub mismatches: usize,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Config {
    pub fn from_reader<R: Read>(reader: R) -> Result<Config, Error> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Config, Error> {
        let path = path.as_ref();
        let reader = utils::open_with_gz(path)?;
        Config::from_reader(reader).with_context(|| format!("error parsing config file {:?}", path))
    }

    /// Path of the per-user config file under `home_dir`.
    pub fn default_path(home_dir: &Path) -> PathBuf {
        home_dir.join(DEFAULT_CONFIG_FILENAME)
    }

    /// Resolve the configuration for a run. `home_dir` is where the per-user
    /// config file is looked up when no explicit file is given.
    pub fn resolve(explicit: Option<&Path>, home_dir: Option<&Path>) -> Result<Config, Error> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => home_dir
                .map(Config::default_path)
                .filter(|p| p.exists()),
        };

        let config = match path {
            Some(p) => {
                info!("loading config from {:?}", p);
                Config::from_path(p)?
            }
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Only exact barcode matching is supported by the command line tool.
    pub fn validate(&self) -> Result<(), DnabcError> {
        if self.mismatches != 0 {
            return Err(DnabcError::UnsupportedMismatches(self.mismatches));
        }
        Ok(())
    }
}
