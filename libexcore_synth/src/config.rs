use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::constants::{DEFAULT_BARREL_OUTER_CM, DEFAULT_LINER_INNER_CM, OUTPUT_EXTENSION};
use super::error::ConfigError;

/// Reference radii (cm) bounding the water gap between the core barrel and the
/// vessel liner. Tally cells between the two are excluded from the fluence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterGap {
    pub barrel_outer_cm: f64,
    pub liner_inner_cm: f64,
}

impl Default for WaterGap {
    fn default() -> Self {
        Self {
            barrel_outer_cm: DEFAULT_BARREL_OUTER_CM,
            liner_inner_cm: DEFAULT_LINER_INNER_CM,
        }
    }
}

/// Structure representing the synthesis configuration. Contains the pathing for the
/// two input files and the output file, as well as the water gap reference radii.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub mpact_path: PathBuf,
    pub shift_path: PathBuf,
    pub output_path: PathBuf,
    #[serde(default)]
    pub water_gap: WaterGap,
}

impl Default for Config {
    /// Generate a new Config object. All paths will be empty/invalid
    fn default() -> Self {
        Self {
            mpact_path: PathBuf::from("None"),
            shift_path: PathBuf::from("None"),
            output_path: PathBuf::from("None"),
            water_gap: WaterGap::default(),
        }
    }
}

impl Config {
    pub fn new(mpact_path: &Path, shift_path: &Path, output_path: &Path) -> Self {
        Self {
            mpact_path: mpact_path.to_path_buf(),
            shift_path: shift_path.to_path_buf(),
            output_path: output_path.to_path_buf(),
            water_gap: WaterGap::default(),
        }
    }

    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Check that both input files exist. Reports the first missing path.
    pub fn inputs_exist(&self) -> Result<(), ConfigError> {
        for path in [&self.mpact_path, &self.shift_path] {
            if !path.exists() {
                return Err(ConfigError::BadFilePath(path.clone()));
            }
        }
        Ok(())
    }

    /// Get the path to the output hdf5 file, appending the .h5 extension if it was omitted
    pub fn get_output_file_name(&self) -> PathBuf {
        let has_extension = self
            .output_path
            .extension()
            .is_some_and(|ext| ext == OUTPUT_EXTENSION);
        if has_extension {
            self.output_path.clone()
        } else {
            let mut name = self.output_path.clone().into_os_string();
            name.push(".");
            name.push(OUTPUT_EXTENSION);
            PathBuf::from(name)
        }
    }
}
