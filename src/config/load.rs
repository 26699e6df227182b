//! Reading a run specification from YAML

use super::schema::TrainSpec;
use super::validate::validate_config;
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Load and validate a run specification
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<TrainSpec> {
    let yaml_content = fs::read_to_string(config_path.as_ref()).map_err(|e| {
        Error::Config(format!(
            "Failed to read config file {}: {}",
            config_path.as_ref().display(),
            e
        ))
    })?;

    let spec: TrainSpec = serde_yaml::from_str(&yaml_content)
        .map_err(|e| Error::Config(format!("Failed to parse YAML config: {e}")))?;

    validate_config(&spec).map_err(|e| Error::Config(format!("Invalid config: {e}")))?;

    Ok(spec)
}

/// Write the resolved specification next to the checkpoints
pub fn save_config<P: AsRef<Path>>(spec: &TrainSpec, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let yaml = serde_yaml::to_string(spec)
        .map_err(|e| Error::Serialization(format!("YAML serialization failed: {e}")))?;
    fs::write(path, yaml)?;
    Ok(())
}
