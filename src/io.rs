//! Loading of input documents and writing of planner output.

use std::path::Path;

use log::{debug, error};
use serde::Serialize;

use partplan_api::{
    config::{ImageCatalog, PlannerConfig, ProvisioningData},
    device::DiscoveredDevice,
    error::{InternalError, InvalidInputError, PlanError, PlanResultExt, ReportError},
};

/// Serialization format of planner output.
#[derive(clap::ValueEnum, Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

fn read_file(path: &Path) -> Result<String, PlanError> {
    debug!("Reading '{}'", path.display());
    std::fs::read_to_string(path).structured(InvalidInputError::ReadInputFile {
        path: path.to_string_lossy().into(),
    })
}

pub fn load_provisioning_data(path: &Path) -> Result<ProvisioningData, PlanError> {
    ProvisioningData::parse(&read_file(path)?)
        .message(format!("Failed to load provisioning data from '{}'", path.display()))
}

pub fn load_devices(path: &Path) -> Result<Vec<DiscoveredDevice>, PlanError> {
    DiscoveredDevice::parse_list(&read_file(path)?)
        .message(format!("Failed to load discovered devices from '{}'", path.display()))
}

pub fn load_image_catalog(path: &Path) -> Result<ImageCatalog, PlanError> {
    serde_yaml::from_str(&read_file(path)?).structured(InvalidInputError::ParseImageCatalog)
}

/// Loads the planner configuration. Without a path, the defaults are used.
pub fn load_planner_config(path: Option<&Path>) -> Result<PlannerConfig, PlanError> {
    match path {
        Some(path) => {
            let config: PlannerConfig = serde_yaml::from_str(&read_file(path)?)
                .structured(InvalidInputError::ParsePlannerConfig)?;
            config.validate().map_err(PlanError::new)?;
            Ok(config)
        }
        None => Ok(PlannerConfig::default()),
    }
}

/// Renders `value` in the requested format.
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String, PlanError> {
    match format {
        OutputFormat::Yaml => serde_yaml::to_string(value).structured(InternalError::SerializePlan),
        OutputFormat::Json => serde_json::to_string_pretty(value)
            .map(|json| json + "\n")
            .structured(InternalError::SerializePlan),
    }
}

/// Writes `contents` to `path`, or to stdout when no path is given.
pub fn write_output(contents: &str, path: Option<&Path>) -> Result<(), PlanError> {
    match path {
        Some(path) => std::fs::write(path, contents).structured(InternalError::WriteOutput {
            path: path.to_string_lossy().into(),
        }),
        None => {
            print!("{contents}");
            Ok(())
        }
    }
}

/// Writes a serialized error to `path`. Failures are only logged, since this
/// already runs on the error path.
///
/// serde_yaml cannot serialize nested enums (e.g. an invalid layout error), so
/// those are written as JSON, which is still a valid YAML document.
pub fn write_error(path: &Path, plan_error: &PlanError) {
    let contents = match serde_yaml::to_string(plan_error) {
        Ok(contents) => contents,
        Err(e) => {
            debug!("Falling back to JSON for error document: {e}");
            match serde_json::to_string_pretty(plan_error) {
                Ok(json) => json + "\n",
                Err(e) => {
                    error!("Failed to serialize error: {e}");
                    return;
                }
            }
        }
    };
    if let Err(e) = std::fs::write(path, contents) {
        error!("Failed to write error to '{}': {e}", path.display());
    }
}
