use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ImageContainer;

/// Images to lay down onto planned devices.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImageScheme {
    #[serde(default)]
    pub images: Vec<ImageDeployment>,
}

/// One image written to one device.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImageDeployment {
    pub uri: Url,
    pub target_device: PathBuf,
    pub format: String,
    pub container: ImageContainer,
}
