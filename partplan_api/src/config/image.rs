use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use url::Url;

/// Images to seed filesystems with, keyed by mount point.
pub type ImageCatalog = BTreeMap<String, ImageSource>;

/// Where to fetch a filesystem image from and how it is packaged.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    /// Location of the image.
    pub uri: Url,

    /// Filesystem contained in the image, e.g. `ext4`.
    pub format: String,

    /// How the image is packaged.
    pub container: ImageContainer,
}

/// Packaging of an image.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImageContainer {
    /// Image is a raw filesystem dump.
    Raw,
    /// Image is a gzip-compressed raw filesystem dump.
    Gzip,
}
