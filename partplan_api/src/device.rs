use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    constants::DISK_BY_ID_DIRECTORY,
    error::{InvalidInputError, PlanError, ReportError},
};

/// A block device found on the node at provisioning time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    /// Canonical device path, e.g. `/dev/sda`.
    pub device: PathBuf,

    /// Udev link aliases of the device (by-id, by-path, ...).
    #[serde(default)]
    pub links: Vec<PathBuf>,

    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
}

impl DiscoveredDevice {
    /// Parses a snapshot of discovered devices. YAML and JSON are both
    /// accepted.
    pub fn parse_list(contents: &str) -> Result<Vec<Self>, PlanError> {
        serde_yaml::from_str(contents).structured(InvalidInputError::ParseDiscoveredDevices)
    }

    pub fn has_link(&self, link: impl AsRef<Path>) -> bool {
        self.links.iter().any(|l| l == link.as_ref())
    }

    /// Links living under `/dev/disk/by-id`.
    pub fn by_id_links(&self) -> impl Iterator<Item = &PathBuf> {
        self.links
            .iter()
            .filter(|l| l.starts_with(DISK_BY_ID_DIRECTORY))
    }
}
