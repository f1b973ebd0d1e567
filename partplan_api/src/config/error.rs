//! Validation errors for the desired layout.

use serde::{Deserialize, Serialize};

use super::layout::VolumeKind;

/// Identifies structural errors in the desired layout, i.e. errors that can be
/// detected without looking at the node's hardware.
#[derive(thiserror::Error, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutValidationError {
    #[error("Desired layout must declare at least one disk or volume group")]
    EmptyLayout,

    #[error("Disk with size {size} has an empty name")]
    EmptyDiskName { size: i64 },

    #[error("Volume group '{vg}' is declared more than once")]
    DuplicateVolumeGroup { vg: String },

    #[error("Volume group id '{vg}' is not a valid volume group name")]
    InvalidVolumeGroupName { vg: String },

    #[error("Logical volume '{name}' in volume group '{vg}' has an invalid name")]
    InvalidLogicalVolumeName { vg: String, name: String },

    #[error("Logical volume '{name}' is declared more than once in volume group '{vg}'")]
    DuplicateLogicalVolume { vg: String, name: String },

    #[error("Logical volume in volume group '{vg}' has no name")]
    LogicalVolumeWithoutName { vg: String },

    #[error("Disk '{disk}' declares a logical volume, but logical volumes must belong to a volume group")]
    LogicalVolumeOnDisk { disk: String },

    #[error("Volume group '{vg}' declares a volume of kind '{kind}', but only 'lv' is allowed")]
    NonLogicalVolumeInGroup { vg: String, kind: VolumeKind },

    #[error("Physical volume on disk '{disk}' does not name a target volume group")]
    PhysicalVolumeWithoutGroup { disk: String },

    #[error("Volume '{name}' on disk '{disk}' has kind '{kind}', but Ceph volumes must be of kind 'partition'")]
    CephVolumeNotPartition {
        disk: String,
        name: String,
        kind: VolumeKind,
    },
}
