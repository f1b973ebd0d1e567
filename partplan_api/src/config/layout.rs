//! Desired storage layout of a node.
//!
//! The layout is a flat list of spaces: disks carrying partitions and
//! physical volumes, and volume groups carrying logical volumes. Sizes are in
//! megabytes; a size of zero or less means the entry is present but must not
//! be allocated.

use std::collections::BTreeSet;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

use crate::constants::{
    CEPH_JOURNAL_VOLUME_NAME, CEPH_OSD_VOLUME_NAME, DEFAULT_FILESYSTEM, NONE_MOUNT_POINT,
};

use super::error::LayoutValidationError;

lazy_static! {
    /// Names accepted by LVM for volume groups and logical volumes.
    static ref LVM_NAME_REGEX: Regex =
        Regex::new(r"^[a-zA-Z0-9+_.][a-zA-Z0-9+_.-]*$").expect("Failed to compile regex");
}

/// One entry of the desired layout.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Space {
    Disk(DesiredDisk),
    Vg(DesiredVolumeGroup),
}

/// A physical disk the node is expected to have.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DesiredDisk {
    /// Kernel name hint, e.g. `sda`. Used when no udev link matches.
    pub name: String,

    /// Explicit identifier, matched against every udev link of a device,
    /// e.g. `disk/by-path/pci-0000:00:0d.0-scsi-0:0:0:0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Link fragments, matched against the by-id udev links of a device,
    /// e.g. `disk/by-id/wwn-0x5000c5006f2f4b4a`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<String>,

    /// Declared size in megabytes.
    pub size: i64,

    /// Volumes to carve out of this disk, in order.
    pub volumes: Vec<DesiredVolume>,
}

/// A volume group assembled from the physical volumes declared on disks.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DesiredVolumeGroup {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    pub volumes: Vec<DesiredVolume>,
}

/// Kind of a desired volume.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VolumeKind {
    /// A plain partition, optionally formatted and mounted.
    Partition,
    /// A partition that becomes an LVM physical volume.
    Pv,
    /// A partition that becomes a member of a software RAID array.
    Raid,
    /// A logical volume inside a volume group.
    Lv,
    /// Accepted, allocates nothing. The boot partitions are always planned.
    Boot,
    /// Accepted, allocates nothing. Metadata space is carried by `pv` volumes.
    LvmMetaPool,
}

/// A volume request attached to a disk or volume group.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DesiredVolume {
    #[serde(rename = "type")]
    pub kind: VolumeKind,

    /// Role name. `ceph` and `cephjournal` have special meaning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Size in megabytes.
    pub size: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_guid: Option<Uuid>,

    /// Target volume group of a `pv` volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vg: Option<String>,

    /// LVM metadata size of a `pv` volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lvm_meta_size: Option<i64>,
}

impl Space {
    pub fn as_disk(&self) -> Option<&DesiredDisk> {
        match self {
            Space::Disk(disk) => Some(disk),
            Space::Vg(_) => None,
        }
    }

    pub fn as_volume_group(&self) -> Option<&DesiredVolumeGroup> {
        match self {
            Space::Vg(vg) => Some(vg),
            Space::Disk(_) => None,
        }
    }
}

impl DesiredDisk {
    /// Only disks with a positive size take part in planning.
    pub fn is_allocated(&self) -> bool {
        self.size > 0
    }

    /// Volumes with a positive size, in declaration order.
    pub fn allocated_volumes(&self) -> impl Iterator<Item = &DesiredVolume> {
        self.volumes.iter().filter(|v| v.is_allocated())
    }
}

impl DesiredVolumeGroup {
    pub fn allocated_volumes(&self) -> impl Iterator<Item = &DesiredVolume> {
        self.volumes.iter().filter(|v| v.is_allocated())
    }
}

impl DesiredVolume {
    pub fn is_allocated(&self) -> bool {
        self.size > 0
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }

    pub fn is_ceph_journal(&self) -> bool {
        self.is_named(CEPH_JOURNAL_VOLUME_NAME)
    }

    pub fn is_ceph_osd(&self) -> bool {
        self.is_named(CEPH_OSD_VOLUME_NAME)
    }

    /// Mount point of the volume, if it is to be mounted at all.
    pub fn mount_point(&self) -> Option<&str> {
        self.mount
            .as_deref()
            .filter(|mount| *mount != NONE_MOUNT_POINT)
    }

    /// Filesystem type, defaulting to XFS.
    pub fn filesystem(&self) -> &str {
        self.file_system.as_deref().unwrap_or(DEFAULT_FILESYSTEM)
    }
}

/// Checks the desired layout for structural errors.
///
/// Serde already guarantees required fields, known kinds and numeric sizes;
/// this covers the relationships between entries.
pub fn validate_layout(spaces: &[Space]) -> Result<(), LayoutValidationError> {
    if spaces.is_empty() {
        return Err(LayoutValidationError::EmptyLayout);
    }

    let mut vg_ids = BTreeSet::new();
    for space in spaces {
        match space {
            Space::Disk(disk) => validate_disk(disk)?,
            Space::Vg(vg) => {
                if !vg_ids.insert(vg.id.as_str()) {
                    return Err(LayoutValidationError::DuplicateVolumeGroup { vg: vg.id.clone() });
                }
                validate_volume_group(vg)?;
            }
        }
    }

    Ok(())
}

fn validate_disk(disk: &DesiredDisk) -> Result<(), LayoutValidationError> {
    if disk.name.trim().is_empty() {
        return Err(LayoutValidationError::EmptyDiskName { size: disk.size });
    }

    for volume in &disk.volumes {
        match volume.kind {
            VolumeKind::Lv => {
                return Err(LayoutValidationError::LogicalVolumeOnDisk {
                    disk: disk.name.clone(),
                })
            }
            VolumeKind::Pv if volume.vg.as_deref().map_or(true, str::is_empty) => {
                return Err(LayoutValidationError::PhysicalVolumeWithoutGroup {
                    disk: disk.name.clone(),
                })
            }
            _ => {}
        }

        if (volume.is_ceph_journal() || volume.is_ceph_osd())
            && volume.kind != VolumeKind::Partition
        {
            return Err(LayoutValidationError::CephVolumeNotPartition {
                disk: disk.name.clone(),
                name: volume.name.clone().unwrap_or_default(),
                kind: volume.kind,
            });
        }
    }

    Ok(())
}

fn validate_volume_group(vg: &DesiredVolumeGroup) -> Result<(), LayoutValidationError> {
    if !LVM_NAME_REGEX.is_match(&vg.id) {
        return Err(LayoutValidationError::InvalidVolumeGroupName { vg: vg.id.clone() });
    }

    let mut lv_names = BTreeSet::new();
    for volume in &vg.volumes {
        if volume.kind != VolumeKind::Lv {
            return Err(LayoutValidationError::NonLogicalVolumeInGroup {
                vg: vg.id.clone(),
                kind: volume.kind,
            });
        }

        let name = volume
            .name
            .as_deref()
            .ok_or(LayoutValidationError::LogicalVolumeWithoutName { vg: vg.id.clone() })?;
        if !LVM_NAME_REGEX.is_match(name) {
            return Err(LayoutValidationError::InvalidLogicalVolumeName {
                vg: vg.id.clone(),
                name: name.into(),
            });
        }
        if !lv_names.insert(name) {
            return Err(LayoutValidationError::DuplicateLogicalVolume {
                vg: vg.id.clone(),
                name: name.into(),
            });
        }
    }

    Ok(())
}
