//! Output of a planning run.
//!
//! A plan is a fully resolved description of what the executor has to do on
//! the node: which partitions to create on which device, how to assemble
//! software RAID arrays and LVM volume groups, and which filesystems to create
//! where. Sizes are in megabytes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use uuid::Uuid;

use crate::{
    constants::{DEV_DIRECTORY, MD_DEVICE_PREFIX},
    is_default,
};

mod configdrive;
mod image;

pub use configdrive::{
    ConfigDriveCommon, ConfigDriveMcollective, ConfigDrivePuppet, ConfigDriveScheme,
};
pub use image::{ImageDeployment, ImageScheme};

/// Everything produced for a node by one planning run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProvisioningPlan {
    pub partitioning: Plan,
    pub configdrive: ConfigDriveScheme,
    #[serde(default, skip_serializing_if = "is_default")]
    pub images: ImageScheme,
}

/// Partitioning, volume management and filesystem layout of a node.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Plan {
    /// One entry per resolved disk, in the order the disks were declared.
    pub disks: Vec<DiskPlan>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raid_arrays: Vec<RaidArrayPlan>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vg_attachments: Vec<VgAttachment>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logical_volumes: Vec<LogicalVolumePlan>,

    /// Filesystems to create, at most one per device.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filesystems: Vec<FilesystemAssignment>,

    /// Partition that receives the config-drive image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configdrive_device: Option<PathBuf>,

    /// Kernel command line of the provisioned OS.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kernel_params: String,
}

impl Plan {
    pub fn disk(&self, device: impl AsRef<Path>) -> Option<&DiskPlan> {
        self.disks.iter().find(|d| d.device == device.as_ref())
    }

    pub fn partitions(&self) -> impl Iterator<Item = &PartitionSpec> {
        self.disks.iter().flat_map(|d| d.partitions.iter())
    }

    pub fn filesystem(&self, device: impl AsRef<Path>) -> Option<&FilesystemAssignment> {
        self.filesystems
            .iter()
            .find(|fs| fs.device == device.as_ref())
    }

    pub fn filesystem_by_mount(&self, mount: &str) -> Option<&FilesystemAssignment> {
        self.filesystems.iter().find(|fs| fs.mount == mount)
    }
}

/// Partition table scheme. Only GPT is produced.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PartitionTableType {
    #[default]
    Gpt,
}

/// Partition table of one resolved disk.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DiskPlan {
    /// Resolved device path.
    pub device: PathBuf,

    pub partition_table_type: PartitionTableType,

    /// Whether a bootloader is installed on this disk.
    pub install_bootloader: bool,

    /// Partitions in on-disk order.
    pub partitions: Vec<PartitionSpec>,
}

impl DiskPlan {
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
            partition_table_type: PartitionTableType::Gpt,
            install_bootloader: true,
            partitions: Vec::new(),
        }
    }

    /// Appends a partition of the given size and returns it for further
    /// configuration.
    pub fn add_partition(&mut self, size: i64) -> &mut PartitionSpec {
        let number = self.partitions.len() as u32 + 1;
        self.partitions.push(PartitionSpec {
            name: partition_device_name(&self.device, number),
            number,
            size,
            flags: Vec::new(),
            guid: None,
            configdrive: false,
        });
        let index = self.partitions.len() - 1;
        &mut self.partitions[index]
    }
}

/// Flags that can be set on a partition.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PartitionFlag {
    /// Partition holds the legacy BIOS boot loader stage.
    BiosGrub,
}

/// One partition to create.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PartitionSpec {
    /// Device path the partition will have, e.g. `/dev/sda3`.
    pub name: PathBuf,

    /// 1-based partition number.
    pub number: u32,

    pub size: i64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<PartitionFlag>,

    /// GPT partition type GUID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<Uuid>,

    /// Whether the config-drive image is written to this partition.
    #[serde(default)]
    pub configdrive: bool,
}

impl PartitionSpec {
    pub fn with_flag(&mut self, flag: PartitionFlag) -> &mut Self {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
        self
    }

    pub fn with_guid(&mut self, guid: Option<Uuid>) -> &mut Self {
        self.guid = guid;
        self
    }
}

/// Device path of partition `number` on `disk`.
///
/// Disks whose name ends in a digit separate the partition number with a `p`
/// (`/dev/nvme0n1p1`), all others do not (`/dev/sda1`).
pub fn partition_device_name(disk: impl AsRef<Path>, number: u32) -> PathBuf {
    let disk = disk.as_ref().to_string_lossy();
    let separator = if disk.ends_with(|c: char| c.is_ascii_digit()) {
        "p"
    } else {
        ""
    };
    PathBuf::from(format!("{disk}{separator}{number}"))
}

/// RAID level of a software array.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RaidLevel {
    #[default]
    Mirror,
}

/// Software RAID array assembled from partitions sharing a mount point.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RaidArrayPlan {
    /// Array device, e.g. `/dev/md0`.
    pub name: PathBuf,

    pub level: RaidLevel,

    /// Mount point the members were grouped by.
    pub mount: String,

    /// Member partitions, in declaration order.
    pub devices: Vec<PathBuf>,
}

impl RaidArrayPlan {
    /// Device path of the array with the given index.
    pub fn device_name(index: usize) -> PathBuf {
        PathBuf::from(format!("{MD_DEVICE_PREFIX}{index}"))
    }
}

/// A partition joining a volume group as a physical volume.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VgAttachment {
    pub pv: PathBuf,

    pub vg: String,

    /// LVM metadata size, in megabytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_size: Option<i64>,
}

/// A logical volume to carve out of a volume group.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LogicalVolumePlan {
    pub name: String,

    pub vg: String,

    pub size: i64,

    /// Device path of the logical volume, `/dev/<vg>/<lv>`.
    pub device: PathBuf,
}

impl LogicalVolumePlan {
    pub fn new(name: impl Into<String>, vg: impl Into<String>, size: i64) -> Self {
        let name = name.into();
        let vg = vg.into();
        let device = Path::new(DEV_DIRECTORY).join(&vg).join(&name);
        Self {
            name,
            vg,
            size,
            device,
        }
    }
}

/// A filesystem to create on a device.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FilesystemAssignment {
    pub device: PathBuf,

    pub mount: String,

    pub fs_type: String,

    /// Filesystem label. Absent means no label is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_device_name() {
        let cases = [
            ("/dev/sda", 1, "/dev/sda1"),
            ("/dev/vdb", 12, "/dev/vdb12"),
            ("/dev/nvme0n1", 3, "/dev/nvme0n1p3"),
            ("/dev/mmcblk0", 1, "/dev/mmcblk0p1"),
            ("/dev/loop7", 2, "/dev/loop7p2"),
            ("/dev/cciss/c0d0", 1, "/dev/cciss/c0d0p1"),
        ];
        for (disk, number, expected) in cases {
            assert_eq!(
                partition_device_name(disk, number),
                PathBuf::from(expected),
                "unexpected partition name for '{disk}' #{number}"
            );
        }
    }

    #[test]
    fn test_add_partition() {
        let mut disk = DiskPlan::new("/dev/sda");
        assert!(disk.install_bootloader);
        assert_eq!(disk.partition_table_type, PartitionTableType::Gpt);

        disk.add_partition(24)
            .with_flag(PartitionFlag::BiosGrub)
            .with_flag(PartitionFlag::BiosGrub);
        let guid = Uuid::new_v4();
        disk.add_partition(100).with_guid(Some(guid));

        assert_eq!(disk.partitions.len(), 2);
        assert_eq!(disk.partitions[0].flags, vec![PartitionFlag::BiosGrub]);
        assert_eq!(disk.partitions[1].name, PathBuf::from("/dev/sda2"));
        assert_eq!(disk.partitions[1].number, 2);
        assert_eq!(disk.partitions[1].guid, Some(guid));
        assert!(!disk.partitions[1].configdrive);
    }

    #[test]
    fn test_device_names() {
        assert_eq!(RaidArrayPlan::device_name(0), PathBuf::from("/dev/md0"));
        assert_eq!(
            LogicalVolumePlan::new("root", "os", 1000).device,
            PathBuf::from("/dev/os/root")
        );
    }

    #[test]
    fn test_serialize_partition_flags() {
        let mut disk = DiskPlan::new("/dev/sda");
        disk.add_partition(24).with_flag(PartitionFlag::BiosGrub);
        let yaml = serde_yaml::to_string(&disk).unwrap();
        assert!(yaml.contains("partitionTableType: gpt"));
        assert!(yaml.contains("- bios_grub"));
        assert!(yaml.contains("name: /dev/sda1"));
    }
}
