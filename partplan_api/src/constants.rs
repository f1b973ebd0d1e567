use const_format::formatcp;

// Sizes, in megabytes.

/// Size of the legacy BIOS boot partition placed first on every disk.
pub const BIOS_BOOT_PARTITION_SIZE: i64 = 24;

/// Size of the reserved UEFI partition placed second on every disk.
pub const RESERVED_PARTITION_SIZE: i64 = 200;

/// Size of the partition that receives the config-drive image.
pub const CONFIGDRIVE_PARTITION_SIZE: i64 = 20;

/// Upper bound for a single Ceph journal partition.
pub const MAX_JOURNAL_PARTITION_SIZE: i64 = 10240;

// Volume naming conventions of the desired layout.

/// Volume name marking a Ceph journal device.
pub const CEPH_JOURNAL_VOLUME_NAME: &str = "cephjournal";

/// Volume name marking a Ceph OSD data partition.
pub const CEPH_OSD_VOLUME_NAME: &str = "ceph";

/// None/null mount point.
pub const NONE_MOUNT_POINT: &str = "none";

// Filesystems.

/// Filesystem used when a volume does not declare one.
pub const DEFAULT_FILESYSTEM: &str = "xfs";

/// Longest filesystem label XFS accepts.
pub const MAX_FILESYSTEM_LABEL_LENGTH: usize = 12;

// Devices.

/// Directory under which every block device lives.
pub const DEV_DIRECTORY: &str = "/dev";

/// Directory of by-id udev links.
pub const DISK_BY_ID_DIRECTORY: &str = formatcp!("{DEV_DIRECTORY}/disk/by-id");

/// Prefix of software RAID array devices.
pub const MD_DEVICE_PREFIX: &str = formatcp!("{DEV_DIRECTORY}/md");

// Config drive.

/// Port of the control plane API on the master node.
pub const MASTER_API_PORT: u16 = 8000;

/// Path of the control plane API on the master node.
pub const MASTER_API_PATH: &str = "/api";
