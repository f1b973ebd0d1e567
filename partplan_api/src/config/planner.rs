use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        BIOS_BOOT_PARTITION_SIZE, CONFIGDRIVE_PARTITION_SIZE, MASTER_API_PORT,
        MAX_JOURNAL_PARTITION_SIZE, RESERVED_PARTITION_SIZE,
    },
    error::InvalidInputError,
};

/// Tunables of the planner. Every field falls back to the documented default
/// when omitted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct PlannerConfig {
    /// Size of the legacy BIOS boot partition, in megabytes.
    pub bios_boot_size: i64,

    /// Size of the reserved UEFI partition, in megabytes.
    pub reserved_size: i64,

    /// Size of the config-drive partition, in megabytes.
    pub configdrive_size: i64,

    /// Upper bound for a single Ceph journal partition, in megabytes.
    pub max_journal_size: i64,

    /// Port of the control plane API advertised through the config drive.
    pub master_api_port: u16,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            bios_boot_size: BIOS_BOOT_PARTITION_SIZE,
            reserved_size: RESERVED_PARTITION_SIZE,
            configdrive_size: CONFIGDRIVE_PARTITION_SIZE,
            max_journal_size: MAX_JOURNAL_PARTITION_SIZE,
            master_api_port: MASTER_API_PORT,
        }
    }
}

impl PlannerConfig {
    /// Checks that every partition size is positive.
    pub fn validate(&self) -> Result<(), InvalidInputError> {
        let sizes = [
            ("bios-boot-size", self.bios_boot_size),
            ("reserved-size", self.reserved_size),
            ("configdrive-size", self.configdrive_size),
            ("max-journal-size", self.max_journal_size),
        ];
        match sizes.into_iter().find(|(_, value)| *value <= 0) {
            Some((field, value)) => Err(InvalidInputError::InvalidPlannerConfig {
                field: field.into(),
                value,
            }),
            None => Ok(()),
        }
    }
}
