//! Turns a node's provisioning data and its discovered block devices into a
//! provisioning plan.
//!
//! Planning runs in phases, each consuming the output of the previous one:
//!
//! 1. the desired layout is validated,
//! 2. desired disks are resolved to devices and partitioned
//!    ([`partitioning`]),
//! 3. physical volumes are attached and logical volumes planned
//!    ([`volumes`]),
//! 4. the config-drive scheme is derived from the node identity
//!    ([`configdrive`]),
//! 5. catalog images are mapped onto the planned filesystems ([`image`]).
//!
//! Any failure aborts the whole run; there is no partial plan.

use log::info;

use partplan_api::{
    config::{PlannerConfig, ProvisioningData},
    device::DiscoveredDevice,
    error::{InvalidInputError, PlanError, PlanResultExt},
    plan::{Plan, ProvisioningPlan},
};

pub mod configdrive;
pub mod filesystems;
pub mod image;
pub mod partitioning;
pub mod resolver;
pub mod volumes;

/// Validates the desired layout of `data`.
pub fn validate(data: &ProvisioningData) -> Result<(), PlanError> {
    data.validate()
        .map_err(|e| PlanError::new(InvalidInputError::InvalidLayout(e)))
}

/// Plans partitioning, volume management and filesystems of the node.
#[tracing::instrument(skip_all, fields(hostname = %data.hostname))]
pub fn plan_partitioning(
    data: &ProvisioningData,
    devices: &[DiscoveredDevice],
    config: &PlannerConfig,
) -> Result<Plan, PlanError> {
    validate(data)?;

    let partitions = partitioning::build_partition_plan(data.disks(), devices, config)
        .message("Failed to build partition plan")?;

    let mut filesystems = partitions.filesystems;
    let volumes = volumes::build_volume_plan(
        data.volume_groups(),
        partitions.pending_attachments,
        &mut filesystems,
    )
    .message("Failed to build volume plan")?;

    let plan = Plan {
        disks: partitions.disks,
        raid_arrays: partitions.raid_arrays,
        vg_attachments: volumes.vg_attachments,
        logical_volumes: volumes.logical_volumes,
        filesystems: filesystems.into_vec(),
        configdrive_device: partitions.configdrive_device,
        kernel_params: data.ks_meta.pm_data.kernel_params.clone(),
    };

    info!(
        "Planned {} disk(s), {} partition(s), {} logical volume(s), {} filesystem(s)",
        plan.disks.len(),
        plan.partitions().count(),
        plan.logical_volumes.len(),
        plan.filesystems.len()
    );
    Ok(plan)
}

/// Runs every planning phase for the node described by `data`.
pub fn plan(
    data: &ProvisioningData,
    devices: &[DiscoveredDevice],
    config: &PlannerConfig,
) -> Result<ProvisioningPlan, PlanError> {
    let partitioning = plan_partitioning(data, devices, config)?;

    let configdrive = configdrive::build_configdrive_scheme(data, config)
        .message("Failed to build config-drive scheme")?;

    let images = image::build_image_scheme(&partitioning.filesystems, &data.ks_meta.image_data);

    Ok(ProvisioningPlan {
        partitioning,
        configdrive,
        images,
    })
}
