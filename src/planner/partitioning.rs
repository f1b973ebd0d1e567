//! # Partition plan builder
//!
//! Turns the desired disks into one partition table per resolved device.
//!
//! Every disk gets, in this order:
//! - a legacy BIOS boot partition,
//! - a reserved UEFI partition,
//! - one partition per allocated `partition`, `pv` and `raid` volume, with
//!   Ceph journal volumes expanded into several journal partitions in place,
//! - the config-drive partition, on the first disk only.
//!
//! State that spans disks (remaining journal slots, the config-drive claim)
//! lives in [`PartitionPlanBuilder`] and is updated one disk at a time.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};

use partplan_api::{
    config::{DesiredDisk, DesiredVolume, LayoutValidationError, PlannerConfig, VolumeKind},
    device::DiscoveredDevice,
    error::{InvalidInputError, PlanError, PlanningError, ReportError},
    plan::{DiskPlan, PartitionFlag, RaidArrayPlan, RaidLevel, VgAttachment},
};

use super::{filesystems::FilesystemTable, resolver::DeviceResolver};

/// Number of Ceph OSD and journal volumes across all allocated disks.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CephCounts {
    pub osds: usize,
    pub journals: usize,
}

impl CephCounts {
    pub fn from_disks<'a>(disks: impl IntoIterator<Item = &'a DesiredDisk>) -> Self {
        disks
            .into_iter()
            .filter(|disk| disk.is_allocated())
            .flat_map(|disk| disk.allocated_volumes())
            .fold(Self::default(), |mut counts, volume| {
                if volume.is_ceph_osd() {
                    counts.osds += 1;
                } else if volume.is_ceph_journal() {
                    counts.journals += 1;
                }
                counts
            })
    }
}

/// Journal partitions to place for one journal volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JournalAllocation {
    pub count: usize,
    pub size: i64,
}

/// Spreads one journal partition per OSD over the journal volumes.
///
/// Each journal volume hosts `ceil(osds / journals)` partitions until the
/// demand is met; the tail volume gets whatever is left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalAllocator {
    counts: CephCounts,
    journals_left: usize,
    max_size: i64,
}

impl JournalAllocator {
    pub fn new(counts: CephCounts, max_size: i64) -> Self {
        Self {
            counts,
            journals_left: counts.osds,
            max_size,
        }
    }

    /// Journal partitions still to be placed.
    pub fn journals_left(&self) -> usize {
        self.journals_left
    }

    /// Journal partitions a single journal volume hosts when spread evenly.
    fn ratio(&self) -> usize {
        (self.counts.osds + self.counts.journals - 1) / self.counts.journals
    }

    /// Allocates journal partitions out of a journal volume of `volume_size`
    /// declared on `disk`.
    pub fn allocate(
        &mut self,
        disk: &str,
        volume_size: i64,
    ) -> Result<JournalAllocation, PlanError> {
        if self.counts.journals == 0 {
            return Err(PlanError::new(PlanningError::NoJournalDevices {
                disk: disk.into(),
                osds: self.counts.osds,
            }));
        }

        let ratio = self.ratio();
        if ratio == 0 {
            warn!("Journal volume on disk '{disk}' is declared, but there are no Ceph OSDs");
            return Ok(JournalAllocation { count: 0, size: 0 });
        }

        let size = (volume_size / ratio as i64).min(self.max_size);
        let count = ratio.min(self.journals_left);
        self.journals_left -= count;

        debug!(
            "Placing {count} journal partition(s) of {size}M on disk '{disk}', {} left",
            self.journals_left
        );
        Ok(JournalAllocation { count, size })
    }
}

/// Partition tables and everything recorded while building them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    pub disks: Vec<DiskPlan>,

    pub raid_arrays: Vec<RaidArrayPlan>,

    /// Physical volumes waiting to be attached to their volume groups.
    pub pending_attachments: Vec<VgAttachment>,

    pub filesystems: FilesystemTable,

    pub configdrive_device: Option<PathBuf>,

    pub ceph: CephCounts,
}

/// Running state of a partition plan build.
pub struct PartitionPlanBuilder<'a> {
    config: &'a PlannerConfig,
    journals: JournalAllocator,
    plan: PartitionPlan,
    resolved: BTreeMap<PathBuf, String>,
}

impl<'a> PartitionPlanBuilder<'a> {
    pub fn new(config: &'a PlannerConfig, ceph: CephCounts) -> Self {
        Self {
            config,
            journals: JournalAllocator::new(ceph, config.max_journal_size),
            plan: PartitionPlan {
                ceph,
                ..Default::default()
            },
            resolved: BTreeMap::new(),
        }
    }

    /// Plans the partition table of `disk`, resolved to `device`.
    pub fn add_disk(&mut self, disk: &DesiredDisk, device: &Path) -> Result<(), PlanError> {
        if let Some(other) = self.resolved.insert(device.into(), disk.name.clone()) {
            return Err(PlanError::new(PlanningError::DiskResolvedTwice {
                disk1: other,
                disk2: disk.name.clone(),
                device: device.to_string_lossy().into(),
            }));
        }

        let mut disk_plan = DiskPlan::new(device);
        disk_plan
            .add_partition(self.config.bios_boot_size)
            .with_flag(PartitionFlag::BiosGrub);
        disk_plan.add_partition(self.config.reserved_size);

        for volume in disk.allocated_volumes() {
            if volume.is_ceph_journal() {
                let allocation = self.journals.allocate(&disk.name, volume.size)?;
                for _ in 0..allocation.count {
                    disk_plan
                        .add_partition(allocation.size)
                        .with_guid(volume.partition_guid);
                }
                continue;
            }

            match volume.kind {
                VolumeKind::Partition => {
                    let name = disk_plan
                        .add_partition(volume.size)
                        .with_guid(volume.partition_guid)
                        .name
                        .clone();
                    if let Some(mount) = volume.mount_point() {
                        self.plan.filesystems.assign(name, mount, volume)?;
                    }
                }
                VolumeKind::Pv => {
                    let pv = disk_plan.add_partition(volume.size).name.clone();
                    let vg = volume.vg.clone().structured(InvalidInputError::InvalidLayout(
                        LayoutValidationError::PhysicalVolumeWithoutGroup {
                            disk: disk.name.clone(),
                        },
                    ))?;
                    self.plan.pending_attachments.push(VgAttachment {
                        pv,
                        vg,
                        metadata_size: volume.lvm_meta_size,
                    });
                }
                VolumeKind::Raid => {
                    let member = disk_plan.add_partition(volume.size).name.clone();
                    if let Some(mount) = volume.mount_point() {
                        self.attach_raid_member(member, mount, volume)?;
                    }
                }
                VolumeKind::Lv | VolumeKind::Boot | VolumeKind::LvmMetaPool => {
                    debug!(
                        "Volume of kind '{}' on disk '{}' allocates no partition",
                        volume.kind, disk.name
                    );
                }
            }
        }

        if self.plan.configdrive_device.is_none() {
            let partition = disk_plan.add_partition(self.config.configdrive_size);
            partition.configdrive = true;
            self.plan.configdrive_device = Some(partition.name.clone());
        }

        self.plan.disks.push(disk_plan);
        Ok(())
    }

    /// Adds `member` to the RAID array grouped under `mount`, creating the
    /// array and its filesystem on first use.
    fn attach_raid_member(
        &mut self,
        member: PathBuf,
        mount: &str,
        volume: &DesiredVolume,
    ) -> Result<(), PlanError> {
        let index = match self.plan.raid_arrays.iter().position(|md| md.mount == mount) {
            Some(index) => index,
            None => {
                let name = RaidArrayPlan::device_name(self.plan.raid_arrays.len());
                self.plan.filesystems.assign(name.clone(), mount, volume)?;
                self.plan.raid_arrays.push(RaidArrayPlan {
                    name,
                    level: RaidLevel::Mirror,
                    mount: mount.into(),
                    devices: Vec::new(),
                });
                self.plan.raid_arrays.len() - 1
            }
        };
        self.plan.raid_arrays[index].devices.push(member);
        Ok(())
    }

    pub fn finish(self) -> PartitionPlan {
        if self.journals.journals_left() > 0 {
            warn!(
                "{} Ceph OSD(s) were left without a journal partition",
                self.journals.journals_left()
            );
        }
        self.plan
    }
}

/// Builds partition tables for all allocated `disks` against the discovered
/// `devices`. Disks are processed in the given order, which decides where
/// the config-drive partition goes.
#[tracing::instrument(skip_all)]
pub fn build_partition_plan<'d>(
    disks: impl IntoIterator<Item = &'d DesiredDisk>,
    devices: &[DiscoveredDevice],
    config: &PlannerConfig,
) -> Result<PartitionPlan, PlanError> {
    let disks = disks
        .into_iter()
        .filter(|disk| disk.is_allocated())
        .collect::<Vec<_>>();
    let ceph = CephCounts::from_disks(disks.iter().copied());
    info!(
        "Planning partitions for {} disk(s), {} Ceph OSD(s), {} journal volume(s)",
        disks.len(),
        ceph.osds,
        ceph.journals
    );

    let resolver = DeviceResolver::new(devices);
    let mut builder = PartitionPlanBuilder::new(config, ceph);
    for disk in disks {
        let device = resolver.resolve(disk)?;
        builder.add_disk(disk, device)?;
    }

    let plan = builder.finish();
    if plan.configdrive_device.is_none() {
        warn!("No disk to host the config-drive partition");
    }
    Ok(plan)
}
