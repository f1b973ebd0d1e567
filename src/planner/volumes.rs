use log::{debug, warn};

use partplan_api::{
    config::DesiredVolumeGroup,
    error::{PlanError, PlanningError},
    plan::{LogicalVolumePlan, VgAttachment},
};

use super::filesystems::FilesystemTable;

/// LVM part of a plan.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VolumePlan {
    pub vg_attachments: Vec<VgAttachment>,
    pub logical_volumes: Vec<LogicalVolumePlan>,
}

/// Attaches the physical volumes recorded during partitioning to their
/// volume groups and plans the logical volumes of every group.
///
/// Every pending attachment must target a declared volume group. Mounted
/// logical volumes get a filesystem in `filesystems`.
#[tracing::instrument(skip_all)]
pub fn build_volume_plan<'a>(
    volume_groups: impl IntoIterator<Item = &'a DesiredVolumeGroup>,
    pending: Vec<VgAttachment>,
    filesystems: &mut FilesystemTable,
) -> Result<VolumePlan, PlanError> {
    let volume_groups = volume_groups.into_iter().collect::<Vec<_>>();

    for attachment in &pending {
        if !volume_groups.iter().any(|vg| vg.id == attachment.vg) {
            return Err(PlanError::new(PlanningError::UndeclaredVolumeGroup {
                device: attachment.pv.to_string_lossy().into(),
                vg: attachment.vg.clone(),
            }));
        }
    }

    let mut logical_volumes = Vec::new();
    for vg in volume_groups {
        let lvs = vg.allocated_volumes().collect::<Vec<_>>();
        if lvs.is_empty() {
            continue;
        }
        if !pending.iter().any(|attachment| attachment.vg == vg.id) {
            warn!(
                "Volume group '{}' has {} logical volume(s) but no physical volumes",
                vg.id,
                lvs.len()
            );
        }

        for volume in lvs {
            // Validation guarantees every volume of a group is a named lv
            let Some(name) = volume.name.as_deref() else {
                return Err(PlanError::internal("Logical volume without a name"));
            };
            let lv = LogicalVolumePlan::new(name, &vg.id, volume.size);
            debug!("Planning logical volume '{}' of {}M", lv.device.display(), lv.size);
            if let Some(mount) = volume.mount_point() {
                filesystems.assign(lv.device.clone(), mount, volume)?;
            }
            logical_volumes.push(lv);
        }
    }

    Ok(VolumePlan {
        vg_attachments: pending,
        logical_volumes,
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use indoc::indoc;

    use partplan_api::{
        config::{validate_layout, LayoutValidationError, Space},
        error::ErrorKind,
        plan::FilesystemAssignment,
    };

    use super::*;

    fn parse_vgs(yaml: &str) -> Vec<DesiredVolumeGroup> {
        serde_yaml::from_str::<Vec<Space>>(yaml)
            .unwrap()
            .into_iter()
            .filter_map(|space| space.as_volume_group().cloned())
            .collect()
    }

    fn attachment(pv: &str, vg: &str) -> VgAttachment {
        VgAttachment {
            pv: pv.into(),
            vg: vg.into(),
            metadata_size: None,
        }
    }

    #[test]
    fn test_volume_plan() {
        let vgs = parse_vgs(indoc! {r#"
            - type: vg
              id: os
              label: Base System
              volumes:
                - {type: lv, name: root, size: 10000, mount: /, disk_label: root}
                - {type: lv, name: swap, size: 2000, mount: swap, file_system: swap}
                - {type: lv, name: empty, size: 0, mount: /empty}
                - {type: lv, name: scratch, size: 500, mount: none}
            - type: vg
              id: image
              volumes:
                - {type: lv, name: glance, size: 8000, mount: /var/lib/glance}
        "#});
        let pending = vec![
            attachment("/dev/sda4", "os"),
            attachment("/dev/sdb3", "image"),
            attachment("/dev/sdb4", "os"),
        ];
        let mut filesystems = FilesystemTable::default();
        let plan = build_volume_plan(&vgs, pending.clone(), &mut filesystems).unwrap();

        assert_eq!(plan.vg_attachments, pending);
        assert_eq!(
            plan.logical_volumes,
            vec![
                LogicalVolumePlan::new("root", "os", 10000),
                LogicalVolumePlan::new("swap", "os", 2000),
                LogicalVolumePlan::new("scratch", "os", 500),
                LogicalVolumePlan::new("glance", "image", 8000),
            ]
        );
        assert_eq!(
            plan.logical_volumes[3].device,
            PathBuf::from("/dev/image/glance")
        );

        assert_eq!(
            filesystems.into_vec(),
            vec![
                FilesystemAssignment {
                    device: "/dev/os/root".into(),
                    mount: "/".into(),
                    fs_type: "xfs".into(),
                    label: Some("root".into()),
                },
                FilesystemAssignment {
                    device: "/dev/os/swap".into(),
                    mount: "swap".into(),
                    fs_type: "swap".into(),
                    label: None,
                },
                FilesystemAssignment {
                    device: "/dev/image/glance".into(),
                    mount: "/var/lib/glance".into(),
                    fs_type: "xfs".into(),
                    label: None,
                },
            ]
        );
    }

    #[test]
    fn test_undeclared_volume_group() {
        let vgs = parse_vgs(indoc! {r#"
            - {type: vg, id: os, volumes: []}
        "#});
        let error = build_volume_plan(
            &vgs,
            vec![attachment("/dev/sda4", "os"), attachment("/dev/sda5", "data")],
            &mut FilesystemTable::default(),
        )
        .unwrap_err();
        assert_eq!(
            error.kind(),
            &ErrorKind::Planning(PlanningError::UndeclaredVolumeGroup {
                device: "/dev/sda5".into(),
                vg: "data".into(),
            })
        );
    }

    #[test]
    fn test_volume_group_without_physical_volumes() {
        let vgs = parse_vgs(indoc! {r#"
            - type: vg
              id: os
              volumes:
                - {type: lv, name: root, size: 1000, mount: /}
        "#});
        // Planned anyway; only a warning is logged
        let mut filesystems = FilesystemTable::default();
        let plan = build_volume_plan(&vgs, Vec::new(), &mut filesystems).unwrap();
        assert!(plan.vg_attachments.is_empty());
        assert_eq!(plan.logical_volumes.len(), 1);
        assert_eq!(filesystems.len(), 1);
    }

    #[test]
    fn test_duplicate_logical_volume_rejected_before_planning() {
        let spaces: Vec<Space> = serde_yaml::from_str(indoc! {r#"
            - type: vg
              id: os
              volumes:
                - {type: lv, name: root, size: 1000, mount: /}
                - {type: lv, name: root, size: 1000, mount: /srv}
        "#})
        .unwrap();
        assert_eq!(
            validate_layout(&spaces),
            Err(LayoutValidationError::DuplicateLogicalVolume {
                vg: "os".into(),
                name: "root".into(),
            })
        );
    }
}
