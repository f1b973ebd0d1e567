use std::path::PathBuf;

use log::debug;

use partplan_api::{
    config::DesiredVolume,
    constants::MAX_FILESYSTEM_LABEL_LENGTH,
    error::{InternalError, PlanError},
    plan::FilesystemAssignment,
};

/// Ordered filesystem assignments, keyed by target device.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FilesystemTable {
    assignments: Vec<FilesystemAssignment>,
}

impl FilesystemTable {
    /// Records a filesystem for `volume` mounted at `mount` on `device`.
    pub fn assign(
        &mut self,
        device: impl Into<PathBuf>,
        mount: &str,
        volume: &DesiredVolume,
    ) -> Result<(), PlanError> {
        self.insert(FilesystemAssignment {
            device: device.into(),
            mount: mount.into(),
            fs_type: volume.filesystem().into(),
            label: filesystem_label(volume.disk_label.as_deref()),
        })
    }

    /// Adds an assignment. A device may only be assigned once.
    pub fn insert(&mut self, assignment: FilesystemAssignment) -> Result<(), PlanError> {
        if self.assignments.iter().any(|a| a.device == assignment.device) {
            return Err(PlanError::new(InternalError::DuplicateFilesystemDevice {
                device: assignment.device.to_string_lossy().into(),
            }));
        }

        debug!(
            "Assigning {} filesystem mounted at '{}' to '{}'",
            assignment.fs_type,
            assignment.mount,
            assignment.device.display()
        );
        self.assignments.push(assignment);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilesystemAssignment> {
        self.assignments.iter()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn into_vec(self) -> Vec<FilesystemAssignment> {
        self.assignments
    }
}

/// Filesystem label to apply, truncated to what XFS accepts. Empty labels
/// yield no label at all.
pub fn filesystem_label(label: Option<&str>) -> Option<String> {
    label
        .filter(|l| !l.is_empty())
        .map(|l| l.chars().take(MAX_FILESYSTEM_LABEL_LENGTH).collect())
}
