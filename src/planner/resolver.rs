//! Maps desired disks onto discovered block devices.
//!
//! Matching runs through an ordered list of strategies. The first strategy
//! that matches any device decides the outcome; strategies are never mixed.
//! Exactly one match is required: finding several devices is as fatal as
//! finding none.

use std::path::Path;

use log::debug;

use partplan_api::{
    config::DesiredDisk,
    constants::DEV_DIRECTORY,
    device::DiscoveredDevice,
    error::{PlanError, PlanningError},
};

/// A strategy for deciding whether a discovered device is a desired disk.
pub trait DeviceMatcher {
    /// Short name of the strategy, for logging.
    fn name(&self) -> &'static str;

    fn matches(&self, disk: &DesiredDisk, device: &DiscoveredDevice) -> bool;
}

/// Matches by udev links: any by-id link equal to `/dev/<fragment>` for one of
/// the disk's `extra` fragments, or any link equal to `/dev/<id>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinkMatcher;

impl DeviceMatcher for LinkMatcher {
    fn name(&self) -> &'static str {
        "link"
    }

    fn matches(&self, disk: &DesiredDisk, device: &DiscoveredDevice) -> bool {
        let by_extra = disk.extra.iter().any(|fragment| {
            let link = dev_path(fragment);
            device.by_id_links().any(|l| l.as_os_str() == link.as_str())
        });

        by_extra
            || disk
                .id
                .as_ref()
                .is_some_and(|id| device.has_link(dev_path(id)))
    }
}

/// Matches `/dev/<name>` against the canonical device path.
#[derive(Debug, Default, Clone, Copy)]
pub struct NameMatcher;

impl DeviceMatcher for NameMatcher {
    fn name(&self) -> &'static str {
        "name"
    }

    fn matches(&self, disk: &DesiredDisk, device: &DiscoveredDevice) -> bool {
        device.device.as_os_str() == dev_path(&disk.name).as_str()
    }
}

fn dev_path(fragment: &str) -> String {
    format!("{DEV_DIRECTORY}/{fragment}")
}

/// Resolves desired disks against a frozen snapshot of discovered devices.
pub struct DeviceResolver<'a> {
    devices: &'a [DiscoveredDevice],
    matchers: Vec<Box<dyn DeviceMatcher>>,
}

impl<'a> DeviceResolver<'a> {
    /// Creates a resolver matching by link first, then by name.
    pub fn new(devices: &'a [DiscoveredDevice]) -> Self {
        Self::with_matchers(devices, vec![Box::new(LinkMatcher), Box::new(NameMatcher)])
    }

    pub fn with_matchers(
        devices: &'a [DiscoveredDevice],
        matchers: Vec<Box<dyn DeviceMatcher>>,
    ) -> Self {
        Self { devices, matchers }
    }

    /// Returns the device path of the single device matching `disk`.
    pub fn resolve(&self, disk: &DesiredDisk) -> Result<&'a Path, PlanError> {
        for matcher in &self.matchers {
            let found = self
                .devices
                .iter()
                .filter(|device| matcher.matches(disk, device))
                .collect::<Vec<_>>();

            match found.as_slice() {
                [] => continue,
                [device] => {
                    debug!(
                        "Disk '{}' resolved to '{}' by {} match",
                        disk.name,
                        device.device.display(),
                        matcher.name()
                    );
                    return Ok(device.device.as_path());
                }
                _ => {
                    debug!(
                        "Disk '{}' is ambiguous by {} match: {:?}",
                        disk.name,
                        matcher.name(),
                        found.iter().map(|d| &d.device).collect::<Vec<_>>()
                    );
                    break;
                }
            }
        }

        Err(PlanError::new(PlanningError::DiskNotFound {
            disk: disk.name.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use partplan_api::error::ErrorKind;

    use super::*;

    fn device(path: &str, links: &[&str]) -> DiscoveredDevice {
        DiscoveredDevice {
            device: path.into(),
            links: links.iter().map(PathBuf::from).collect(),
            size: 0,
        }
    }

    fn disk(name: &str, id: Option<&str>, extra: &[&str]) -> DesiredDisk {
        DesiredDisk {
            name: name.into(),
            id: id.map(Into::into),
            extra: extra.iter().map(|e| e.to_string()).collect(),
            size: 10000,
            volumes: Vec::new(),
        }
    }

    fn devices() -> Vec<DiscoveredDevice> {
        vec![
            device(
                "/dev/sda",
                &[
                    "/dev/disk/by-id/ata-QEMU_HARDDISK_QM00001",
                    "/dev/disk/by-path/pci-0000:00:1f.2-ata-1",
                ],
            ),
            device(
                "/dev/sdb",
                &[
                    "/dev/disk/by-id/ata-QEMU_HARDDISK_QM00002",
                    "/dev/disk/by-path/pci-0000:00:1f.2-ata-2",
                ],
            ),
            device("/dev/sdc", &[]),
        ]
    }

    fn assert_not_found(result: Result<&Path, PlanError>, name: &str) {
        assert_eq!(
            result.unwrap_err().kind(),
            &ErrorKind::Planning(PlanningError::DiskNotFound { disk: name.into() })
        );
    }

    #[test]
    fn test_resolve_by_extra() {
        let devices = devices();
        let resolver = DeviceResolver::new(&devices);
        let found = resolver
            .resolve(&disk("sda", None, &["disk/by-id/ata-QEMU_HARDDISK_QM00002"]))
            .unwrap();
        // Link match wins over the name hint
        assert_eq!(found, Path::new("/dev/sdb"));
    }

    #[test]
    fn test_resolve_extra_requires_by_id_link() {
        let devices = devices();
        let resolver = DeviceResolver::new(&devices);
        // A by-path link listed in extra does not count, so the name decides
        let found = resolver
            .resolve(&disk("sdc", None, &["disk/by-path/pci-0000:00:1f.2-ata-1"]))
            .unwrap();
        assert_eq!(found, Path::new("/dev/sdc"));
    }

    #[test]
    fn test_resolve_by_id() {
        let devices = devices();
        let resolver = DeviceResolver::new(&devices);
        let found = resolver
            .resolve(&disk("sdz", Some("disk/by-path/pci-0000:00:1f.2-ata-1"), &[]))
            .unwrap();
        assert_eq!(found, Path::new("/dev/sda"));
    }

    #[test]
    fn test_resolve_by_name_fallback() {
        let devices = devices();
        let resolver = DeviceResolver::new(&devices);
        let found = resolver
            .resolve(&disk("sdc", Some("disk/by-path/missing"), &["disk/by-id/missing"]))
            .unwrap();
        assert_eq!(found, Path::new("/dev/sdc"));
    }

    #[test]
    fn test_resolve_not_found() {
        let devices = devices();
        let resolver = DeviceResolver::new(&devices);
        assert_not_found(resolver.resolve(&disk("sdx", None, &[])), "sdx");
        assert_not_found(DeviceResolver::new(&[]).resolve(&disk("sda", None, &[])), "sda");
    }

    #[test]
    fn test_resolve_ambiguous_link_match_fails() {
        let mut devices = devices();
        devices.push(device(
            "/dev/sdd",
            &["/dev/disk/by-id/ata-QEMU_HARDDISK_QM00001"],
        ));
        let resolver = DeviceResolver::new(&devices);
        // Two devices share the link; the name would match exactly one, but
        // strategies are never mixed.
        assert_not_found(
            resolver.resolve(&disk("sda", None, &["disk/by-id/ata-QEMU_HARDDISK_QM00001"])),
            "sda",
        );
    }

    #[test]
    fn test_resolve_ambiguous_across_extra_and_id() {
        let devices = devices();
        let resolver = DeviceResolver::new(&devices);
        assert_not_found(
            resolver.resolve(&disk(
                "sda",
                Some("disk/by-path/pci-0000:00:1f.2-ata-2"),
                &["disk/by-id/ata-QEMU_HARDDISK_QM00001"],
            )),
            "sda",
        );
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let devices = devices();
        let resolver = DeviceResolver::new(&devices);
        let desired = disk("sdb", None, &[]);
        assert_eq!(
            resolver.resolve(&desired).unwrap(),
            resolver.resolve(&desired).unwrap()
        );
        let missing = disk("nvme0n1", None, &[]);
        assert_eq!(
            resolver.resolve(&missing).unwrap_err().kind(),
            resolver.resolve(&missing).unwrap_err().kind()
        );
    }

    #[test]
    fn test_custom_matchers() {
        struct SizeMatcher;
        impl DeviceMatcher for SizeMatcher {
            fn name(&self) -> &'static str {
                "size"
            }
            fn matches(&self, _: &DesiredDisk, device: &DiscoveredDevice) -> bool {
                device.size > 0
            }
        }

        let mut devices = devices();
        devices[2].size = 1 << 30;
        let resolver = DeviceResolver::with_matchers(&devices, vec![Box::new(SizeMatcher)]);
        assert_eq!(
            resolver.resolve(&disk("sda", None, &[])).unwrap(),
            Path::new("/dev/sdc")
        );
    }
}
