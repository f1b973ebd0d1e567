//! Input documents of a planning run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{InvalidInputError, PlanError, ReportError};

mod error;
mod image;
pub mod layout;
mod planner;

pub use error::LayoutValidationError;
pub use image::{ImageCatalog, ImageContainer, ImageSource};
pub use layout::{
    validate_layout, DesiredDisk, DesiredVolume, DesiredVolumeGroup, Space, VolumeKind,
};
pub use planner::PlannerConfig;

/// Provisioning data of a single node, as handed out by the control plane.
///
/// Only the keys the planner consumes are modelled; everything else in the
/// document is ignored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningData {
    pub hostname: String,

    /// Provisioning profile, e.g. `ubuntu_1404_x86_64`.
    #[serde(default)]
    pub profile: String,

    #[serde(default)]
    pub name_servers: String,

    #[serde(default)]
    pub name_servers_search: String,

    /// Network interfaces of the node, keyed by interface name.
    #[serde(default)]
    pub interfaces: BTreeMap<String, Interface>,

    #[serde(default)]
    pub kernel_options: KernelOptions,

    pub ks_meta: KsMeta,
}

/// One network interface of the node.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub mac_address: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub netmask: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct KernelOptions {
    /// MAC address of the interface used for administration.
    #[serde(rename = "netcfg/choose_interface", default)]
    pub choose_interface: String,

    #[serde(default)]
    pub udevrules: String,
}

/// Kickstart metadata: partitioning, images and bootstrap credentials.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct KsMeta {
    pub pm_data: PmData,

    /// Filesystem images, keyed by mount point.
    #[serde(default)]
    pub image_data: ImageCatalog,

    #[serde(default)]
    pub auth_key: String,
    #[serde(default)]
    pub master_ip: String,
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub puppet_master: String,
    #[serde(default)]
    pub mco_pskey: String,
    #[serde(default)]
    pub mco_vhost: String,
    #[serde(default)]
    pub mco_host: String,
    #[serde(default)]
    pub mco_user: String,
    #[serde(default)]
    pub mco_password: String,
    #[serde(default)]
    pub mco_connector: String,
}

/// Partition manager data.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PmData {
    /// The desired storage layout.
    pub ks_spaces: Vec<Space>,

    #[serde(default)]
    pub kernel_params: String,
}

impl ProvisioningData {
    /// Parses a provisioning document. YAML and JSON are both accepted.
    pub fn parse(contents: &str) -> Result<Self, PlanError> {
        serde_yaml::from_str(contents).structured(InvalidInputError::ParseProvisioningData)
    }

    /// Validates the desired layout carried by this document.
    pub fn validate(&self) -> Result<(), LayoutValidationError> {
        validate_layout(self.spaces())
    }

    pub fn spaces(&self) -> &[Space] {
        &self.ks_meta.pm_data.ks_spaces
    }

    /// Disks that take part in planning, in declaration order.
    pub fn disks(&self) -> impl Iterator<Item = &DesiredDisk> {
        self.spaces()
            .iter()
            .filter_map(Space::as_disk)
            .filter(|disk| disk.is_allocated())
    }

    pub fn volume_groups(&self) -> impl Iterator<Item = &DesiredVolumeGroup> {
        self.spaces().iter().filter_map(Space::as_volume_group)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use crate::error::ErrorKind;

    use super::*;

    pub(crate) const SAMPLE: &str = indoc! {r#"
        hostname: node-1.domain.tld
        profile: ubuntu_1404_x86_64
        name_servers: '"10.20.0.2"'
        name_servers_search: '"domain.tld"'
        uid: "1"
        interfaces:
          eth0:
            mac_address: 08:00:27:79:da:80
            ip_address: 10.20.0.3
            netmask: 255.255.255.0
          eth1:
            mac_address: 08:00:27:46:43:60
        kernel_options:
          netcfg/choose_interface: 08:00:27:79:da:80
          udevrules: 08:00:27:79:da:80_eth0,08:00:27:46:43:60_eth1
        ks_meta:
          auth_key: '"ssh-rsa AAAA"'
          master_ip: 10.20.0.2
          timezone: America/Los_Angeles
          puppet_master: fuel.domain.tld
          mco_pskey: unset
          mco_vhost: mcollective
          mco_host: 10.20.0.2
          mco_user: mcollective
          mco_password: marionette
          mco_connector: rabbitmq
          image_data:
            /:
              uri: http://10.20.0.2:8080/targetimages/ubuntu.img.gz
              format: ext4
              container: gzip
          pm_data:
            kernel_params: console=ttyS0,9600 console=tty0
            ks_spaces:
              - type: disk
                name: sda
                size: 10000
                volumes:
                  - {type: partition, mount: /, size: 5000, file_system: ext4}
              - type: disk
                name: sdb
                size: 0
                volumes: []
              - type: vg
                id: os
                volumes: []
    "#};

    #[test]
    fn test_parse_provisioning_data() {
        let data = ProvisioningData::parse(SAMPLE).unwrap();
        assert_eq!(data.hostname, "node-1.domain.tld");
        assert_eq!(data.interfaces.len(), 2);
        assert_eq!(data.interfaces["eth1"].ip_address, None);
        assert_eq!(data.kernel_options.choose_interface, "08:00:27:79:da:80");
        assert_eq!(data.ks_meta.pm_data.kernel_params, "console=ttyS0,9600 console=tty0");
        assert_eq!(data.ks_meta.image_data.len(), 1);
        assert_eq!(data.spaces().len(), 3);
        assert_eq!(
            data.disks().map(|d| d.name.as_str()).collect::<Vec<_>>(),
            vec!["sda"]
        );
        assert_eq!(data.volume_groups().count(), 1);
        data.validate().unwrap();
    }

    #[test]
    fn test_parse_json() {
        let data = ProvisioningData::parse(
            r#"{"hostname": "n", "ks_meta": {"pm_data": {"ks_spaces": []}}}"#,
        )
        .unwrap();
        assert_eq!(data.hostname, "n");
        assert_eq!(data.validate(), Err(LayoutValidationError::EmptyLayout));
    }

    #[test]
    fn test_parse_failure_is_structured() {
        let error = ProvisioningData::parse("hostname: n\nks_meta: {}").unwrap_err();
        assert_eq!(
            error.kind(),
            &ErrorKind::InvalidInput(InvalidInputError::ParseProvisioningData)
        );
    }
}
