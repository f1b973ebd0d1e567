//! Config-drive scheme builder.
//!
//! The scheme carries the identity of the node and the credentials of its
//! first-boot automation. The only lookup involved is finding the
//! administrative interface, i.e. the interface whose MAC address was handed
//! to the installer through the `netcfg/choose_interface` kernel option.

use log::debug;

use partplan_api::{
    config::{Interface, PlannerConfig, ProvisioningData},
    constants::MASTER_API_PATH,
    error::{PlanError, PlanningError},
    plan::{ConfigDriveCommon, ConfigDriveMcollective, ConfigDrivePuppet, ConfigDriveScheme},
};

/// Finds the single interface with the given MAC address. MAC addresses are
/// compared case-insensitively.
pub fn find_admin_interface<'a>(
    data: &'a ProvisioningData,
    mac: &str,
) -> Result<(&'a str, &'a Interface), PlanError> {
    let found = data
        .interfaces
        .iter()
        .filter(|(_, interface)| interface.mac_address.eq_ignore_ascii_case(mac))
        .collect::<Vec<_>>();

    match found.as_slice() {
        &[(name, interface)] => Ok((name.as_str(), interface)),
        _ => Err(PlanError::new(PlanningError::AmbiguousInterface {
            mac: mac.into(),
            matches: found.len(),
        })),
    }
}

/// URL of the control plane API on the master node.
pub fn master_url(master_ip: &str, port: u16) -> String {
    format!("http://{master_ip}:{port}{MASTER_API_PATH}")
}

/// Builds the config-drive scheme of the node described by `data`.
#[tracing::instrument(skip_all)]
pub fn build_configdrive_scheme(
    data: &ProvisioningData,
    config: &PlannerConfig,
) -> Result<ConfigDriveScheme, PlanError> {
    let admin_mac = &data.kernel_options.choose_interface;
    let (admin_iface_name, admin) = find_admin_interface(data, admin_mac)?;
    debug!("Using interface '{admin_iface_name}' ({admin_mac}) as administrative interface");

    let ks_meta = &data.ks_meta;
    Ok(ConfigDriveScheme {
        common: ConfigDriveCommon {
            ssh_auth_key: ks_meta.auth_key.clone(),
            hostname: data.hostname.clone(),
            fqdn: data.hostname.clone(),
            name_servers: data.name_servers.clone(),
            search_domain: data.name_servers_search.clone(),
            master_ip: ks_meta.master_ip.clone(),
            master_url: master_url(&ks_meta.master_ip, config.master_api_port),
            udevrules: data.kernel_options.udevrules.clone(),
            admin_mac: admin_mac.clone(),
            admin_ip: admin.ip_address.clone(),
            admin_mask: admin.netmask.clone(),
            admin_iface_name: admin_iface_name.into(),
            timezone: ks_meta.timezone.clone(),
        },
        puppet: ConfigDrivePuppet {
            master: ks_meta.puppet_master.clone(),
        },
        mcollective: ConfigDriveMcollective {
            pskey: ks_meta.mco_pskey.clone(),
            vhost: ks_meta.mco_vhost.clone(),
            host: ks_meta.mco_host.clone(),
            user: ks_meta.mco_user.clone(),
            password: ks_meta.mco_password.clone(),
            connector: ks_meta.mco_connector.clone(),
        },
        profile: data.profile.clone(),
    })
}
