use serde::{Deserialize, Serialize};

/// Bootstrap identity and configuration of a node, written to its config
/// drive and consumed by first-boot automation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigDriveScheme {
    pub common: ConfigDriveCommon,
    pub puppet: ConfigDrivePuppet,
    pub mcollective: ConfigDriveMcollective,
    pub profile: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigDriveCommon {
    pub ssh_auth_key: String,
    pub hostname: String,
    pub fqdn: String,
    pub name_servers: String,
    pub search_domain: String,
    pub master_ip: String,
    pub master_url: String,
    pub udevrules: String,
    pub admin_mac: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_mask: Option<String>,
    pub admin_iface_name: String,
    pub timezone: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigDrivePuppet {
    pub master: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigDriveMcollective {
    pub pskey: String,
    pub vhost: String,
    pub host: String,
    pub user: String,
    pub password: String,
    pub connector: String,
}
