//! Network interface configuration
//!
//! Converts user-facing `network_interfaces` entries into the interface
//! structures sent to the UpCloud API when the build server is created.

use serde::{Deserialize, Serialize};

/// IPv4 address family
pub const FAMILY_IPV4: &str = "IPv4";

/// IPv6 address family
pub const FAMILY_IPV6: &str = "IPv6";

/// Public network access
pub const ACCESS_PUBLIC: &str = "public";

/// Utility network access
pub const ACCESS_UTILITY: &str = "utility";

/// Private network access
pub const ACCESS_PRIVATE: &str = "private";

/// Network interface as written in the build configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkInterface {
    pub ip_addresses: Vec<IpAddress>,
    #[serde(rename = "type")]
    pub kind: String,
    /// Private network UUID, only meaningful for `private` interfaces
    pub network: Option<String>,
}

/// IP address entry of a configured interface
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpAddress {
    pub family: String,
    pub address: Option<String>,
}

/// Interface request structure understood by the UpCloud API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateServerInterface {
    pub ip_addresses: CreateServerIpAddresses,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

/// Wrapper matching the API's `{"ip_address": [...]}` nesting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateServerIpAddresses {
    pub ip_address: Vec<CreateServerIpAddress>,
}

/// Single requested IP address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateServerIpAddress {
    pub family: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Default networking: a single public IPv4 interface
pub fn default_interfaces() -> Vec<CreateServerInterface> {
    vec![CreateServerInterface {
        ip_addresses: CreateServerIpAddresses {
            ip_address: vec![CreateServerIpAddress {
                family: FAMILY_IPV4.to_string(),
                address: None,
            }],
        },
        kind: ACCESS_PUBLIC.to_string(),
        network: None,
    }]
}

/// Convert configured interfaces into API request structures
pub fn convert_interfaces(raw: &[NetworkInterface]) -> Vec<CreateServerInterface> {
    raw.iter()
        .map(|iface| CreateServerInterface {
            ip_addresses: CreateServerIpAddresses {
                ip_address: iface
                    .ip_addresses
                    .iter()
                    .map(|ip| CreateServerIpAddress {
                        family: ip.family.clone(),
                        address: ip.address.clone().filter(|a| !a.is_empty()),
                    })
                    .collect(),
            },
            kind: iface.kind.clone(),
            network: iface.network.clone().filter(|n| !n.is_empty()),
        })
        .collect()
}
