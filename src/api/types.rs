//! API data types

use serde::{Deserialize, Serialize};

/// A remote Docker host
///
/// Fields missing from a response take their default value; the list
/// endpoint, for example, does not return credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Host {
    /// Host identifier
    pub id: String,
    /// Host name, unique per account
    pub name: String,
    /// API URL of the host resource
    pub url: String,
    /// Memory size in MiB
    pub size: i64,
    /// Public IP address of the host
    #[serde(alias = "ipaddress", alias = "IPAddress")]
    pub ip_address: String,
    /// PEM client certificate for the host's Docker daemon
    #[serde(alias = "clientcert", alias = "ClientCert")]
    pub client_cert: String,
    /// PEM private key matching `client_cert`
    #[serde(alias = "clientkey", alias = "ClientKey")]
    pub client_key: String,
}

impl Host {
    /// Whether the host carries the TLS credentials needed to reach Docker
    pub fn has_credentials(&self) -> bool {
        !self.client_cert.trim().is_empty() && !self.client_key.trim().is_empty()
    }
}

/// Response of the sign-in endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    /// API token
    pub token: String,
}
