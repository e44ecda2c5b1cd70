//! Mutual TLS material
//!
//! Shared by every sink that sets `mutual_tls = true`.

use serde::Deserialize;
use std::path::PathBuf;

/// Client certificate material for mutual TLS
///
/// ```toml
/// [tls]
/// client_cert = "/etc/herald/certs/client.crt"
/// client_key = "/etc/herald/certs/client.key"
/// ca_cert = "/etc/herald/certs/ca.crt"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// PEM client certificate
    pub client_cert: Option<PathBuf>,

    /// PEM private key for `client_cert`
    pub client_key: Option<PathBuf>,

    /// Extra PEM root certificate to trust
    pub ca_cert: Option<PathBuf>,
}

impl TlsConfig {
    /// Whether a client identity is configured
    pub fn has_client_identity(&self) -> bool {
        self.client_cert.is_some() && self.client_key.is_some()
    }
}
