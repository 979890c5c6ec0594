use std::fmt;

use serde::{Deserialize, Serialize};

/// Marker printed in place of every secret field.
pub const REDACTED: &str = "<REDACTED>";

/// Network credentials for one hardware component.
///
/// `Display` and `Debug` both render through [`CompCredentials::fmt_redacted`],
/// so passwords and SNMP passphrases never reach logs or terminals.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompCredentials {
    /// Component xname; also the leaf of the storage key.
    pub xname: String,
    pub url: String,
    pub username: String,
    pub password: String,
    #[serde(
        rename = "SNMPAuthPass",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub snmp_auth_pass: String,
    #[serde(
        rename = "SNMPPrivPass",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub snmp_priv_pass: String,
}

impl CompCredentials {
    pub fn new(
        xname: impl Into<String>,
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            xname: xname.into(),
            url: url.into(),
            username: username.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// Attach SNMP authentication and privacy passphrases.
    pub fn with_snmp(mut self, auth_pass: impl Into<String>, priv_pass: impl Into<String>) -> Self {
        self.snmp_auth_pass = auth_pass.into();
        self.snmp_priv_pass = priv_pass.into();
        self
    }

    fn fmt_redacted(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Xname: {}, URL: {}, Username: {}, Password: {REDACTED}, SNMP Passes: {REDACTED}/{REDACTED}",
            self.xname, self.url, self.username
        )
    }
}

impl fmt::Display for CompCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_redacted(f)
    }
}

impl fmt::Debug for CompCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_redacted(f)
    }
}
