//! # Configuration
//!
//! A plain value object injected into the resolver and verifier. Nothing
//! here is global: tests construct as many configurations as they need.

use serde::Deserialize;

/// Deployment configuration for a verifier instance.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// The hostname this deployment serves as. An issuer equal to this
    /// hostname resolves against the local key store instead of the
    /// network.
    pub hostname: String,

    /// An implicitly trusted fallback authority (historically
    /// `login.persona.org`). An issuer equal to this domain passes the
    /// authority check for any email.
    #[serde(default)]
    pub master_idp: Option<String>,

    /// Path of the local sign-in page, used to form the `authentication`
    /// URL when the local host resolves itself.
    #[serde(default = "default_authentication_path")]
    pub authentication_path: String,

    /// Path of the local provisioning page.
    #[serde(default = "default_provisioning_path")]
    pub provisioning_path: String,
}

impl Config {
    /// Configuration for `hostname` with default well-known paths and no
    /// master IdP.
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            master_idp: None,
            authentication_path: default_authentication_path(),
            provisioning_path: default_provisioning_path(),
        }
    }

    /// Set the implicitly trusted fallback authority.
    #[must_use]
    pub fn with_master_idp(mut self, domain: impl Into<String>) -> Self {
        self.master_idp = Some(domain.into());
        self
    }
}

fn default_authentication_path() -> String {
    "/browserid/sign_in.html".to_string()
}

fn default_provisioning_path() -> String {
    "/browserid/provision.html".to_string()
}
