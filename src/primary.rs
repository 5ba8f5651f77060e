//! # Identity Provider Resolution
//!
//! Discovers the authoritative public key for an issuing domain via the
//! `/.well-known/browserid` protocol.
//!
//! A domain serves a *support document* at the well-known location, in one
//! of two forms. A **Basic** document carries the domain's `public-key`
//! together with `authentication` and `provisioning` paths. A **Delegated**
//! document instead names an `authority` domain that answers on its behalf;
//! delegation chains are followed with cycle detection and a hop ceiling.
//!
//! The one concession to local testing is the shim table: a startup-time
//! mapping from domain to a preloaded document body and substitute origin.
//! There is no other way to bypass HTTPS.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::Context;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::key::PublicKey;
use crate::provider::HttpFetcher;

/// Well-known location of support documents.
pub const WELL_KNOWN: &str = "/.well-known/browserid";

/// Most domains a single delegation chain may visit.
const MAX_DELEGATIONS: usize = 6;

// authentication/provisioning URLs must look like plain http(s) origins
static URL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://[a-z0-9-]+(\.[a-z0-9-]+)*(:[0-9]+)?(/.*)?$")
        .expect("pattern is valid")
});

/// A support document, as served at the well-known location. A document
/// carrying `authority` is Delegated regardless of what else it carries.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SupportDocument {
    /// Another domain answers for this one.
    Delegated {
        /// The domain to consult instead.
        authority: String,
    },

    /// The domain is its own identity provider.
    Basic {
        /// The domain's public key.
        #[serde(rename = "public-key")]
        public_key: PublicKey,

        /// Path of the sign-in page, relative to the domain.
        authentication: String,

        /// Path of the provisioning page, relative to the domain.
        provisioning: String,
    },
}

/// The outcome of resolving a domain: its key and absolutised URLs.
#[derive(Clone, Debug)]
pub struct PrimaryInfo {
    /// The domain's (or its authority's) public key.
    pub public_key: PublicKey,

    /// Absolute URL of the sign-in page.
    pub authentication: String,

    /// Absolute URL of the provisioning page.
    pub provisioning: String,
}

/// Startup-time mapping `domain -> (origin, preloaded document body)`.
///
/// Configured once and never mutated afterwards; concurrent verifications
/// read it freely.
#[derive(Clone, Debug, Default)]
pub struct ShimTable {
    entries: HashMap<String, ShimEntry>,
}

#[derive(Clone, Debug)]
struct ShimEntry {
    origin: String,
    body: String,
}

impl ShimTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `"<domain>|<origin>|<path>"` entries, loading each document
    /// body from `path` relative to `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error when an entry does not split into exactly three
    /// fields or its body file cannot be read.
    pub fn load(entries: &[String], base_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let mut table = Self::new();
        for entry in entries {
            let fields: Vec<&str> = entry.split('|').collect();
            let [domain, origin, path] = fields[..] else {
                return Err(anyhow::anyhow!("malformed shim entry: {entry}"));
            };
            let body = fs::read_to_string(base_dir.as_ref().join(path))
                .with_context(|| format!("issue reading shim body for {domain}"))?;
            table.insert(domain, origin, body);
        }
        Ok(table)
    }

    /// Insert a shim for `domain`.
    pub fn insert(
        &mut self, domain: impl Into<String>, origin: impl Into<String>, body: impl Into<String>,
    ) {
        self.entries
            .insert(domain.into(), ShimEntry { origin: origin.into(), body: body.into() });
    }

    fn lookup(&self, domain: &str) -> Option<&ShimEntry> {
        self.entries.get(domain)
    }
}

/// Resolves issuing domains to their authoritative public keys.
#[derive(Clone, Debug)]
pub struct Primary<F> {
    config: Config,
    local_key: Option<PublicKey>,
    shim: ShimTable,
    fetcher: F,
}

impl<F: HttpFetcher> Primary<F> {
    /// A resolver for the given deployment, with no local key and an empty
    /// shim table.
    pub fn new(config: Config, fetcher: F) -> Self {
        Self { config, local_key: None, shim: ShimTable::new(), fetcher }
    }

    /// Provide the local identity provider's public key; resolving the
    /// configured hostname then short-circuits the network entirely.
    #[must_use]
    pub fn with_local_key(mut self, key: PublicKey) -> Self {
        self.local_key = Some(key);
        self
    }

    /// Provide the shim table.
    #[must_use]
    pub fn with_shim(mut self, shim: ShimTable) -> Self {
        self.shim = shim;
        self
    }

    /// Resolve `domain` to its identity provider, following delegations.
    ///
    /// # Errors
    ///
    /// - [`Error::DelegationCycle`] when a delegation chain revisits a
    ///   domain;
    /// - [`Error::TooManyDelegations`] when a chain visits more than 6
    ///   domains;
    /// - [`Error::NoSupportDocument`], [`Error::MalformedSupportDocument`]
    ///   and [`Error::IdPUnreachable`] per the fetch outcome.
    pub async fn resolve(&self, domain: &str) -> Result<PrimaryInfo, Error> {
        let mut visited: Vec<String> = Vec::new();
        let mut domain = domain.to_string();

        loop {
            if domain == self.config.hostname {
                if let Some(key) = &self.local_key {
                    tracing::debug!("resolving {domain} from the local key store");
                    let prefix = format!("https://{domain}");
                    return Ok(PrimaryInfo {
                        public_key: key.clone(),
                        authentication: format!("{prefix}{}", self.config.authentication_path),
                        provisioning: format!("{prefix}{}", self.config.provisioning_path),
                    });
                }
                // no local key configured; fall through to the network
            }

            if visited.contains(&domain) {
                return Err(Error::DelegationCycle(domain));
            }
            visited.push(domain.clone());
            if visited.len() > MAX_DELEGATIONS {
                return Err(Error::TooManyDelegations);
            }

            let (prefix, body) = self.fetch_document(&domain).await?;
            let document: SupportDocument = serde_json::from_str(&body)
                .map_err(|_| Error::MalformedSupportDocument(domain.clone()))?;

            match document {
                SupportDocument::Delegated { authority } => {
                    tracing::debug!("support document for {domain} delegates to {authority}");
                    domain = authority;
                }
                SupportDocument::Basic { public_key, authentication, provisioning } => {
                    public_key
                        .check()
                        .map_err(|_| Error::MalformedSupportDocument(domain.clone()))?;
                    return Ok(PrimaryInfo {
                        public_key,
                        authentication: absolute_url(&prefix, &authentication)?,
                        provisioning: absolute_url(&prefix, &provisioning)?,
                    });
                }
            }
        }
    }

    /// Whether `email_domain` has delegated authority to `issuing_domain`:
    /// true iff the resolved `authentication` URL's host-and-port equals
    /// `issuing_domain`. Any lookup error answers `false`.
    pub async fn delegates_authority(&self, email_domain: &str, issuing_domain: &str) -> bool {
        match self.resolve(email_domain).await {
            Ok(info) => host_and_port(&info.authentication) == Some(issuing_domain),
            Err(e) => {
                tracing::debug!("authority lookup for {email_domain} failed: {e}");
                false
            }
        }
    }

    /// The `url_prefix` and document body for `domain`: from the shim table
    /// when shimmed, otherwise fetched from the well-known location over
    /// HTTPS.
    async fn fetch_document(&self, domain: &str) -> Result<(String, String), Error> {
        if let Some(entry) = self.shim.lookup(domain) {
            tracing::debug!("using shimmed support document for {domain}");
            return Ok((entry.origin.clone(), entry.body.clone()));
        }

        let prefix = format!("https://{domain}");
        let url = format!("{prefix}{WELL_KNOWN}");
        match self.fetcher.fetch(&url).await {
            Ok(Some(body)) => Ok((prefix, body)),
            Ok(None) => Err(Error::NoSupportDocument(domain.to_string())),
            Err(e) => {
                tracing::warn!("fetch of {url} failed: {e}");
                Err(Error::IdPUnreachable(domain.to_string()))
            }
        }
    }
}

/// Absolutise a support-document path against `prefix` and insist on a
/// plain http(s) URL shape.
fn absolute_url(prefix: &str, path: &str) -> Result<String, Error> {
    let url = format!("{prefix}{path}");
    if URL_SHAPE.is_match(&url) {
        Ok(url)
    } else {
        Err(Error::MalformedSupportDocument(format!("invalid url: {url}")))
    }
}

/// The host-and-port part of an http(s) URL.
fn host_and_port(url: &str) -> Option<&str> {
    let rest = url.split_once("://")?.1;
    Some(rest.find('/').map_or(rest, |i| &rest[..i]))
}
