//! # Verifier
//!
//! The entry point a relying party's endpoint calls into: take a bundled
//! assertion and the audience the RP believes it is, and produce either a
//! verified identity record or a typed failure.
//!
//! Beyond the cryptographic chain walk, two policy checks live here. The
//! *audience match* ties the assertion to the RP's origin, comparing only
//! the components the RP actually specified. The *authority check* ties
//! the email's domain to the issuing domain: an issuer may speak for an
//! email when it is the configured master IdP, the local host, the email
//! domain itself, or a domain the email domain has delegated to.

use serde::{Deserialize, Serialize};

use crate::bundle::CertBundle;
use crate::config::Config;
use crate::error::{AudienceField, Error};
use crate::keystore::KeyStore;
use crate::primary::{Primary, ShimTable};
use crate::provider::HttpFetcher;

/// Longest certificate chain accepted in this revision. Multi-certificate
/// chains parse and verify structurally but are rejected here.
const MAX_CHAIN_LEN: usize = 1;

/// A successfully verified identity, serializing to the success half of
/// the verification endpoint's JSON reply.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// The email address the assertion proves control of.
    pub email: String,

    /// The audience the assertion is bound to, as the assertion stated it.
    pub audience: String,

    /// When the assertion stops being valid, milliseconds since the epoch.
    #[serde(rename = "valid-until", skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<i64>,

    /// The domain that issued the leaf certificate.
    pub issuer: String,
}

/// Verifies bundled assertions for relying parties.
#[derive(Clone, Debug)]
pub struct Verifier<F> {
    config: Config,
    primary: Primary<F>,
}

impl<F: HttpFetcher> Verifier<F> {
    /// A verifier for the given deployment.
    pub fn new(config: Config, fetcher: F) -> Self {
        let primary = Primary::new(config.clone(), fetcher);
        Self { config, primary }
    }

    /// Use `keystore` for issuers equal to the configured hostname, instead
    /// of a network lookup.
    #[must_use]
    pub fn with_keystore(mut self, keystore: &impl KeyStore) -> Self {
        self.primary = self.primary.with_local_key(keystore.public_key().clone());
        self
    }

    /// Provide the resolver's shim table.
    #[must_use]
    pub fn with_shim(mut self, shim: ShimTable) -> Self {
        self.primary = self.primary.with_shim(shim);
        self
    }

    /// The underlying resolver.
    #[must_use]
    pub const fn primary(&self) -> &Primary<F> {
        &self.primary
    }

    /// Verify `assertion` against the audience the relying party supplied,
    /// at instant `now` (milliseconds since the epoch).
    ///
    /// # Errors
    ///
    /// Returns the typed failure; see [`Error`] for the catalogue. The
    /// outward JSON for either outcome is
    /// [`VerifyResponse`](crate::error::VerifyResponse).
    pub async fn verify(
        &self, assertion: &str, audience: &str, now: i64,
    ) -> Result<VerifiedIdentity, Error> {
        tracing::debug!("verify");

        let bundle = CertBundle::unbundle(assertion)?;
        let outcome = bundle.verify(now, &self.primary).await?;
        if outcome.cert_chain.len() > MAX_CHAIN_LEN {
            return Err(Error::ChainTooLong(outcome.cert_chain.len()));
        }
        let Some(leaf) = outcome.cert_chain.last() else {
            return Err(Error::MalformedToken("no certificates provided".to_string()));
        };

        let Some(want) = outcome.assertion.aud.clone() else {
            return Err(Error::AudienceMismatch(AudienceField::Domain));
        };
        match_audience(audience, &want)?;

        let principal = leaf.params().principal.clone();
        let email_domain = principal.email_domain()?;
        let issuer = leaf.issuer().to_string();

        let trusted = issuer == self.config.hostname
            || self.config.master_idp.as_deref() == Some(issuer.as_str())
            || issuer == email_domain;
        if !trusted && !self.primary.delegates_authority(email_domain, &issuer).await {
            return Err(Error::IssuerNotAuthorized(issuer));
        }

        tracing::debug!("verified {} for audience {want}", principal.email);
        Ok(VerifiedIdentity {
            email: principal.email,
            audience: want,
            valid_until: outcome.assertion.exp,
            issuer,
        })
    }
}

/// An audience, as one of the three forms a relying party may supply:
/// a full origin, `host:port`, or a bare host. Unspecified components are
/// `None` and exempt from matching.
#[derive(Clone, Debug, PartialEq, Eq)]
struct AudiencePattern {
    scheme: Option<String>,
    host: String,
    port: Option<u16>,
}

/// Parse a full origin `http(s)://host[:port][/path]`, normalising a
/// missing port to the scheme default (443/80).
fn parse_origin(input: &str) -> Option<AudiencePattern> {
    let (scheme, rest) = input.split_once("://")?;
    let scheme = scheme.to_ascii_lowercase();
    if scheme != "http" && scheme != "https" {
        return None;
    }

    let authority = rest.find('/').map_or(rest, |i| &rest[..i]);
    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => (host, Some(port.parse::<u16>().ok()?)),
        None => (authority, None),
    };
    if host.is_empty() {
        return None;
    }

    let default_port = if scheme == "https" { 443 } else { 80 };
    Some(AudiencePattern {
        scheme: Some(scheme),
        host: host.to_ascii_lowercase(),
        port: Some(port.unwrap_or(default_port)),
    })
}

/// Parse the relying party's audience, trying the three forms in order.
fn parse_audience(input: &str) -> Result<AudiencePattern, Error> {
    if input.contains("://") {
        return parse_origin(input).ok_or(Error::AudienceMismatch(AudienceField::Domain));
    }

    if let Some((host, port)) = input.rsplit_once(':') {
        let port =
            port.parse().map_err(|_| Error::AudienceMismatch(AudienceField::Port))?;
        if host.is_empty() {
            return Err(Error::AudienceMismatch(AudienceField::Domain));
        }
        return Ok(AudiencePattern {
            scheme: None,
            host: host.to_ascii_lowercase(),
            port: Some(port),
        });
    }

    if input.is_empty() {
        return Err(Error::AudienceMismatch(AudienceField::Domain));
    }
    Ok(AudiencePattern { scheme: None, host: input.to_ascii_lowercase(), port: None })
}

/// Match the RP-supplied audience against the assertion's `aud`. Every
/// component the RP specified must equal the assertion's.
fn match_audience(supplied: &str, want: &str) -> Result<(), Error> {
    let rp = parse_audience(supplied)?;
    let want = parse_origin(want).ok_or(Error::AudienceMismatch(AudienceField::Domain))?;

    if rp.scheme.is_some() && rp.scheme != want.scheme {
        return Err(Error::AudienceMismatch(AudienceField::Scheme));
    }
    if rp.host != want.host {
        return Err(Error::AudienceMismatch(AudienceField::Domain));
    }
    if rp.port.is_some() && rp.port != want.port {
        return Err(Error::AudienceMismatch(AudienceField::Port));
    }
    Ok(())
}
