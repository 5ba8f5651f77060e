//! # Verification Errors
//!
//! A single sum type covers every way a verification can fail, from token
//! parsing through certificate chain validation to authority delegation.
//!
//! The `Display` text is the outward `reason` string; it is a short human
//! description and consumers must not match on its exact wording. Callers
//! that need to branch should match on the variant instead.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::verifier::VerifiedIdentity;

/// Errors surfaced while verifying a bundled assertion or resolving an
/// identity provider.
#[derive(Error, Debug)]
pub enum Error {
    /// A JWT was not three segments, or a segment did not decode to JSON,
    /// or an embedded structure (key, principal) was not the required shape.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The JWT header carried an `alg` identifier outside the supported set.
    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    /// Cryptographic signature verification failed, or the header `alg`
    /// disagreed with the key being verified against.
    #[error("signature invalid")]
    SignatureInvalid,

    /// The assertion's `iat` lies after the verification instant.
    #[error("assertion issued later than verification date")]
    AssertionFromFuture,

    /// The assertion's `exp` lies before the verification instant.
    #[error("assertion has expired")]
    AssertionExpired,

    /// The trailing signed assertion did not verify under the leaf
    /// certificate's public key.
    #[error("assertion signature invalid")]
    AssertionSignatureInvalid,

    /// A certificate in the chain failed to verify. Everything other than a
    /// temporal violation collapses to this one outward error; the inner
    /// cause is retained as the error source.
    #[error("bad signature in chain")]
    BadSignatureInChain(#[source] Option<Box<Error>>),

    /// The certificate chain exceeded the supported length.
    #[error("certificate chain too long: {0} certificates")]
    ChainTooLong(usize),

    /// The relying party's audience did not match the assertion's `aud`.
    #[error("audience mismatch: {0}")]
    AudienceMismatch(AudienceField),

    /// The certificate's issuer may not speak for the email's domain.
    #[error("issuer '{0}' may not speak for this email")]
    IssuerNotAuthorized(String),

    /// The domain served no support document at the well-known location.
    #[error("no support document for '{0}'")]
    NoSupportDocument(String),

    /// The support document was not JSON, or was missing required fields,
    /// or carried an invalid public key or URL.
    #[error("malformed support document: {0}")]
    MalformedSupportDocument(String),

    /// Authority delegation revisited a domain already seen.
    #[error("delegation cycle at '{0}'")]
    DelegationCycle(String),

    /// Authority delegation exceeded the hop ceiling.
    #[error("too many delegations")]
    TooManyDelegations,

    /// The identity provider could not be reached within the deadline.
    #[error("identity provider unreachable: {0}")]
    IdPUnreachable(String),
}

impl Error {
    /// Collapse a certificate chain failure to [`Error::BadSignatureInChain`],
    /// preserving the temporal violations by name. The original error is
    /// retained as the source of the collapsed one.
    #[must_use]
    pub fn into_chain_error(self) -> Self {
        match self {
            Self::AssertionFromFuture | Self::AssertionExpired => self,
            other => Self::BadSignatureInChain(Some(Box::new(other))),
        }
    }
}

/// The audience component that failed to match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudienceField {
    /// The URL scheme (`http` vs `https`).
    Scheme,
    /// The port, after scheme-default normalisation.
    Port,
    /// The host.
    Domain,
}

impl Display for AudienceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scheme => write!(f, "scheme mismatch"),
            Self::Port => write!(f, "port mismatch"),
            Self::Domain => write!(f, "domain mismatch"),
        }
    }
}

/// The JSON reply shape returned to relying parties by the verification
/// endpoint. The HTTP adapter serializes this directly.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum VerifyResponse {
    /// The assertion verified; the identity record follows inline.
    Okay(VerifiedIdentity),

    /// The assertion was rejected.
    Failure {
        /// Short human description of the failure.
        reason: String,
    },
}

impl From<Result<VerifiedIdentity, Error>> for VerifyResponse {
    fn from(result: Result<VerifiedIdentity, Error>) -> Self {
        match result {
            Ok(identity) => Self::Okay(identity),
            Err(e) => Self::Failure { reason: e.to_string() },
        }
    }
}
