//! # Certificate Bundles
//!
//! The wire form a relying party submits: a `~`-joined certificate chain
//! followed by one trailing signed assertion,
//! `cert_1 ~ cert_2 ~ ... ~ cert_n ~ signedAssertion`.
//!
//! Chain verification anchors at the *root issuer* — the `iss` claim of the
//! first certificate, read before any signature is checked — whose public
//! key is discovered through the resolver. Each certificate then vouches
//! for the next one's signing key, and the leaf certificate's subject key
//! verifies the trailing assertion.

use serde_json::Value;

use crate::cert::{Assertion, Cert};
use crate::error::Error;
use crate::jwt::Jwt;
use crate::primary::Primary;
use crate::provider::HttpFetcher;

/// A split, not-yet-verified bundle.
#[derive(Clone, Debug)]
pub struct CertBundle {
    certs: Vec<String>,
    assertion: String,
}

/// The outcome of verifying a bundle.
#[derive(Clone, Debug)]
pub struct VerifiedBundle {
    /// The verified certificate chain, root first.
    pub cert_chain: Vec<Cert>,

    /// The trailing assertion's full decoded payload.
    pub payload: Value,

    /// The trailing assertion's typed claims.
    pub assertion: Assertion,
}

impl CertBundle {
    /// Split the wire form. The last `~`-separated segment is the signed
    /// assertion; every preceding segment is a certificate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedToken`] when no certificates precede the
    /// assertion.
    pub fn unbundle(bundle: &str) -> Result<Self, Error> {
        let mut segments: Vec<&str> = bundle.split('~').collect();
        let Some(assertion) = segments.pop() else {
            return Err(Error::MalformedToken("no certificates provided".to_string()));
        };
        if segments.is_empty() {
            return Err(Error::MalformedToken("no certificates provided".to_string()));
        }
        Ok(Self {
            certs: segments.iter().map(ToString::to_string).collect(),
            assertion: assertion.to_string(),
        })
    }

    /// Join the wire form back up.
    #[must_use]
    pub fn bundle(&self) -> String {
        let mut segments = self.certs.clone();
        segments.push(self.assertion.clone());
        segments.join("~")
    }

    /// The raw certificate tokens, root first.
    #[must_use]
    pub fn certs(&self) -> &[String] {
        &self.certs
    }

    /// The raw trailing assertion token.
    #[must_use]
    pub fn assertion(&self) -> &str {
        &self.assertion
    }

    /// Verify the certificate chain at `now`, resolving the root issuer's
    /// key through `primary`. Returns the parsed chain, root first.
    ///
    /// # Errors
    ///
    /// Temporal violations ([`Error::AssertionFromFuture`],
    /// [`Error::AssertionExpired`]) propagate by name; every other failure
    /// collapses to [`Error::BadSignatureInChain`] with the cause attached
    /// as its source.
    pub async fn verify_chain<F: HttpFetcher>(
        &self, now: i64, primary: &Primary<F>,
    ) -> Result<Vec<Cert>, Error> {
        let certs = self
            .certs
            .iter()
            .map(|raw| Cert::parse(raw))
            .collect::<Result<Vec<_>, _>>()
            .map_err(Error::into_chain_error)?;

        // the root issuer is read from the first cert before any signature
        // check; its key anchors the chain
        let Some(root) = certs.first() else {
            return Err(Error::MalformedToken("no certificates provided".to_string()));
        };
        let info =
            primary.resolve(root.issuer()).await.map_err(Error::into_chain_error)?;

        let mut key = info.public_key;
        for cert in &certs {
            cert.jwt().verify(&key).map_err(Error::into_chain_error)?;
            cert.verify(now).map_err(Error::into_chain_error)?;
            key = cert.params().public_key.clone();
        }
        Ok(certs)
    }

    /// Verify the whole bundle at `now`: the chain, then the trailing
    /// assertion under the leaf certificate's subject key.
    ///
    /// # Errors
    ///
    /// As for [`CertBundle::verify_chain`], plus
    /// [`Error::AssertionSignatureInvalid`] when the trailing assertion
    /// does not verify under the leaf key, and the temporal violations of
    /// the assertion itself, propagated by name.
    pub async fn verify<F: HttpFetcher>(
        &self, now: i64, primary: &Primary<F>,
    ) -> Result<VerifiedBundle, Error> {
        let cert_chain = self.verify_chain(now, primary).await?;
        let Some(leaf) = cert_chain.last() else {
            return Err(Error::MalformedToken("no certificates provided".to_string()));
        };

        let jwt = Jwt::parse(&self.assertion)?;
        jwt.verify(&leaf.params().public_key).map_err(|_| Error::AssertionSignatureInvalid)?;

        let assertion = Assertion::from_payload(jwt.payload())?;
        assertion.verify(now)?;

        Ok(VerifiedBundle { payload: jwt.payload().clone(), assertion, cert_chain })
    }
}
