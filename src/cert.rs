//! # Assertions and Certificates
//!
//! Typed views over JWT payload claims. An [`Assertion`] carries the
//! temporal window and addressing claims (`iat`, `exp`, `iss`, `aud`), all
//! in integer milliseconds since the Unix epoch. [`CertParams`] carries what
//! a certificate asserts about its subject: the subject's public key and
//! principal. A [`Cert`] is a JWT whose payload supplies both.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::Error;
use crate::jwt::Jwt;
use crate::key::{PublicKey, SecretKey};

/// The temporal and addressing claims of a token payload.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Assertion {
    /// Issued-at, milliseconds since the Unix epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Expiry, milliseconds since the Unix epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issuing domain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Audience the token is bound to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

impl Assertion {
    /// Read the assertion claims out of a decoded JWT payload. Claims other
    /// than the four above are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedToken`] when a claim has the wrong type.
    pub fn from_payload(payload: &Value) -> Result<Self, Error> {
        serde_json::from_value(payload.clone())
            .map_err(|e| Error::MalformedToken(format!("invalid assertion claims: {e}")))
    }

    /// Check the validity window against `now`. The window is inclusive on
    /// both ends: a token with `iat == now` or `exp == now` is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssertionFromFuture`] when `iat > now` and
    /// [`Error::AssertionExpired`] when `exp < now`.
    pub fn verify(&self, now: i64) -> Result<(), Error> {
        if self.iat.is_some_and(|iat| iat > now) {
            return Err(Error::AssertionFromFuture);
        }
        if self.exp.is_some_and(|exp| exp < now) {
            return Err(Error::AssertionExpired);
        }
        Ok(())
    }
}

/// The subject of a certificate.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Principal {
    /// The email address the certificate binds.
    pub email: String,
}

impl Principal {
    /// The domain part of the email, after the `@`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedToken`] when the email has no `@`.
    pub fn email_domain(&self) -> Result<&str, Error> {
        self.email
            .split_once('@')
            .map(|(_, domain)| domain)
            .ok_or_else(|| Error::MalformedToken("principal email has no domain".to_string()))
    }
}

/// What a certificate asserts about its subject.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CertParams {
    /// The subject's public key.
    #[serde(rename = "public-key")]
    pub public_key: PublicKey,

    /// The subject principal.
    pub principal: Principal,
}

impl CertParams {
    /// Read the certificate params out of a decoded JWT payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedToken`] when either field is missing or
    /// malformed.
    pub fn from_payload(payload: &Value) -> Result<Self, Error> {
        let params: Self = serde_json::from_value(payload.clone())
            .map_err(|e| Error::MalformedToken(format!("invalid certificate params: {e}")))?;
        params.check()?;
        Ok(params)
    }

    /// Validate the embedded key shape and the principal email syntax.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedToken`] on violation.
    pub fn check(&self) -> Result<(), Error> {
        self.public_key.check()?;
        self.principal.email_domain().map(|_| ())
    }
}

/// A certificate: a JWT by which an issuer binds a subject's public key to
/// a principal, for a bounded validity window.
#[derive(Clone, Debug)]
pub struct Cert {
    jwt: Jwt,
    issuer: String,
    assertion: Assertion,
    params: CertParams,
}

impl Cert {
    /// Interpret a parsed JWT as a certificate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedToken`] when the payload lacks an issuer,
    /// a principal or a public key. The signature is NOT checked here; that
    /// requires the issuer's key, which the chain walk supplies.
    pub fn from_jwt(jwt: Jwt) -> Result<Self, Error> {
        let assertion = Assertion::from_payload(jwt.payload())?;
        let Some(issuer) = assertion.iss.clone() else {
            return Err(Error::MalformedToken("certificate has no issuer".to_string()));
        };
        let params = CertParams::from_payload(jwt.payload())?;
        Ok(Self { jwt, issuer, assertion, params })
    }

    /// Parse a compact token as a certificate.
    ///
    /// # Errors
    ///
    /// As for [`Jwt::parse`] and [`Cert::from_jwt`].
    pub fn parse(token: &str) -> Result<Self, Error> {
        Self::from_jwt(Jwt::parse(token)?)
    }

    /// Mint a certificate: sign a payload binding `public_key` to
    /// `principal`, valid over `[iat, exp]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedToken`] when the signing key is outside
    /// the supported tables.
    pub fn issue(
        signing_key: &SecretKey, issuer: &str, principal: &Principal, public_key: &PublicKey,
        iat: i64, exp: i64,
    ) -> Result<String, Error> {
        let payload = json!({
            "iat": iat,
            "exp": exp,
            "iss": issuer,
            "public-key": public_key,
            "principal": principal,
        });
        Jwt::sign(&payload, signing_key)
    }

    /// Check the validity window and the params invariants.
    ///
    /// # Errors
    ///
    /// Propagates the temporal violations by name; shape violations are
    /// [`Error::MalformedToken`].
    pub fn verify(&self, now: i64) -> Result<(), Error> {
        self.assertion.verify(now)?;
        self.params.check()
    }

    /// The issuing domain (the `iss` claim, required at parse time).
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// The certificate's own validity claims.
    #[must_use]
    pub const fn assertion(&self) -> &Assertion {
        &self.assertion
    }

    /// The subject's key and principal.
    #[must_use]
    pub const fn params(&self) -> &CertParams {
        &self.params
    }

    /// The underlying token.
    #[must_use]
    pub const fn jwt(&self) -> &Jwt {
        &self.jwt
    }
}
