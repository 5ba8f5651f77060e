//! An engine for verifying BrowserID/Persona federated identity
//! assertions: a relying party hands over a bundled assertion and the
//! audience it expects, and receives a cryptographically verified identity
//! record or a typed failure.
//!
//! # Protocol
//!
//! A user's browser holds a *certificate* — a JWT by which an identity
//! provider (IdP) binds the user's public key to an email address — and
//! mints short-lived *assertions* bound to a relying party's origin. The
//! two travel together as a `~`-joined bundle:
//!
//! ```text
//! bundle    = cert ("~" cert)* "~" jwt
//! cert      = jwt      ; payload carries iat, exp, iss, principal, public-key
//! assertion = jwt      ; payload carries exp, aud
//! ```
//!
//! Verification walks outside-in: discover the issuing domain's public key
//! via its `/.well-known/browserid` support document (following authority
//! delegations), validate the certificate chain's signatures and validity
//! windows, verify the trailing assertion under the leaf certificate's
//! subject key, then enforce the audience match and the rule that the
//! issuer may speak for the email's domain.
//!
//! # Design
//!
//! Everything external is injected: the HTTP transport behind
//! [`HttpFetcher`], the local IdP key pair behind [`KeyStore`], and the
//! deployment settings as a plain [`Config`] value. Tests substitute all
//! three; nothing in the crate is process-global.
//!
//! # Example
//!
//! ```rust,ignore
//! use browserid_verifier::{Config, HttpClient, Verifier, VerifyResponse, core};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::new("verifier.example").with_master_idp("login.persona.org");
//!     let verifier = Verifier::new(config, HttpClient::new()?);
//!
//!     let result = verifier.verify(&assertion, "https://rp.example", core::now_ms()).await;
//!     println!("{}", serde_json::to_string(&VerifyResponse::from(result))?);
//!     Ok(())
//! }
//! ```

pub mod bundle;
pub mod cert;
pub mod config;
pub mod core;
pub mod error;
pub mod jwt;
pub mod key;
pub mod keystore;
pub mod primary;
pub mod provider;
pub mod verifier;

pub use crate::bundle::{CertBundle, VerifiedBundle};
pub use crate::cert::{Assertion, Cert, CertParams, Principal};
pub use crate::config::Config;
pub use crate::error::{AudienceField, Error, VerifyResponse};
pub use crate::jwt::Jwt;
pub use crate::key::{PublicKey, SecretKey};
pub use crate::keystore::{DiskKeyStore, KeyStore};
pub use crate::primary::{Primary, PrimaryInfo, ShimTable, SupportDocument};
pub use crate::provider::{HttpClient, HttpFetcher};
pub use crate::verifier::{VerifiedIdentity, Verifier};
