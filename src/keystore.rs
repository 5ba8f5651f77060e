//! # Key Store
//!
//! The local identity provider's own key pair, loaded once at startup and
//! read-only thereafter. The on-disk layout is two files per key name:
//! `<name>.secretkey` holds the serialized secret key, `<name>.cert` a JWT
//! whose payload carries the matching public key. The default name is
//! `root`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

use crate::jwt::Jwt;
use crate::key::{PublicKey, SecretKey};

/// Default basename for the local key pair files.
pub const DEFAULT_KEY_NAME: &str = "root";

/// Access to the local identity provider's key pair.
pub trait KeyStore: Send + Sync {
    /// The local public key, as relying parties would discover it.
    fn public_key(&self) -> &PublicKey;

    /// The local signing key.
    fn secret_key(&self) -> &SecretKey;
}

/// A key store backed by the on-disk layout above.
#[derive(Clone, Debug)]
pub struct DiskKeyStore {
    public_key: PublicKey,
    secret_key: SecretKey,
}

impl DiskKeyStore {
    /// Load the key pair named `name` from `dir`.
    ///
    /// The certificate file is trusted local state: the public key is read
    /// from its payload without verifying the certificate's signature.
    ///
    /// # Errors
    ///
    /// Returns an error when either file is missing or does not hold the
    /// expected serialization.
    pub fn load(dir: impl AsRef<Path>, name: &str) -> Result<Self> {
        let dir = dir.as_ref();

        let secret_path = dir.join(format!("{name}.secretkey"));
        let secret_text = fs::read_to_string(&secret_path)
            .with_context(|| format!("issue reading {}", secret_path.display()))?;
        let secret_key: SecretKey =
            serde_json::from_str(secret_text.trim()).context("issue deserializing secret key")?;

        let cert_path = dir.join(format!("{name}.cert"));
        let cert_text = fs::read_to_string(&cert_path)
            .with_context(|| format!("issue reading {}", cert_path.display()))?;
        let jwt =
            Jwt::parse(cert_text.trim()).map_err(|e| anyhow!("issue parsing certificate: {e}"))?;
        let Some(key_value) = jwt.payload().get("public-key") else {
            return Err(anyhow!("certificate payload has no `public-key`"));
        };
        let public_key = PublicKey::from_value(key_value)
            .map_err(|e| anyhow!("issue deserializing public key: {e}"))?;

        Ok(Self { public_key, secret_key })
    }

    /// Load the default (`root`) key pair from `dir`.
    ///
    /// # Errors
    ///
    /// As for [`DiskKeyStore::load`].
    pub fn load_default(dir: impl AsRef<Path>) -> Result<Self> {
        Self::load(dir, DEFAULT_KEY_NAME)
    }
}

impl KeyStore for DiskKeyStore {
    fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }
}
