//! # Keys
//!
//! Algorithm-tagged public and secret key values with canonical JSON
//! serialization, and the sign/verify surface shared by both families.
//!
//! Two algorithm families are deployed by identity providers: RSA with
//! PKCS#1 v1.5 signatures and DSA over fixed FIPS 186-3 parameter sets.
//! Dispatch is a tagged variant over the `algorithm` field; keysize
//! selection is data held in per-family tables, not code.
//!
//! Serialization is asymmetric by design and must stay that way: RSA
//! parameters travel as decimal strings, DSA parameters as hex strings.
//! That is what deployed identity providers emit.

pub mod dsa;
pub mod rsa;

use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::Error;

/// The hash function paired with a keysize by the algorithm tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hash {
    /// SHA-1, retained for compatibility with deployed `RS64`/`DS128` keys.
    Sha1,
    /// SHA-256.
    Sha256,
}

impl Hash {
    /// Digest `data` with this hash function.
    #[must_use]
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => Sha1::digest(data).to_vec(),
            Self::Sha256 => Sha256::digest(data).to_vec(),
        }
    }
}

/// A public key, deserialized from the JSON object identity providers embed
/// in certificates and support documents.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "algorithm")]
pub enum PublicKey {
    /// RSA: modulus and public exponent, decimal strings on the wire.
    #[serde(rename = "RS")]
    Rsa(rsa::RsaPublic),

    /// DSA: domain parameters and public value, hex strings on the wire.
    #[serde(rename = "DS")]
    Dsa(dsa::DsaPublic),
}

impl PublicKey {
    /// Deserialize a public key from a JSON value, validating its shape.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedToken`] when the value is not a recognised
    /// key object, the keysize is not in the supported table, or DSA
    /// parameters are not one of the canonical sets.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, Error> {
        let key: Self = serde_json::from_value(value.clone())
            .map_err(|e| Error::MalformedToken(format!("invalid public key: {e}")))?;
        key.check()?;
        Ok(key)
    }

    /// Deserialize a public key from JSON text, validating its shape.
    ///
    /// # Errors
    ///
    /// As for [`PublicKey::from_value`].
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| Error::MalformedToken(format!("invalid public key: {e}")))?;
        Self::from_value(&value)
    }

    /// Validate the key's shape: the keysize must be derivable and, for DSA,
    /// the domain parameters must equal one of the canonical sets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedToken`] on violation.
    pub fn check(&self) -> Result<(), Error> {
        self.keysize().map(|_| ())
    }

    /// The keysize tag (`64`, `128` or `256`) derived from the key material.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedToken`] when the modulus length (RSA) or
    /// parameter set (DSA) is outside the supported tables.
    pub fn keysize(&self) -> Result<u16, Error> {
        match self {
            Self::Rsa(key) => rsa::keysize_for_bits(key.n.bits())
                .ok_or_else(|| Error::MalformedToken("unsupported RSA modulus length".to_string())),
            Self::Dsa(key) => dsa::param_set(&key.p, &key.q, &key.g)
                .map(|set| set.keysize)
                .ok_or_else(|| Error::MalformedToken("unrecognised DSA parameters".to_string())),
        }
    }

    /// The JWT algorithm identifier for this key, e.g. `RS256` or `DS128`.
    ///
    /// # Errors
    ///
    /// As for [`PublicKey::keysize`].
    pub fn algorithm_id(&self) -> Result<String, Error> {
        let family = match self {
            Self::Rsa(_) => "RS",
            Self::Dsa(_) => "DS",
        };
        Ok(format!("{family}{}", self.keysize()?))
    }

    /// Verify `signature` over `message`. `Ok(false)` means the signature is
    /// cryptographically wrong; errors are reserved for malformed keys.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedToken`] when the key itself is outside the
    /// supported tables.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool, Error> {
        match self {
            Self::Rsa(key) => {
                let hash = rsa::hash_for_keysize(self.keysize()?);
                Ok(rsa::verify(message, hash, &key.n, &key.e, signature))
            }
            Self::Dsa(key) => dsa::verify(message, key, signature),
        }
    }
}

/// A secret key. Never serialized to external actors; the JSON form exists
/// for the local key store only.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "algorithm")]
pub enum SecretKey {
    /// RSA: adds the private exponent to the public parameters.
    #[serde(rename = "RS")]
    Rsa(rsa::RsaSecret),

    /// DSA: domain parameters and private value.
    #[serde(rename = "DS")]
    Dsa(dsa::DsaSecret),
}

impl SecretKey {
    /// Derive the corresponding public key.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        match self {
            Self::Rsa(key) => PublicKey::Rsa(rsa::RsaPublic { n: key.n.clone(), e: key.e.clone() }),
            Self::Dsa(key) => PublicKey::Dsa(dsa::DsaPublic {
                p: key.p.clone(),
                q: key.q.clone(),
                g: key.g.clone(),
                y: key.g.modpow(&key.x, &key.p),
            }),
        }
    }

    /// The JWT algorithm identifier for this key, e.g. `RS256` or `DS128`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedToken`] when the key is outside the
    /// supported tables.
    pub fn algorithm_id(&self) -> Result<String, Error> {
        self.public_key().algorithm_id()
    }

    /// Sign `message`, returning the raw signature bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedToken`] when the key is outside the
    /// supported tables.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, Error> {
        match self {
            Self::Rsa(key) => {
                let keysize = self.public_key().keysize()?;
                rsa::sign(message, rsa::hash_for_keysize(keysize), &key.n, &key.d)
            }
            Self::Dsa(key) => dsa::sign(message, key),
        }
    }
}

/// Whether `alg` is one of the algorithm identifiers a deployed identity
/// provider may emit.
#[must_use]
pub fn is_known_algorithm(alg: &str) -> bool {
    matches!(alg, "RS64" | "RS128" | "RS256" | "DS128" | "DS256")
}

/// Serde adapter: `BigUint` as a decimal string (RSA parameters).
pub(crate) mod biguint_dec {
    use num_bigint::BigUint;
    use num_traits::Num;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let text = String::deserialize(deserializer)?;
        BigUint::from_str_radix(&text, 10)
            .map_err(|_| D::Error::custom("expected a decimal big-integer string"))
    }
}

/// Serde adapter: `BigUint` as a lowercase hex string (DSA parameters).
pub(crate) mod biguint_hex {
    use num_bigint::BigUint;
    use num_traits::Num;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(16))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let text = String::deserialize(deserializer)?;
        BigUint::from_str_radix(&text, 16)
            .map_err(|_| D::Error::custom("expected a hex big-integer string"))
    }
}
