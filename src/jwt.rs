//! # JSON Web Tokens
//!
//! The three-segment compact form `header.payload.signature`, each segment
//! base64url-encoded. The header carries a single `alg` field; dispatch to
//! the signing algorithm goes through the key, never the other way around:
//! a verifier accepts whatever algorithm the key advertises and rejects a
//! header that disagrees with it.

use serde_json::{Value, json};

use crate::core::base64url;
use crate::error::Error;
use crate::key::{self, PublicKey, SecretKey};

/// A parsed token. Immutable once formed; the raw form is retained so the
/// token can be re-emitted byte-for-byte.
#[derive(Clone, Debug)]
pub struct Jwt {
    raw: String,
    algorithm: String,
    payload: Value,
    signature: Vec<u8>,
    signing_input: String,
}

impl Jwt {
    /// Parse a compact token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedToken`] unless the token is exactly three
    /// base64url segments whose header and payload decode to JSON objects,
    /// and [`Error::UnknownAlgorithm`] when the header `alg` is outside the
    /// supported set.
    pub fn parse(token: &str) -> Result<Self, Error> {
        let segments: Vec<&str> = token.split('.').collect();
        let [header_seg, payload_seg, signature_seg] = segments[..] else {
            return Err(Error::MalformedToken(format!(
                "expected 3 dot-separated segments, found {}",
                segments.len()
            )));
        };

        let header: Value = serde_json::from_slice(&base64url::decode(header_seg)?)
            .map_err(|_| Error::MalformedToken("header is not JSON".to_string()))?;
        let Some(algorithm) = header.get("alg").and_then(Value::as_str) else {
            return Err(Error::MalformedToken("header has no `alg` field".to_string()));
        };
        if !key::is_known_algorithm(algorithm) {
            return Err(Error::UnknownAlgorithm(algorithm.to_string()));
        }

        let payload: Value = serde_json::from_slice(&base64url::decode(payload_seg)?)
            .map_err(|_| Error::MalformedToken("payload is not JSON".to_string()))?;
        if !payload.is_object() {
            return Err(Error::MalformedToken("payload is not a JSON object".to_string()));
        }

        Ok(Self {
            raw: token.to_string(),
            algorithm: algorithm.to_string(),
            payload,
            signature: base64url::decode(signature_seg)?,
            signing_input: format!("{header_seg}.{payload_seg}"),
        })
    }

    /// Sign `payload` with `key`, producing the compact token. The header is
    /// `{"alg": <id>}` where the identifier comes from the key itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedToken`] when the key or payload cannot be
    /// serialized.
    pub fn sign(payload: &Value, key: &SecretKey) -> Result<String, Error> {
        let header = json!({"alg": key.algorithm_id()?});
        let header_bytes = serde_json::to_vec(&header)
            .map_err(|e| Error::MalformedToken(format!("issue serializing header: {e}")))?;
        let payload_bytes = serde_json::to_vec(payload)
            .map_err(|e| Error::MalformedToken(format!("issue serializing payload: {e}")))?;

        let signing_input =
            format!("{}.{}", base64url::encode(&header_bytes), base64url::encode(&payload_bytes));
        let signature = key.sign(signing_input.as_bytes())?;
        Ok(format!("{signing_input}.{}", base64url::encode(&signature)))
    }

    /// Verify the token's signature under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SignatureInvalid`] when the header `alg` disagrees
    /// with the key's algorithm or the signature does not verify.
    pub fn verify(&self, key: &PublicKey) -> Result<(), Error> {
        if self.algorithm != key.algorithm_id()? {
            return Err(Error::SignatureInvalid);
        }
        if key.verify(self.signing_input.as_bytes(), &self.signature)? {
            Ok(())
        } else {
            Err(Error::SignatureInvalid)
        }
    }

    /// The decoded payload claims.
    #[must_use]
    pub const fn payload(&self) -> &Value {
        &self.payload
    }

    /// The header's algorithm identifier.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// The compact form the token was parsed from.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}
