//! # RSA (PKCS#1 v1.5)
//!
//! Textbook RSA over [`num_bigint`] with EMSA-PKCS1-v1_5 message encoding.
//! Secret keys carry only the private exponent (no CRT parameters), which is
//! the form deployed identity providers serialize.
//!
//! The keysize tag fixes both the modulus length and the digest:
//! `64 -> 512 bits / SHA-1`, `128 -> 1024 / SHA-256`, `256 -> 2048 / SHA-256`.
//! A modulus within one bit of the tabulated length is accepted at that
//! keysize.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use super::{Hash, biguint_dec};
use crate::error::Error;

/// RSA public parameters. Decimal strings on the wire.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct RsaPublic {
    /// Modulus.
    #[serde(with = "biguint_dec")]
    pub n: BigUint,

    /// Public exponent.
    #[serde(with = "biguint_dec")]
    pub e: BigUint,
}

/// RSA secret parameters.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct RsaSecret {
    /// Modulus.
    #[serde(with = "biguint_dec")]
    pub n: BigUint,

    /// Public exponent.
    #[serde(with = "biguint_dec")]
    pub e: BigUint,

    /// Private exponent.
    #[serde(with = "biguint_dec")]
    pub d: BigUint,
}

/// `(keysize, modulus bits, digest)` rows of the RSA table.
const KEYSIZES: [(u16, u64, Hash); 3] =
    [(64, 512, Hash::Sha1), (128, 1024, Hash::Sha256), (256, 2048, Hash::Sha256)];

/// Map a modulus bit length to its keysize tag, tolerating a 1-bit
/// difference from the tabulated length.
#[must_use]
pub(crate) fn keysize_for_bits(bits: u64) -> Option<u16> {
    KEYSIZES.iter().find(|(_, target, _)| bits.abs_diff(*target) <= 1).map(|(ks, ..)| *ks)
}

/// The digest paired with a keysize tag.
#[must_use]
pub(crate) fn hash_for_keysize(keysize: u16) -> Hash {
    KEYSIZES
        .iter()
        .find(|(ks, ..)| *ks == keysize)
        .map_or(Hash::Sha256, |(.., hash)| *hash)
}

// DER DigestInfo prefixes for EMSA-PKCS1-v1_5.
const SHA1_PREFIX: [u8; 15] =
    [0x30, 0x21, 0x30, 0x09, 0x06, 0x05, 0x2b, 0x0e, 0x03, 0x02, 0x1a, 0x05, 0x00, 0x04, 0x14];
const SHA256_PREFIX: [u8; 19] = [
    0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01,
    0x05, 0x00, 0x04, 0x20,
];

/// EMSA-PKCS1-v1_5 encoding of `message`, `em_len` bytes long:
/// `0x00 0x01 FF..FF 0x00 DigestInfo`.
fn emsa_encode(message: &[u8], hash: Hash, em_len: usize) -> Result<Vec<u8>, Error> {
    let prefix: &[u8] = match hash {
        Hash::Sha1 => &SHA1_PREFIX,
        Hash::Sha256 => &SHA256_PREFIX,
    };
    let digest = hash.digest(message);
    let t_len = prefix.len() + digest.len();
    if em_len < t_len + 11 {
        return Err(Error::MalformedToken("RSA modulus too short for digest".to_string()));
    }

    let mut em = Vec::with_capacity(em_len);
    em.push(0x00);
    em.push(0x01);
    em.resize(em_len - t_len - 1, 0xff);
    em.push(0x00);
    em.extend_from_slice(prefix);
    em.extend_from_slice(&digest);
    Ok(em)
}

/// The modulus length in whole bytes.
fn modulus_len(n: &BigUint) -> usize {
    usize::try_from(n.bits().div_ceil(8)).unwrap_or(usize::MAX)
}

/// Big-endian bytes of `value`, left-padded with zeros to `len`.
fn left_pad(value: &BigUint, len: usize) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    let mut out = vec![0u8; len.saturating_sub(bytes.len())];
    out.extend_from_slice(&bytes);
    out
}

/// PKCS#1 v1.5 signature over `message`. The output length equals the
/// modulus byte length.
pub(crate) fn sign(
    message: &[u8], hash: Hash, n: &BigUint, d: &BigUint,
) -> Result<Vec<u8>, Error> {
    let k = modulus_len(n);
    let em = emsa_encode(message, hash, k)?;
    let s = BigUint::from_bytes_be(&em).modpow(d, n);
    Ok(left_pad(&s, k))
}

/// PKCS#1 v1.5 verification. `false` for any structural or cryptographic
/// mismatch, including a signature whose length differs from the modulus.
pub(crate) fn verify(
    message: &[u8], hash: Hash, n: &BigUint, e: &BigUint, signature: &[u8],
) -> bool {
    let k = modulus_len(n);
    if signature.len() != k {
        return false;
    }
    let s = BigUint::from_bytes_be(signature);
    if s >= *n {
        return false;
    }
    let em = left_pad(&s.modpow(e, n), k);
    emsa_encode(message, hash, k).is_ok_and(|expected| em == expected)
}
