//! # DSA (FIPS 186-3)
//!
//! DSA sign/verify over the two fixed parameter sets deployed identity
//! providers use. Keys never carry novel domain parameters: `(p, q, g)`
//! must equal one of the embedded sets, matched exactly.
//!
//! The `128` keysize pairs a 1024-bit `p` and 160-bit `q` with SHA-1
//! (retained for compatibility despite the label); `256` pairs 2048/256
//! with SHA-256.
//!
//! Signatures are the left-padded big-endian concatenation `r || s`, each
//! half `bitlen(q)/4` hex digits (`bitlen(q)/8` bytes) wide.

use std::sync::LazyLock;

use num_bigint::BigUint;
use num_traits::{Num, Zero};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::{Hash, biguint_hex};
use crate::error::Error;

/// DSA public parameters. Hex strings on the wire.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct DsaPublic {
    /// Prime modulus.
    #[serde(with = "biguint_hex")]
    pub p: BigUint,

    /// Subgroup order.
    #[serde(with = "biguint_hex")]
    pub q: BigUint,

    /// Generator.
    #[serde(with = "biguint_hex")]
    pub g: BigUint,

    /// Public value `g^x mod p`.
    #[serde(with = "biguint_hex")]
    pub y: BigUint,
}

/// DSA secret parameters.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct DsaSecret {
    /// Prime modulus.
    #[serde(with = "biguint_hex")]
    pub p: BigUint,

    /// Subgroup order.
    #[serde(with = "biguint_hex")]
    pub q: BigUint,

    /// Generator.
    #[serde(with = "biguint_hex")]
    pub g: BigUint,

    /// Private value.
    #[serde(with = "biguint_hex")]
    pub x: BigUint,
}

/// 1024-bit prime modulus of the `128` parameter set.
pub const P_1024: &str = "ff600483db6abfc5b45eab78594b3533d550d9f1bf2a992a7a8daa6dc34f8045ad4e6e0c429d334eeeaaefd7e23d4810be00e4cc1492cba325ba81ff2d5a5b305a8d17eb3bf4a06a349d392e00d329744a5179380344e82a18c47933438f891e22aeef812d69c8f75e326cb70ea000c3f776dfdbd604638c2ef717fc26d02e17";

/// 160-bit subgroup order of the `128` parameter set.
pub const Q_160: &str = "e21e04f911d1ed7991008ecaab3bf775984309c3";

/// Generator of the `128` parameter set.
pub const G_1024: &str = "c52a4a0ff3b7e61fdf1867ce84138369a6154f4afa92966e3c827e25cfa6cf508b90e5de419e1337e07a2e9e2a3cd5dea704d175f8ebf6af397d69e110b96afb17c7a03259329e4829b0d03bbc7896b15b4ade53e130858cc34d96269aa89041f409136c7242a38895c9d5bccad4f389af1d7a4bd1398bd072dffa896233397a";

/// 2048-bit prime modulus of the `256` parameter set.
pub const P_2048: &str = "d6c4e5045697756c7a312d02c2289c25d40f9954261f7b5876214b6df109c738b76226b199bb7e33f8fc7ac1dcc316e1e7c78973951bfc6ff2e00cc987cd76fcfb0b8c0096b0b460fffac960ca4136c28f4bfb580de47cf7e7934c3985e3b3d943b77f06ef2af3ac3494fc3c6fc49810a63853862a02bb1c824a01b7fc688e4028527a58ad58c9d512922660db5d505bc263af293bc93bcd6d885a157579d7f52952236dd9d06a4fc3bc2247d21f1a70f5848eb0176513537c983f5a36737f01f82b44546e8e7f0fabc457e3de1d9c5dba96965b10a2a0580b0ad0f88179e10066107fb74314a07e6745863bc797b7002ebec0b000a98eb697414709ac17b401";

/// 256-bit subgroup order of the `256` parameter set.
pub const Q_256: &str = "b1e370f6472c8754ccd75e99666ec8ef1fd748b748bbbc08503d82ce8055ab3b";

/// Generator of the `256` parameter set.
pub const G_2048: &str = "9a8269ab2e3b733a5242179d8f8ddb17ff93297d9eab00376db211a22b19c854dfa80166df2132cbc51fb224b0904abb22da2c7b7850f782124cb575b116f41ea7c4fc75b1d77525204cd7c23a15999004c23cdeb72359ee74e886a1dde7855ae05fe847447d0a68059002c3819a75dc7dcbb30e39efac36e07e2c404b7ca98b263b25fa314ba93c0625718bd489cea6d04ba4b0b7f156eeb4c56c44b50e4fb5bce9d7ae0d55b379225feb0214a04bed72f33e0664d290e7c840df3e2abb5e48189fa4e90646f1867db289c6560476799f7be8420a6dc01d078de437f280fff2d7ddf1248d56e1a54b933a41629d6c252983c58795105802d30d7bcd819cf6ef";

/// A canonical parameter set and the digest its keysize pairs with.
pub(crate) struct ParamSet {
    /// Keysize tag.
    pub keysize: u16,
    /// Digest paired with the keysize.
    pub hash: Hash,
    p: BigUint,
    q: BigUint,
    g: BigUint,
}

static PARAM_SETS: LazyLock<[ParamSet; 2]> = LazyLock::new(|| {
    let parse = |hex| BigUint::from_str_radix(hex, 16).expect("embedded hex is valid");
    [
        ParamSet {
            keysize: 128,
            hash: Hash::Sha1,
            p: parse(P_1024),
            q: parse(Q_160),
            g: parse(G_1024),
        },
        ParamSet {
            keysize: 256,
            hash: Hash::Sha256,
            p: parse(P_2048),
            q: parse(Q_256),
            g: parse(G_2048),
        },
    ]
});

/// Look up the canonical parameter set matching `(p, q, g)` exactly.
pub(crate) fn param_set(p: &BigUint, q: &BigUint, g: &BigUint) -> Option<&'static ParamSet> {
    PARAM_SETS.iter().find(|set| set.p == *p && set.q == *q && set.g == *g)
}

/// The width of each signature half in bytes (`bitlen(q) / 8`; both
/// canonical orders are byte-aligned).
fn half_width(q: &BigUint) -> usize {
    usize::try_from(q.bits() / 8).unwrap_or(usize::MAX)
}

/// Draw `k` in `[1, q-1]` with negligible bias: sample `c` uniformly from
/// `[0, 2^(bitlen(q)+64))` and reduce, `k = (c mod (q-1)) + 1`.
fn gen_k(q: &BigUint, rng: &mut impl RngCore) -> BigUint {
    let bits = q.bits() + 64;
    let mut buf = vec![0u8; usize::try_from(bits.div_ceil(8)).unwrap_or(usize::MAX)];
    rng.fill_bytes(&mut buf);
    let excess = u32::try_from(buf.len() as u64 * 8 - bits).unwrap_or(0);
    if excess > 0 {
        buf[0] &= 0xff >> excess;
    }
    BigUint::from_bytes_be(&buf) % (q - 1u8) + 1u8
}

/// Sign `message`, retrying until both signature halves are non-zero.
pub(crate) fn sign(message: &[u8], key: &DsaSecret) -> Result<Vec<u8>, Error> {
    let set = param_set(&key.p, &key.q, &key.g)
        .ok_or_else(|| Error::MalformedToken("unrecognised DSA parameters".to_string()))?;
    let q = &key.q;
    let hm = BigUint::from_bytes_be(&set.hash.digest(message));
    let mut rng = rand::rng();

    loop {
        let k = gen_k(q, &mut rng);
        let r = key.g.modpow(&k, &key.p) % q;
        if r.is_zero() {
            continue;
        }
        let Some(k_inv) = k.modinv(q) else {
            continue;
        };
        let s = k_inv * (&hm + &key.x * &r) % q;
        if s.is_zero() {
            continue;
        }

        let width = half_width(q);
        let mut signature = vec![0u8; 2 * width];
        let r_bytes = r.to_bytes_be();
        let s_bytes = s.to_bytes_be();
        signature[width - r_bytes.len()..width].copy_from_slice(&r_bytes);
        signature[2 * width - s_bytes.len()..].copy_from_slice(&s_bytes);
        return Ok(signature);
    }
}

/// Verify `signature` over `message`. A short signature is left-padded to
/// the full `2 * bitlen(q)/8` width before splitting.
pub(crate) fn verify(
    message: &[u8], key: &DsaPublic, signature: &[u8],
) -> Result<bool, Error> {
    let set = param_set(&key.p, &key.q, &key.g)
        .ok_or_else(|| Error::MalformedToken("unrecognised DSA parameters".to_string()))?;
    let q = &key.q;
    let width = half_width(q);

    if signature.len() > 2 * width {
        return Ok(false);
    }
    let mut padded = vec![0u8; 2 * width - signature.len()];
    padded.extend_from_slice(signature);

    let r = BigUint::from_bytes_be(&padded[..width]);
    let s = BigUint::from_bytes_be(&padded[width..]);
    if r > *q || s > *q {
        return Ok(false);
    }
    let Some(w) = s.modinv(q) else {
        return Ok(false);
    };

    let hm = BigUint::from_bytes_be(&set.hash.digest(message));
    let u1 = hm * &w % q;
    let u2 = &r * &w % q;
    let v = key.g.modpow(&u1, &key.p) * key.y.modpow(&u2, &key.p) % &key.p % q;
    Ok(v == r)
}
