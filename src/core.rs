//! # Core Utilities
//!
//! Shared plumbing for the verification engine: the base64url codec used by
//! every token segment and a millisecond clock helper.

use chrono::Utc;

/// The current time in integer milliseconds since the Unix epoch, the unit
/// every `iat`/`exp` claim is expressed in.
#[must_use]
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Base64url codec per RFC 7515: the URL-safe alphabet with padding stripped.
pub mod base64url {
    use base64ct::{Base64UrlUnpadded, Encoding};

    use crate::error::Error;

    /// Encode bytes to an unpadded base64url string.
    #[must_use]
    pub fn encode(data: &[u8]) -> String {
        Base64UrlUnpadded::encode_string(data)
    }

    /// Decode a base64url string. Trailing `=` padding is tolerated;
    /// characters outside the URL-safe alphabet are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedToken`] when the input is not valid
    /// base64url.
    pub fn decode(input: &str) -> Result<Vec<u8>, Error> {
        Base64UrlUnpadded::decode_vec(input.trim_end_matches('='))
            .map_err(|_| Error::MalformedToken("invalid base64url".to_string()))
    }
}
