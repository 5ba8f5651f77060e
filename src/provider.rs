//! # Providers
//!
//! Injectable externals. The resolver never talks to the network directly;
//! it goes through an [`HttpFetcher`] so tests and embedders can substitute
//! their own transport.

use std::time::Duration;

use anyhow::Result;

/// Fetches well-known documents over HTTPS.
///
/// Implementations must bound each request by a deadline; the resolver
/// treats a transport error as the identity provider being unreachable and
/// does not retry. A TTL cache of fetched documents may sit behind this
/// interface without changing resolution semantics.
pub trait HttpFetcher: Send + Sync {
    /// Fetch `url`. Returns `Ok(Some(body))` on success, `Ok(None)` when
    /// the server answered but no document exists at the location, and
    /// `Err` when the host could not be reached within the deadline.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Option<String>>> + Send;
}

/// Per-request fetch deadline.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// The default fetcher: `reqwest` over rustls, platform trust store,
/// 10-second deadline per request.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Create the default fetcher.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying TLS backend cannot be
    /// initialised.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self { client })
    }
}

impl HttpFetcher for HttpClient {
    async fn fetch(&self, url: &str) -> Result<Option<String>> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Ok(None);
        }
        Ok(Some(response.text().await?))
    }
}
