//! Shared fixtures for the integration tests: deterministic keys, stub
//! transports, and helpers to mint certificates and assertions.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Once;

use anyhow::{Result, anyhow};
use browserid_verifier::primary::WELL_KNOWN;
use browserid_verifier::{Cert, HttpFetcher, Jwt, KeyStore, Principal, PublicKey, SecretKey};
use serde_json::json;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

// initalise tracing once for all tests
static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// # Panics
///
/// Panics if the tracing subscriber cannot be set.
pub fn init_tracer() {
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::ERROR).finish();
        tracing::subscriber::set_global_default(subscriber).expect("subscriber set");
    });
}

// deterministic key material; generated once and checked in so every run
// exercises identical tokens

const ROOT_512_N: &str = "11170885882807202737054974261084855484046114524863068424034067820199938101050446897081142971240030549932242191352366874551764656342511447592298866848851063";
const ROOT_512_D: &str = "7422314505803433834094616082502098540561637807424238438203815909037739057482528856840680101498865067225331531627278505669397105648697132638100322141899473";

const IDP_1024_N: &str = "102558827711485463790064082514064855725615404988568028933213979947838313505704906682059455710253897552469869759086213346707011419882643326641950899500384173577163970999443948507961562539352643732343707724334288931182559602002919424468741967575762170599775974990011747552309191774687848962113113291857058397441";
const IDP_1024_D: &str = "10589675864376186481947047414020734526988410295827392950410592524940443833149291293734780914464930111808041391271135476405180985982663951529457889999833675107715720963403896649704465705451666172602205403094350220798888959698940611709877043287757191466616053114976819791569267223109683307577133755894240305773";

const USER_512_N: &str = "10622762397566894778893390135893784846140724839800968655442544387923248670781150134482275675581877339481526502984379272958036005552353248482681908337525717";
const USER_512_D: &str = "9199143340578780632029471348589588555439991112776968354837514139984986420823376991943325744535610050983634315131912782101872739027045521240898129159893593";

const USER_DSA_P: &str = "ff600483db6abfc5b45eab78594b3533d550d9f1bf2a992a7a8daa6dc34f8045ad4e6e0c429d334eeeaaefd7e23d4810be00e4cc1492cba325ba81ff2d5a5b305a8d17eb3bf4a06a349d392e00d329744a5179380344e82a18c47933438f891e22aeef812d69c8f75e326cb70ea000c3f776dfdbd604638c2ef717fc26d02e17";
const USER_DSA_Q: &str = "e21e04f911d1ed7991008ecaab3bf775984309c3";
const USER_DSA_G: &str = "c52a4a0ff3b7e61fdf1867ce84138369a6154f4afa92966e3c827e25cfa6cf508b90e5de419e1337e07a2e9e2a3cd5dea704d175f8ebf6af397d69e110b96afb17c7a03259329e4829b0d03bbc7896b15b4ade53e130858cc34d96269aa89041f409136c7242a38895c9d5bccad4f389af1d7a4bd1398bd072dffa896233397a";
const USER_DSA_X: &str = "dae445508201e2bd73ab48767734d7c1c7fde806";

fn rsa_secret(n: &str, d: &str) -> SecretKey {
    serde_json::from_str(&format!(r#"{{"algorithm":"RS","n":"{n}","e":"65537","d":"{d}"}}"#))
        .expect("should deserialize")
}

/// The local identity provider's 512-bit root key (`RS64`).
pub fn root_key() -> SecretKey {
    rsa_secret(ROOT_512_N, ROOT_512_D)
}

/// A remote identity provider's 1024-bit key (`RS128`).
pub fn idp_key() -> SecretKey {
    rsa_secret(IDP_1024_N, IDP_1024_D)
}

/// A user's RSA key (`RS64`).
pub fn user_key() -> SecretKey {
    rsa_secret(USER_512_N, USER_512_D)
}

/// A user's DSA key (`DS128`), the family deployed providers hand to
/// user agents.
pub fn dsa_user_key() -> SecretKey {
    serde_json::from_str(&format!(
        r#"{{"algorithm":"DS","p":"{USER_DSA_P}","q":"{USER_DSA_Q}","g":"{USER_DSA_G}","x":"{USER_DSA_X}"}}"#
    ))
    .expect("should deserialize")
}

/// Mint a certificate binding `email` to `user` over `[iat, exp]`.
pub fn issue_cert(
    signing_key: &SecretKey, issuer: &str, email: &str, user: &PublicKey, iat: i64, exp: i64,
) -> String {
    let principal = Principal { email: email.to_string() };
    Cert::issue(signing_key, issuer, &principal, user, iat, exp).expect("should issue")
}

/// Mint a signed assertion bound to `audience`, expiring at `exp`.
pub fn sign_assertion(key: &SecretKey, audience: &str, exp: i64) -> String {
    Jwt::sign(&json!({"exp": exp, "aud": audience}), key).expect("should sign")
}

/// Join a certificate and an assertion into the wire form.
pub fn bundle(cert: &str, assertion: &str) -> String {
    format!("{cert}~{assertion}")
}

/// A Basic support document for `key`, with the conventional paths.
pub fn basic_doc(key: &PublicKey) -> String {
    json!({
        "public-key": key,
        "authentication": "/browserid/sign_in.html",
        "provisioning": "/browserid/provision.html",
    })
    .to_string()
}

/// A Delegated support document pointing at `authority`.
pub fn delegated_doc(authority: &str) -> String {
    json!({"authority": authority}).to_string()
}

/// An in-memory key store.
#[derive(Clone, Debug)]
pub struct TestKeystore {
    public_key: PublicKey,
    secret_key: SecretKey,
}

impl TestKeystore {
    pub fn new(secret_key: SecretKey) -> Self {
        Self { public_key: secret_key.public_key(), secret_key }
    }
}

impl KeyStore for TestKeystore {
    fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }
}

/// A canned response for one well-known location.
#[derive(Clone, Debug)]
pub enum StubResponse {
    /// 200 with the given body.
    Body(String),
    /// The server answers but serves no document.
    NotFound,
}

/// A fetcher serving canned documents. Domains without an entry are
/// unreachable.
#[derive(Clone, Debug, Default)]
pub struct StubFetcher {
    responses: HashMap<String, StubResponse>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` as `domain`'s support document.
    #[must_use]
    pub fn with_document(mut self, domain: &str, body: impl Into<String>) -> Self {
        self.responses
            .insert(format!("https://{domain}{WELL_KNOWN}"), StubResponse::Body(body.into()));
        self
    }

    /// Make `domain` answer without a support document.
    #[must_use]
    pub fn with_not_found(mut self, domain: &str) -> Self {
        self.responses.insert(format!("https://{domain}{WELL_KNOWN}"), StubResponse::NotFound);
        self
    }
}

impl HttpFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<Option<String>> {
        match self.responses.get(url) {
            Some(StubResponse::Body(body)) => Ok(Some(body.clone())),
            Some(StubResponse::NotFound) => Ok(None),
            None => Err(anyhow!("no route to {url}")),
        }
    }
}

/// A fetcher that fails the test on any use.
#[derive(Clone, Debug)]
pub struct NoNetwork;

impl HttpFetcher for NoNetwork {
    async fn fetch(&self, url: &str) -> Result<Option<String>> {
        panic!("unexpected network access: {url}");
    }
}
