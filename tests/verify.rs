//! End-to-end verification scenarios: a configured verifier, canned
//! support documents, and bundles minted with deterministic keys.

mod utils;

use browserid_verifier::{
    AudienceField, Config, DiskKeyStore, Error, KeyStore, ShimTable, Verifier, VerifyResponse,
};
use serde_json::json;
use utils::{
    NoNetwork, StubFetcher, TestKeystore, basic_doc, bundle, delegated_doc, dsa_user_key,
    idp_key, init_tracer, issue_cert, root_key, sign_assertion, user_key,
};

const NOW: i64 = 1_000_000;

#[tokio::test]
async fn same_host_issuer() {
    init_tracer();

    // the local IdP issues a cert for its own domain; no network involved
    let keystore = TestKeystore::new(root_key());
    let user = dsa_user_key();
    let cert = issue_cert(
        &root_key(),
        "idp.example",
        "alice@idp.example",
        &user.public_key(),
        0,
        2_000_000,
    );
    let assertion = sign_assertion(&user, "https://rp.example", 1_500_000);

    let verifier =
        Verifier::new(Config::new("idp.example"), NoNetwork).with_keystore(&keystore);
    let identity = verifier
        .verify(&bundle(&cert, &assertion), "https://rp.example", NOW)
        .await
        .expect("should verify");

    assert_eq!(identity.email, "alice@idp.example");
    assert_eq!(identity.audience, "https://rp.example");
    assert_eq!(identity.valid_until, Some(1_500_000));
    assert_eq!(identity.issuer, "idp.example");

    let ser = serde_json::to_value(VerifyResponse::Okay(identity)).expect("should serialize");
    assert_eq!(
        ser,
        json!({
            "status": "okay",
            "email": "alice@idp.example",
            "audience": "https://rp.example",
            "valid-until": 1_500_000,
            "issuer": "idp.example",
        })
    );
}

#[tokio::test]
async fn delegated_authority() {
    init_tracer();

    // mail.example delegates to idp.example, which issues the cert
    let idp = idp_key();
    let user = user_key();
    let cert = issue_cert(
        &idp,
        "idp.example",
        "alice@mail.example",
        &user.public_key(),
        0,
        2_000_000,
    );
    let assertion = sign_assertion(&user, "https://rp.example", 1_500_000);

    let mut shim = ShimTable::new();
    shim.insert("mail.example", "https://mail.example", delegated_doc("idp.example"));
    shim.insert("idp.example", "https://idp.example", basic_doc(&idp.public_key()));

    let verifier =
        Verifier::new(Config::new("verifier.example"), StubFetcher::new()).with_shim(shim);
    let identity = verifier
        .verify(&bundle(&cert, &assertion), "https://rp.example", NOW)
        .await
        .expect("should verify");

    assert_eq!(identity.email, "alice@mail.example");
    assert_eq!(identity.issuer, "idp.example");
}

#[tokio::test]
async fn delegation_cycle_collapses_to_chain_error() {
    init_tracer();

    let user = user_key();
    let cert =
        issue_cert(&root_key(), "a.example", "alice@a.example", &user.public_key(), 0, 2_000_000);
    let assertion = sign_assertion(&user, "https://rp.example", 1_500_000);

    let fetcher = StubFetcher::new()
        .with_document("a.example", delegated_doc("b.example"))
        .with_document("b.example", delegated_doc("a.example"));

    let verifier = Verifier::new(Config::new("verifier.example"), fetcher);
    let err = verifier
        .verify(&bundle(&cert, &assertion), "https://rp.example", NOW)
        .await
        .expect_err("cycle must fail");

    let Error::BadSignatureInChain(Some(cause)) = err else {
        panic!("expected chain error, got {err:?}");
    };
    assert!(matches!(*cause, Error::DelegationCycle(domain) if domain == "a.example"));
}

#[tokio::test]
async fn audience_port_mismatch() {
    init_tracer();

    let keystore = TestKeystore::new(root_key());
    let user = user_key();
    let cert = issue_cert(
        &root_key(),
        "idp.example",
        "alice@idp.example",
        &user.public_key(),
        0,
        2_000_000,
    );
    let assertion = sign_assertion(&user, "https://rp.example:443", 1_500_000);

    let verifier =
        Verifier::new(Config::new("idp.example"), NoNetwork).with_keystore(&keystore);
    let err = verifier
        .verify(&bundle(&cert, &assertion), "https://rp.example:8443", NOW)
        .await
        .expect_err("ports differ");
    assert!(matches!(err, Error::AudienceMismatch(AudienceField::Port)));
}

#[tokio::test]
async fn expired_assertion_name_preserved() {
    init_tracer();

    let keystore = TestKeystore::new(root_key());
    let user = user_key();
    let cert = issue_cert(
        &root_key(),
        "idp.example",
        "alice@idp.example",
        &user.public_key(),
        0,
        2_000_000,
    );
    let assertion = sign_assertion(&user, "https://rp.example", 500_000);

    let verifier =
        Verifier::new(Config::new("idp.example"), NoNetwork).with_keystore(&keystore);
    let err = verifier
        .verify(&bundle(&cert, &assertion), "https://rp.example", NOW)
        .await
        .expect_err("assertion expired");
    assert!(matches!(err, Error::AssertionExpired));
}

#[tokio::test]
async fn issuer_not_authorized() {
    init_tracer();

    // idp.other signs for mail.example, but mail.example points elsewhere
    let idp = idp_key();
    let user = user_key();
    let cert = issue_cert(
        &idp,
        "idp.other",
        "alice@mail.example",
        &user.public_key(),
        0,
        2_000_000,
    );
    let assertion = sign_assertion(&user, "https://rp.example", 1_500_000);

    let fetcher = StubFetcher::new()
        .with_document("idp.other", basic_doc(&idp.public_key()))
        .with_document("mail.example", delegated_doc("idp.example"))
        .with_document("idp.example", basic_doc(&root_key().public_key()));

    let verifier = Verifier::new(Config::new("verifier.example"), fetcher);
    let err = verifier
        .verify(&bundle(&cert, &assertion), "https://rp.example", NOW)
        .await
        .expect_err("issuer may not speak for mail.example");
    assert!(matches!(err, Error::IssuerNotAuthorized(issuer) if issuer == "idp.other"));
}

#[tokio::test]
async fn master_idp_always_trusted() {
    init_tracer();

    let idp = idp_key();
    let user = user_key();
    let cert = issue_cert(
        &idp,
        "login.persona.example",
        "alice@mail.example",
        &user.public_key(),
        0,
        2_000_000,
    );
    let assertion = sign_assertion(&user, "https://rp.example", 1_500_000);

    // the fallback authority needs no delegation from mail.example
    let fetcher =
        StubFetcher::new().with_document("login.persona.example", basic_doc(&idp.public_key()));
    let config = Config::new("verifier.example").with_master_idp("login.persona.example");

    let verifier = Verifier::new(config, fetcher);
    let identity = verifier
        .verify(&bundle(&cert, &assertion), "https://rp.example", NOW)
        .await
        .expect("master IdP is implicitly trusted");
    assert_eq!(identity.issuer, "login.persona.example");
}

#[tokio::test]
async fn assertion_window_boundaries() {
    init_tracer();

    let keystore = TestKeystore::new(root_key());
    let user = user_key();
    let cert = issue_cert(
        &root_key(),
        "idp.example",
        "alice@idp.example",
        &user.public_key(),
        0,
        2_000_000,
    );

    let verifier =
        Verifier::new(Config::new("idp.example"), NoNetwork).with_keystore(&keystore);

    // exp == now is still valid
    let at_expiry = sign_assertion(&user, "https://rp.example", NOW);
    verifier
        .verify(&bundle(&cert, &at_expiry), "https://rp.example", NOW)
        .await
        .expect("exp == now is accepted");

    // exp == now - 1 is expired
    let just_expired = sign_assertion(&user, "https://rp.example", NOW - 1);
    let err = verifier
        .verify(&bundle(&cert, &just_expired), "https://rp.example", NOW)
        .await
        .expect_err("exp == now - 1 is expired");
    assert!(matches!(err, Error::AssertionExpired));
}

#[tokio::test]
async fn certificate_from_future_name_preserved() {
    init_tracer();

    let keystore = TestKeystore::new(root_key());
    let user = user_key();
    // cert issued one instant after `now`
    let cert = issue_cert(
        &root_key(),
        "idp.example",
        "alice@idp.example",
        &user.public_key(),
        NOW + 1,
        2_000_000,
    );
    let assertion = sign_assertion(&user, "https://rp.example", 1_500_000);

    let verifier =
        Verifier::new(Config::new("idp.example"), NoNetwork).with_keystore(&keystore);
    let err = verifier
        .verify(&bundle(&cert, &assertion), "https://rp.example", NOW)
        .await
        .expect_err("certificate not yet valid");
    assert!(matches!(err, Error::AssertionFromFuture));
}

#[tokio::test]
async fn tampered_certificate_rejected() {
    init_tracer();

    let keystore = TestKeystore::new(root_key());
    let user = user_key();
    // signed by the user's key, not the root's: the chain anchor must refuse
    let cert = issue_cert(
        &user,
        "idp.example",
        "alice@idp.example",
        &user.public_key(),
        0,
        2_000_000,
    );
    let assertion = sign_assertion(&user, "https://rp.example", 1_500_000);

    let verifier =
        Verifier::new(Config::new("idp.example"), NoNetwork).with_keystore(&keystore);
    let err = verifier
        .verify(&bundle(&cert, &assertion), "https://rp.example", NOW)
        .await
        .expect_err("cert not signed by issuer");
    assert!(matches!(err, Error::BadSignatureInChain(_)));
}

#[tokio::test]
async fn assertion_signed_by_wrong_key() {
    init_tracer();

    let keystore = TestKeystore::new(root_key());
    let user = user_key();
    let cert = issue_cert(
        &root_key(),
        "idp.example",
        "alice@idp.example",
        &user.public_key(),
        0,
        2_000_000,
    );
    // signed by a key other than the one the certificate binds
    let assertion = sign_assertion(&dsa_user_key(), "https://rp.example", 1_500_000);

    let verifier =
        Verifier::new(Config::new("idp.example"), NoNetwork).with_keystore(&keystore);
    let err = verifier
        .verify(&bundle(&cert, &assertion), "https://rp.example", NOW)
        .await
        .expect_err("assertion key mismatch");
    assert!(matches!(err, Error::AssertionSignatureInvalid));
}

#[tokio::test]
async fn chain_longer_than_one_rejected() {
    init_tracer();

    let keystore = TestKeystore::new(root_key());
    let intermediate = idp_key();
    let user = user_key();

    // structurally valid two-cert chain: root -> intermediate -> user
    let cert1 = issue_cert(
        &root_key(),
        "idp.example",
        "intermediate@idp.example",
        &intermediate.public_key(),
        0,
        2_000_000,
    );
    let cert2 = issue_cert(
        &intermediate,
        "intermediate.example",
        "alice@idp.example",
        &user.public_key(),
        0,
        2_000_000,
    );
    let assertion = sign_assertion(&user, "https://rp.example", 1_500_000);

    let verifier =
        Verifier::new(Config::new("idp.example"), NoNetwork).with_keystore(&keystore);
    let err = verifier
        .verify(
            &format!("{cert1}~{cert2}~{assertion}"),
            "https://rp.example",
            NOW,
        )
        .await
        .expect_err("chain length capped at 1");
    assert!(matches!(err, Error::ChainTooLong(2)));
}

#[tokio::test]
async fn zero_certificates_rejected() {
    init_tracer();

    let assertion = sign_assertion(&user_key(), "https://rp.example", 1_500_000);
    let verifier = Verifier::new(Config::new("idp.example"), NoNetwork);
    let err = verifier
        .verify(&assertion, "https://rp.example", NOW)
        .await
        .expect_err("a lone assertion is not a bundle");
    assert!(matches!(err, Error::MalformedToken(reason) if reason.contains("no certificates")));
}

#[tokio::test]
async fn unreachable_idp_collapses_to_chain_error() {
    init_tracer();

    let user = user_key();
    let cert = issue_cert(
        &root_key(),
        "down.example",
        "alice@down.example",
        &user.public_key(),
        0,
        2_000_000,
    );
    let assertion = sign_assertion(&user, "https://rp.example", 1_500_000);

    let verifier = Verifier::new(Config::new("verifier.example"), StubFetcher::new());
    let err = verifier
        .verify(&bundle(&cert, &assertion), "https://rp.example", NOW)
        .await
        .expect_err("no route to down.example");

    let Error::BadSignatureInChain(Some(cause)) = err else {
        panic!("expected chain error, got {err:?}");
    };
    assert!(matches!(*cause, Error::IdPUnreachable(domain) if domain == "down.example"));
}

#[test]
fn disk_keystore_round_trip() {
    init_tracer();

    let dir = tempfile::tempdir().expect("should create tempdir");
    let secret = root_key();

    // <name>.secretkey holds the secret key JSON; <name>.cert a JWT whose
    // payload carries the public key
    let secret_json = serde_json::to_string(&secret).expect("should serialize");
    std::fs::write(dir.path().join("root.secretkey"), secret_json).expect("should write");

    let cert = browserid_verifier::Jwt::sign(
        &json!({"public-key": secret.public_key()}),
        &secret,
    )
    .expect("should sign");
    std::fs::write(dir.path().join("root.cert"), cert).expect("should write");

    let keystore = DiskKeyStore::load_default(dir.path()).expect("should load");
    assert_eq!(*keystore.public_key(), secret.public_key());
    assert_eq!(*keystore.secret_key(), secret);

    // missing files surface as errors, not panics
    assert!(DiskKeyStore::load(dir.path(), "missing").is_err());
}
