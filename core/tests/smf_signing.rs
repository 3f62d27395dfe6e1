//! SMF request signing and the signed client.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use channeling_core::{
    clients::{
        sign_request, smf::content_digest, HttpRequest, HttpResponse, HttpTransport, Method, PartnerOutcome,
        SigningInput, SmfClient, SmfConfig,
    },
    error::TransportError,
    store::ChannelingStore,
};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::rc::Rc;

// ── Test helpers ────────────────────────────────────────────────────────────

type Sent = Rc<RefCell<Vec<HttpRequest>>>;

struct FakeTransport {
    sent: Sent,
    status: u16,
    body: &'static str,
}

impl HttpTransport for FakeTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.sent.borrow_mut().push(request.clone());
        Ok(HttpResponse {
            status: self.status,
            body: self.body.to_string(),
        })
    }
}

fn headers() -> Vec<(String, String)> {
    vec![
        ("X-Content-Digest".to_string(), "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=".to_string()),
        ("Content-Type".to_string(), "application/json".to_string()),
    ]
}

fn query() -> Vec<(String, String)> {
    vec![
        ("page".to_string(), "2".to_string()),
        ("loan".to_string(), "JUL1".to_string()),
    ]
}

fn config() -> SmfConfig {
    SmfConfig {
        base_url: "https://smf.test".into(),
        access_key: "AK-1".into(),
        secret_key: "s3cret".into(),
    }
}

// ── Signing ─────────────────────────────────────────────────────────────────

#[test]
fn signature_is_deterministic() {
    let headers = headers();
    let query = query();
    let input = SigningInput {
        method: Method::Post,
        path: "/v1/loans",
        query: &query,
        headers: &headers,
        body: b"",
        access_key: "AK-1",
        secret_key: "s3cret",
        timestamp: "2024-05-01T10:00:00+00:00",
    };
    let first = sign_request(&input).unwrap();
    let second = sign_request(&input).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.signed_headers, "content-type,x-content-digest");
}

#[test]
fn signature_matches_independent_hmac() {
    let headers = headers();
    let query = query();
    let input = SigningInput {
        method: Method::Get,
        path: "/v1/loans",
        query: &query,
        headers: &headers,
        body: b"",
        access_key: "AK-1",
        secret_key: "s3cret",
        timestamp: "2024-05-01T10:00:00+00:00",
    };
    let expected_string = "GET\n/v1/loans\nloan=JUL1&page=2\nAK-1\n2024-05-01T10:00:00+00:00\n\
                           content-type:application/json\n\
                           x-content-digest:47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=\n";
    let mut mac = Hmac::<Sha256>::new_from_slice(b"s3cret").unwrap();
    mac.update(expected_string.as_bytes());
    let expected = BASE64.encode(mac.finalize().into_bytes());

    assert_eq!(sign_request(&input).unwrap().signature, expected);
}

#[test]
fn any_input_change_changes_the_signature() {
    let headers = headers();
    let query = query();
    let base = SigningInput {
        method: Method::Post,
        path: "/v1/loans",
        query: &query,
        headers: &headers,
        body: b"{}",
        access_key: "AK-1",
        secret_key: "s3cret",
        timestamp: "2024-05-01T10:00:00+00:00",
    };
    let original = sign_request(&base).unwrap().signature;

    let later = SigningInput {
        timestamp: "2024-05-01T10:00:01+00:00",
        ..base.clone()
    };
    let other_path = SigningInput {
        path: "/v1/loan",
        ..base.clone()
    };
    let other_key = SigningInput {
        secret_key: "other",
        ..base.clone()
    };
    for changed in [later, other_path, other_key] {
        assert_ne!(sign_request(&changed).unwrap().signature, original);
    }
}

#[test]
fn content_digest_is_base64_sha256() {
    let body = br#"{"principal":3000000}"#;
    assert_eq!(content_digest(body), BASE64.encode(Sha256::digest(body)));
    // SHA-256 of the empty string
    assert_eq!(content_digest(b""), "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=");
}

// ── Client ──────────────────────────────────────────────────────────────────

#[test]
fn signed_request_carries_auth_headers() {
    let store = ChannelingStore::in_memory().unwrap();
    store.migrate().unwrap();
    let sent: Sent = Rc::default();
    let client = SmfClient::new(
        config(),
        Box::new(FakeTransport {
            sent: sent.clone(),
            status: 200,
            body: "{}",
        }),
        &store,
    );

    let body = json!({ "principal": 3_000_000 });
    let request = client
        .signed_request(Method::Post, "/v1/loans", &[], &body, "2024-05-01T10:00:00+00:00")
        .unwrap();
    assert_eq!(request.url, "https://smf.test/v1/loans");
    assert_eq!(request.header_value("X-Access-Key"), Some("AK-1"));
    assert_eq!(request.header_value("X-Timestamp"), Some("2024-05-01T10:00:00+00:00"));
    assert_eq!(
        request.header_value("X-Content-Digest").map(str::to_string),
        Some(content_digest(&serde_json::to_vec(&body).unwrap()))
    );
    assert!(request.header_value("X-Signature").is_some());

    let again = client
        .signed_request(Method::Post, "/v1/loans", &[], &body, "2024-05-01T10:00:00+00:00")
        .unwrap();
    assert_eq!(again.header_value("X-Signature"), request.header_value("X-Signature"));
    assert!(sent.borrow().is_empty());
}

#[test]
fn failed_call_returns_sentinel_and_is_logged() {
    let store = ChannelingStore::in_memory().unwrap();
    store.migrate().unwrap();
    let sent: Sent = Rc::default();
    let client = SmfClient::new(
        config(),
        Box::new(FakeTransport {
            sent: sent.clone(),
            status: 503,
            body: "maintenance",
        }),
        &store,
    );

    let outcome = client
        .send(Method::Post, "/v1/loans", &[], &json!({ "a": 1 }), "loan_submission", Some(5), Some(9))
        .unwrap();
    assert!(outcome.is_failed());
    assert_eq!(
        outcome.clone().into_legacy_json(),
        json!({ "error": "SMF returned HTTP 503" })
    );
    assert!(matches!(outcome, PartnerOutcome::Failed { .. }));
    assert_eq!(sent.borrow().len(), 1);

    let rows = store.api_logs_for_loan(9).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].http_status_code, Some(503));
    assert_eq!(rows[0].response, "maintenance");
    assert_eq!(rows[0].request, r#"{"a":1}"#);
    assert_eq!(rows[0].error_message.as_deref(), Some("SMF returned HTTP 503"));
}
