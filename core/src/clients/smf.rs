//! SMF: JSON requests signed with HMAC-SHA256.
//!
//! Signing string, one item per line, each line `\n`-terminated:
//!
//! ```text
//! METHOD
//! /path
//! a=1&b=2            (query pairs sorted by key, then value)
//! ACCESS_KEY
//! 2024-05-01T10:00:00+00:00
//! content-type:application/json
//! x-content-digest:...   (one line per signed header, sorted by lower-cased name)
//! ```
//!
//! `signature = base64(hmac_sha256(secret_key, signing_string))`.

use super::{
    parse_body,
    transport::{HttpRequest, HttpTransport, Method, RequestBody},
    PartnerOutcome,
};
use crate::{
    error::{ChannelingError, ChannelingResult},
    store::{AuditLog, NewApiLog},
    types::{ApplicationId, ChannelingType, LoanId},
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmfConfig {
    pub base_url: String,
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
}

/// Everything the signature depends on. Signing is a pure function of this.
#[derive(Debug, Clone)]
pub struct SigningInput<'a> {
    pub method: Method,
    pub path: &'a str,
    pub query: &'a [(String, String)],
    pub headers: &'a [(String, String)],
    pub body: &'a [u8],
    pub access_key: &'a str,
    pub secret_key: &'a str,
    pub timestamp: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub access_key: String,
    pub timestamp: String,
    pub signature: String,
    /// Comma-joined, lower-cased, sorted names of the signed headers.
    pub signed_headers: String,
    pub content_digest: String,
}

impl SignedHeaders {
    pub fn pairs(&self) -> Vec<(String, String)> {
        vec![
            ("X-Access-Key".into(), self.access_key.clone()),
            ("X-Timestamp".into(), self.timestamp.clone()),
            ("X-Signature".into(), self.signature.clone()),
            ("X-Signature-Headers".into(), self.signed_headers.clone()),
            ("X-Content-Digest".into(), self.content_digest.clone()),
        ]
    }
}

pub fn content_digest(body: &[u8]) -> String {
    BASE64.encode(Sha256::digest(body))
}

pub fn canonical_query(query: &[(String, String)]) -> String {
    let mut pairs: Vec<&(String, String)> = query.iter().collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn signing_string(input: &SigningInput<'_>) -> String {
    let mut headers: Vec<(String, String)> = input
        .headers
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.trim().to_string()))
        .collect();
    headers.sort();

    let mut out = format!(
        "{}\n{}\n{}\n{}\n{}\n",
        input.method.as_str(),
        input.path,
        canonical_query(input.query),
        input.access_key,
        input.timestamp
    );
    for (name, value) in &headers {
        out.push_str(name);
        out.push(':');
        out.push_str(value);
        out.push('\n');
    }
    out
}

pub fn sign_request(input: &SigningInput<'_>) -> ChannelingResult<SignedHeaders> {
    let mut mac = HmacSha256::new_from_slice(input.secret_key.as_bytes())
        .map_err(|e| ChannelingError::Config(format!("SMF secret key: {e}")))?;
    mac.update(signing_string(input).as_bytes());
    let signature = BASE64.encode(mac.finalize().into_bytes());

    let mut names: Vec<String> = input.headers.iter().map(|(k, _)| k.to_ascii_lowercase()).collect();
    names.sort();

    Ok(SignedHeaders {
        access_key: input.access_key.to_string(),
        timestamp: input.timestamp.to_string(),
        signature,
        signed_headers: names.join(","),
        content_digest: content_digest(input.body),
    })
}

pub struct SmfClient<'a> {
    config: SmfConfig,
    transport: Box<dyn HttpTransport + 'a>,
    audit: &'a dyn AuditLog,
}

impl<'a> SmfClient<'a> {
    pub fn new(config: SmfConfig, transport: Box<dyn HttpTransport + 'a>, audit: &'a dyn AuditLog) -> Self {
        Self {
            config,
            transport,
            audit,
        }
    }

    /// Build the signed request for `body` at the given timestamp.
    pub fn signed_request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: &Value,
        timestamp: &str,
    ) -> ChannelingResult<HttpRequest> {
        let raw = match method {
            Method::Get  => Vec::new(),
            Method::Post => serde_json::to_vec(body)?,
        };
        let digest = content_digest(&raw);
        let signed = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("X-Content-Digest".to_string(), digest),
        ];
        let headers = sign_request(&SigningInput {
            method,
            path,
            query,
            headers: &signed,
            body: &raw,
            access_key: &self.config.access_key,
            secret_key: &self.config.secret_key,
            timestamp,
        })?;

        let mut request = HttpRequest::new(method, format!("{}{}", self.config.base_url, path))
            .header("Content-Type", "application/json")
            .query(query);
        for (name, value) in headers.pairs() {
            request = request.header(name, value);
        }
        if method == Method::Post {
            request = request.body(RequestBody::Json(body.clone()));
        }
        Ok(request)
    }

    pub fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: &Value,
        request_type: &str,
        application_id: Option<ApplicationId>,
        loan_id: Option<LoanId>,
    ) -> ChannelingResult<PartnerOutcome> {
        let timestamp = chrono::Utc::now().to_rfc3339();
        let request = self.signed_request(method, path, query, body, &timestamp)?;
        let entry = NewApiLog::new(ChannelingType::Smf, request_type)
            .ids(application_id, loan_id)
            .request(request.body.describe());

        let outcome = match self.transport.send(&request) {
            Ok(response) if response.is_success() => {
                self.audit.record(
                    &entry
                        .status(Some(response.status))
                        .response(response.body.as_str()),
                )?;
                PartnerOutcome::Body(parse_body(&response.body))
            }
            Ok(response) => {
                let error = format!("SMF returned HTTP {}", response.status);
                log::warn!("SMF {request_type}: {error}");
                self.audit.record(
                    &entry
                        .status(Some(response.status))
                        .response(response.body.as_str())
                        .error(error.as_str()),
                )?;
                PartnerOutcome::Failed { error }
            }
            Err(e) => {
                let error = e.to_string();
                log::warn!("SMF {request_type}: {error}");
                self.audit.record(&entry.error(error.as_str()))?;
                PartnerOutcome::Failed { error }
            }
        };
        Ok(outcome)
    }
}
