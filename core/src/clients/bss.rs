//! BSS: form-encoded POSTs authenticated with a shared user secret.
//!
//! When mock responses are switched on for an application, the adapter
//! answers from a canned body instead of calling the partner, and logs that
//! body as if it had come back over the wire.

use super::{
    parse_body,
    transport::{HttpRequest, HttpTransport, Method, RequestBody},
    PartnerOutcome,
};
use crate::{
    error::ChannelingResult,
    store::{AuditLog, NewApiLog},
    types::{ApplicationId, ChannelingType, LoanId},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BssConfig {
    pub base_url: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub mock: BssMockConfig,
}

/// Feature-flag driven canned responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BssMockConfig {
    #[serde(default)]
    pub is_active: bool,
    /// Applications the mock applies to; empty means every application.
    #[serde(default)]
    pub application_ids: Vec<ApplicationId>,
    /// Keyed by `request_path + trxtype`.
    #[serde(default)]
    pub responses: HashMap<String, BssResponseStatus>,
}

impl BssMockConfig {
    pub fn response_for(
        &self,
        application_id: Option<ApplicationId>,
        request_path: &str,
        trxtype: &str,
    ) -> Option<BssResponseStatus> {
        if !self.is_active {
            return None;
        }
        let applies = self.application_ids.is_empty()
            || application_id.is_some_and(|id| self.application_ids.contains(&id));
        if !applies {
            return None;
        }
        self.responses.get(&format!("{request_path}{trxtype}")).copied()
    }
}

/// Partner response branches, also used to select canned mock bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BssResponseStatus {
    Success,
    ValidationFailure,
    ScheduleFailure,
    BankCheckFailure,
    InProgress,
    Undefined,
}

impl BssResponseStatus {
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::Success           => Some("00"),
            Self::ValidationFailure => Some("01"),
            Self::ScheduleFailure   => Some("02"),
            Self::BankCheckFailure  => Some("03"),
            Self::InProgress        => Some("09"),
            Self::Undefined         => None,
        }
    }

    /// Read the partner's `responseCode`. Unknown or absent codes are `Undefined`.
    pub fn classify(body: &Value) -> Self {
        match body.get("responseCode").and_then(Value::as_str) {
            Some("00") => Self::Success,
            Some("01") => Self::ValidationFailure,
            Some("02") => Self::ScheduleFailure,
            Some("03") => Self::BankCheckFailure,
            Some("09") => Self::InProgress,
            _ => Self::Undefined,
        }
    }

    pub fn canned_body(&self) -> Value {
        match self {
            Self::Success => json!({
                "responseCode": "00",
                "responseDescription": "Success",
            }),
            Self::ValidationFailure => json!({
                "responseCode": "01",
                "responseDescription": "Validation failed",
                "errors": [{ "field": "nik", "message": "invalid format" }],
            }),
            Self::ScheduleFailure => json!({
                "responseCode": "02",
                "responseDescription": "Installment schedule does not match",
            }),
            Self::BankCheckFailure => json!({
                "responseCode": "03",
                "responseDescription": "Bank account check failed",
            }),
            Self::InProgress => json!({
                "responseCode": "09",
                "responseDescription": "Request is being processed",
            }),
            Self::Undefined => json!({
                "responseCode": "XX",
                "responseDescription": "Undefined response",
            }),
        }
    }
}

/// `hex(md5(user || user || user))`, the partner's per-request hashcode.
pub fn hashcode(user: &str) -> String {
    hex::encode(md5::compute(user.repeat(3)).0)
}

fn form_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub struct BssClient<'a> {
    config: BssConfig,
    transport: Box<dyn HttpTransport + 'a>,
    audit: &'a dyn AuditLog,
}

impl<'a> BssClient<'a> {
    pub fn new(config: BssConfig, transport: Box<dyn HttpTransport + 'a>, audit: &'a dyn AuditLog) -> Self {
        Self {
            config,
            transport,
            audit,
        }
    }

    pub fn config(&self) -> &BssConfig {
        &self.config
    }

    /// POST `data` plus `trxtype` (and credentials when configured) to
    /// `base_url + request_path`. Failures come back as `PartnerOutcome::Failed`;
    /// only an audit-write failure is an `Err`.
    pub fn send_request(
        &self,
        request_path: &str,
        trxtype: &str,
        data: &Map<String, Value>,
        application_id: Option<ApplicationId>,
        loan_id: Option<LoanId>,
    ) -> ChannelingResult<PartnerOutcome> {
        let mut payload = data.clone();
        payload.insert("trxtype".into(), Value::String(trxtype.to_string()));
        let logged_request = Value::Object(payload.clone()).to_string();
        let request_type = format!("{request_path}{trxtype}");
        let entry = NewApiLog::new(ChannelingType::Bss, request_type.as_str())
            .ids(application_id, loan_id)
            .request(logged_request);

        if let Some(status) = self.config.mock.response_for(application_id, request_path, trxtype) {
            let body = status.canned_body();
            log::info!("BSS {request_type}: mocked {status:?} response for application {application_id:?}");
            self.audit
                .record(&entry.status(Some(200)).response(body.to_string()))?;
            return Ok(PartnerOutcome::Body(body));
        }

        if let Some(user) = &self.config.user {
            payload.insert("user".into(), Value::String(user.clone()));
            payload.insert("hashcode".into(), Value::String(hashcode(user)));
        }
        let form = payload
            .iter()
            .map(|(k, v)| (k.clone(), form_value(v)))
            .collect();
        let request = HttpRequest::new(Method::Post, format!("{}{}", self.config.base_url, request_path))
            .body(RequestBody::Form(form))
            .timeout(Duration::from_secs(self.config.timeout_secs));

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
                let error = format!("BSS returned HTTP {}", response.status);
                log::warn!("BSS {request_type}: {error}");
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
                log::warn!("BSS {request_type}: {error}");
                self.audit.record(&entry.error(error.as_str()))?;
                PartnerOutcome::Failed { error }
            }
        };
        Ok(outcome)
    }
}
