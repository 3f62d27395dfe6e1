//! DBS: plain-text POSTs carrying an org id and a static API key.

use super::{
    parse_body,
    transport::{HttpRequest, HttpTransport, Method, RequestBody},
};
use crate::{
    error::{ChannelingResult, DbsApiError},
    store::{AuditLog, NewApiLog},
    types::{ApplicationId, ChannelingType, LoanId},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const LOAN_APPLICATION_PATH: &str = "/api/v1/loan/application";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbsConfig {
    pub base_url: String,
    pub org_id: String,
    #[serde(default)]
    pub api_key: String,
}

pub struct DbsClient<'a> {
    config: DbsConfig,
    transport: Box<dyn HttpTransport + 'a>,
    audit: &'a dyn AuditLog,
}

impl<'a> DbsClient<'a> {
    pub fn new(config: DbsConfig, transport: Box<dyn HttpTransport + 'a>, audit: &'a dyn AuditLog) -> Self {
        Self {
            config,
            transport,
            audit,
        }
    }

    fn request(&self, path: &str, body: &str) -> HttpRequest {
        HttpRequest::new(Method::Post, format!("{}{}", self.config.base_url, path))
            .header("Content-Type", "text/plain")
            .header("X-DBS-ORG_ID", self.config.org_id.as_str())
            .header("x-api-key", self.config.api_key.as_str())
            .header("X-DBS-uuid", uuid::Uuid::new_v4().to_string())
            .header("X-DBS-timestamp", chrono::Utc::now().to_rfc3339())
            .body(RequestBody::Text(body.to_string()))
    }

    /// Send `body` verbatim. A transport failure or non-2xx status is an
    /// `Err(ChannelingError::Dbs)` carrying the raw status and body; the audit
    /// row is written first either way.
    pub fn send(
        &self,
        path: &str,
        request_type: &str,
        body: &str,
        application_id: Option<ApplicationId>,
        loan_id: Option<LoanId>,
    ) -> ChannelingResult<Value> {
        let entry = NewApiLog::new(ChannelingType::Dbs, request_type)
            .ids(application_id, loan_id)
            .request(body);

        match self.transport.send(&self.request(path, body)) {
            Ok(response) if response.is_success() => {
                self.audit.record(
                    &entry
                        .status(Some(response.status))
                        .response(response.body.as_str()),
                )?;
                Ok(parse_body(&response.body))
            }
            Ok(response) => {
                let err = DbsApiError {
                    status: Some(response.status),
                    message: format!("{request_type} rejected with HTTP {}", response.status),
                    body: response.body,
                };
                log::warn!("{err}");
                self.audit.record(
                    &entry
                        .status(err.status)
                        .response(err.body.as_str())
                        .error(err.message.as_str()),
                )?;
                Err(err.into())
            }
            Err(e) => {
                let err = DbsApiError {
                    status: None,
                    body: String::new(),
                    message: e.to_string(),
                };
                log::warn!("{err}");
                self.audit.record(&entry.error(err.message.as_str()))?;
                Err(err.into())
            }
        }
    }

    pub fn send_loan_application(
        &self,
        body: &str,
        application_id: ApplicationId,
        loan_id: Option<LoanId>,
    ) -> ChannelingResult<Value> {
        self.send(
            LOAN_APPLICATION_PATH,
            "loan_application",
            body,
            Some(application_id),
            loan_id,
        )
    }
}
