use super::ChannelingStore;
use crate::{
    error::ChannelingResult,
    types::{ApplicationId, ChannelingType, LoanId},
};
use rusqlite::{params, Row};
use serde::Serialize;

/// Sink for partner-call audit rows. Adapters depend on this trait so they
/// can be exercised without a database.
pub trait AuditLog {
    fn record(&self, entry: &NewApiLog) -> ChannelingResult<()>;
}

/// An audit row about to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewApiLog {
    pub channeling_type: ChannelingType,
    pub application_id: Option<ApplicationId>,
    pub loan_id: Option<LoanId>,
    pub request_type: String,
    pub http_status_code: Option<u16>,
    pub request: String,
    pub response: String,
    pub error_message: Option<String>,
}

impl NewApiLog {
    pub fn new(channeling_type: ChannelingType, request_type: impl Into<String>) -> Self {
        Self {
            channeling_type,
            application_id: None,
            loan_id: None,
            request_type: request_type.into(),
            http_status_code: None,
            request: String::new(),
            response: String::new(),
            error_message: None,
        }
    }

    pub fn ids(mut self, application_id: Option<ApplicationId>, loan_id: Option<LoanId>) -> Self {
        self.application_id = application_id;
        self.loan_id = loan_id;
        self
    }

    pub fn status(mut self, code: Option<u16>) -> Self {
        self.http_status_code = code;
        self
    }

    pub fn request(mut self, request: impl Into<String>) -> Self {
        self.request = request.into();
        self
    }

    pub fn response(mut self, response: impl Into<String>) -> Self {
        self.response = response.into();
        self
    }

    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// A persisted audit row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiLogRow {
    pub id: i64,
    pub channeling_type: ChannelingType,
    pub application_id: Option<ApplicationId>,
    pub loan_id: Option<LoanId>,
    pub request_type: String,
    pub http_status_code: Option<u16>,
    pub request: String,
    pub response: String,
    pub error_message: Option<String>,
    pub created_at: String,
}

const API_LOG_COLUMNS: &str = "id, channeling_type, application_id, loan_id, request_type,
     http_status_code, request, response, error_message, created_at";

impl ChannelingStore {
    /// Append one audit row and return its id. There is deliberately no
    /// update or delete counterpart.
    pub fn insert_api_log(&self, entry: &NewApiLog) -> ChannelingResult<i64> {
        self.conn.execute(
            "INSERT INTO channeling_loan_api_log
             (channeling_type, application_id, loan_id, request_type,
              http_status_code, request, response, error_message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entry.channeling_type,
                entry.application_id,
                entry.loan_id,
                entry.request_type,
                entry.http_status_code,
                entry.request,
                entry.response,
                entry.error_message,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn api_logs_for_loan(&self, loan_id: LoanId) -> ChannelingResult<Vec<ApiLogRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {API_LOG_COLUMNS} FROM channeling_loan_api_log
             WHERE loan_id = ?1 ORDER BY id ASC"
        ))?;
        let rows = stmt
            .query_map(params![loan_id], Self::map_api_log_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn api_logs_for_application(&self, application_id: ApplicationId) -> ChannelingResult<Vec<ApiLogRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {API_LOG_COLUMNS} FROM channeling_loan_api_log
             WHERE application_id = ?1 ORDER BY id ASC"
        ))?;
        let rows = stmt
            .query_map(params![application_id], Self::map_api_log_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Most recent rows first.
    pub fn recent_api_logs(&self, limit: usize) -> ChannelingResult<Vec<ApiLogRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {API_LOG_COLUMNS} FROM channeling_loan_api_log
             ORDER BY id DESC LIMIT ?1"
        ))?;
        let rows = stmt
            .query_map(params![limit as i64], Self::map_api_log_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn api_log_count(&self) -> ChannelingResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM channeling_loan_api_log",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn failed_api_log_count(&self, channeling_type: ChannelingType) -> ChannelingResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM channeling_loan_api_log
             WHERE channeling_type = ?1 AND error_message IS NOT NULL",
            params![channeling_type],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn map_api_log_row(row: &Row<'_>) -> rusqlite::Result<ApiLogRow> {
        Ok(ApiLogRow {
            id: row.get(0)?,
            channeling_type: row.get(1)?,
            application_id: row.get(2)?,
            loan_id: row.get(3)?,
            request_type: row.get(4)?,
            http_status_code: row.get(5)?,
            request: row.get(6)?,
            response: row.get(7)?,
            error_message: row.get(8)?,
            created_at: row.get(9)?,
        })
    }
}

impl AuditLog for ChannelingStore {
    fn record(&self, entry: &NewApiLog) -> ChannelingResult<()> {
        let id = self.insert_api_log(entry)?;
        log::debug!(
            "audit #{id}: {} {} status={:?} error={:?}",
            entry.channeling_type,
            entry.request_type,
            entry.http_status_code,
            entry.error_message
        );
        Ok(())
    }
}
