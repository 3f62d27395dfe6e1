use super::ChannelingStore;
use crate::{
    error::{ChannelingError, ChannelingResult},
    types::ChannelingType,
};
use rusqlite::{params, ErrorCode, OptionalExtension};
use serde::Serialize;

/// A partner file (or other external identifier) that has been consumed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedFileRow {
    pub id: i64,
    pub channeling_type: ChannelingType,
    pub identifier: String,
    pub record_count: i64,
    pub processed_at: String,
}

impl ChannelingStore {
    /// Mark `identifier` as processed. A second call for the same partner and
    /// identifier is a duplicate delivery and fails with `AlreadyRecorded`.
    pub fn record_processed(
        &self,
        channeling_type: ChannelingType,
        identifier: &str,
        record_count: usize,
    ) -> ChannelingResult<i64> {
        let inserted = self.conn.execute(
            "INSERT INTO channeling_processed_file
             (channeling_type, identifier, record_count, processed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                channeling_type,
                identifier,
                record_count as i64,
                chrono::Utc::now().to_rfc3339(),
            ],
        );
        match inserted {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(ChannelingError::AlreadyRecorded {
                    kind: format!("{channeling_type} file"),
                    identifier: identifier.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn is_processed(&self, channeling_type: ChannelingType, identifier: &str) -> ChannelingResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM channeling_processed_file
                 WHERE channeling_type = ?1 AND identifier = ?2",
                params![channeling_type, identifier],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn processed_files(&self, channeling_type: ChannelingType) -> ChannelingResult<Vec<ProcessedFileRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, channeling_type, identifier, record_count, processed_at
             FROM channeling_processed_file
             WHERE channeling_type = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![channeling_type], |row| {
                Ok(ProcessedFileRow {
                    id: row.get(0)?,
                    channeling_type: row.get(1)?,
                    identifier: row.get(2)?,
                    record_count: row.get(3)?,
                    processed_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
