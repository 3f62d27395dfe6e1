//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Adapters and the file exchange go through store methods (or the
//! `AuditLog` trait); they never execute SQL directly.

mod api_log;
mod processed_file;

pub use api_log::{ApiLogRow, AuditLog, NewApiLog};
pub use processed_file::ProcessedFileRow;

use crate::{error::ChannelingResult, types::ChannelingType};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Connection;

pub struct ChannelingStore {
    conn: Connection,
    path: Option<String>, // None for :memory:
}

impl ChannelingStore {
    pub fn open(path: &str) -> ChannelingResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> ChannelingResult<Self> {
        let conn = Connection::open(":memory:")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases this returns a fresh, isolated database.
    pub fn reopen(&self) -> ChannelingResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> ChannelingResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_channeling_loan_api_log.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_channeling_processed_file.sql"))?;
        Ok(())
    }
}

impl ToSql for ChannelingType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ChannelingType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}
