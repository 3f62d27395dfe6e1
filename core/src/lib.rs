//! Partner loan-channeling engine.
//!
//! Converts internal loan/customer records into partner wire formats through
//! declarative mapping tables, ships them to partners over HTTP or SFTP, and
//! keeps an append-only audit trail of every transmission attempt.

pub mod clients;
pub mod config;
pub mod context;
pub mod error;
pub mod files;
pub mod mapping;
pub mod store;
pub mod submission;
pub mod transform;
pub mod types;
