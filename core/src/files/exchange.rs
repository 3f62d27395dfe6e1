use super::layout::FileLayout;
use crate::{
    clients::RemoteFiles,
    error::{ChannelingError, ChannelingResult},
    store::{AuditLog, ChannelingStore, NewApiLog},
};
use chrono::NaiveDate;
use serde_json::{Map, Value};

/// An approval file read back from the partner.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalFile {
    pub name: String,
    pub records: Vec<Map<String, Value>>,
}

fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), name)
    }
}

/// Result of one sweep over an approval directory. Every file in `files`
/// has been marked processed; files in `failures` have not and are picked up
/// again by the next sweep.
#[derive(Debug, Default)]
pub struct ApprovalSweep {
    pub files: Vec<ApprovalFile>,
    pub failures: Vec<(String, ChannelingError)>,
}

/// Uploads request batches and collects approval files, recording each
/// transfer in the audit log.
pub struct BatchExchange<'a> {
    remote: &'a dyn RemoteFiles,
    store: &'a ChannelingStore,
}

impl<'a> BatchExchange<'a> {
    pub fn new(remote: &'a dyn RemoteFiles, store: &'a ChannelingStore) -> Self {
        Self { remote, store }
    }

    /// Render `docs`, pick the next free filename for `date` in the request
    /// directory and upload. Returns the remote file name.
    pub fn upload_batch(
        &self,
        layout: &FileLayout,
        date: NaiveDate,
        docs: &[Map<String, Value>],
    ) -> ChannelingResult<String> {
        let existing = self.remote.list(&layout.request_dir)?;
        let name = layout.filename.next_available(date, &existing)?;
        let contents = layout
            .render(docs)
            .map_err(|reason| ChannelingError::MalformedFile {
                name: name.clone(),
                reason,
            })?;
        let path = join(&layout.request_dir, &name);

        let entry = NewApiLog::new(layout.channeling_type, "sftp_upload").request(path.as_str());
        match self.remote.upload(&path, contents.as_bytes()) {
            Ok(()) => {
                self.store
                    .record(&entry.response(format!("{} records", docs.len())))?;
                log::info!("{} batch {path}: {} records", layout.channeling_type, docs.len());
                Ok(name)
            }
            Err(e) => {
                self.store.record(&entry.error(e.to_string()))?;
                Err(e)
            }
        }
    }

    /// Download and parse every approval file not processed before. A file
    /// that fails does not stop the sweep; it is reported in `failures`.
    pub fn collect_approvals(&self, layout: &FileLayout) -> ChannelingResult<ApprovalSweep> {
        let mut sweep = ApprovalSweep::default();
        for name in self.remote.list(&layout.approval_dir)? {
            if self.store.is_processed(layout.channeling_type, &name)? {
                log::debug!("skipping processed approval file {name}");
                continue;
            }
            match self.process_approval(layout, &name) {
                Ok(file) => sweep.files.push(file),
                Err(e) => {
                    log::warn!("{} approval {name} failed: {e}", layout.channeling_type);
                    sweep.failures.push((name, e));
                }
            }
        }
        Ok(sweep)
    }

    /// Read one approval file. A file already processed is a duplicate
    /// delivery and fails with `AlreadyRecorded`.
    pub fn process_approval(&self, layout: &FileLayout, name: &str) -> ChannelingResult<ApprovalFile> {
        if self.store.is_processed(layout.channeling_type, name)? {
            return Err(ChannelingError::AlreadyRecorded {
                kind: format!("{} file", layout.channeling_type),
                identifier: name.to_string(),
            });
        }

        let path = join(&layout.approval_dir, name);
        let entry = NewApiLog::new(layout.channeling_type, "sftp_download").request(path.as_str());
        let bytes = match self.remote.download(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.store.record(&entry.error(e.to_string()))?;
                return Err(e);
            }
        };

        let parsed = String::from_utf8(bytes)
            .map_err(|e| e.to_string())
            .and_then(|text| layout.parse_approval(&text));
        let records = match parsed {
            Ok(records) => records,
            Err(reason) => {
                self.store.record(&entry.error(reason.as_str()))?;
                return Err(ChannelingError::MalformedFile {
                    name: name.to_string(),
                    reason,
                });
            }
        };

        self.store
            .record(&entry.response(format!("{} records", records.len())))?;
        // Marked last, so a file is only skipped once its records are handed back.
        self.store
            .record_processed(layout.channeling_type, name, records.len())?;
        log::info!("{} approval {path}: {} records", layout.channeling_type, records.len());

        Ok(ApprovalFile {
            name: name.to_string(),
            records,
        })
    }
}
