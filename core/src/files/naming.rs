//! Partner filename patterns: `JUL_PAYMENT_REGULAR_{date}{counter}.txt`.

use crate::error::{ChannelingError, ChannelingResult};
use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

fn default_date_format() -> String {
    "%Y%m%d".to_string()
}

fn default_counter_width() -> usize {
    2
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilenamePattern {
    pub template: String,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// Zero-padded width of `{counter}`.
    #[serde(default = "default_counter_width")]
    pub counter_width: usize,
}

impl FilenamePattern {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            date_format: default_date_format(),
            counter_width: default_counter_width(),
        }
    }

    pub fn render(&self, date: NaiveDate, counter: u32) -> ChannelingResult<String> {
        if StrftimeItems::new(&self.date_format).any(|i| matches!(i, Item::Error)) {
            return Err(ChannelingError::Config(format!(
                "invalid filename date format '{}'",
                self.date_format
            )));
        }
        let mut date_text = String::new();
        write!(date_text, "{}", date.format(&self.date_format))
            .map_err(|e| ChannelingError::Config(e.to_string()))?;
        let counter_text = format!("{:0width$}", counter, width = self.counter_width);
        Ok(self
            .template
            .replace("{date}", &date_text)
            .replace("{counter}", &counter_text))
    }

    /// The lowest-counter name (from 1) not already in `existing`.
    pub fn next_available(&self, date: NaiveDate, existing: &[String]) -> ChannelingResult<String> {
        let mut counter = 1;
        loop {
            let name = self.render(date, counter)?;
            if !existing.contains(&name) {
                return Ok(name);
            }
            if !self.template.contains("{counter}") {
                return Err(ChannelingError::AlreadyRecorded {
                    kind: "batch file".into(),
                    identifier: name,
                });
            }
            counter += 1;
        }
    }
}
