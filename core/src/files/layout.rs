//! Batch file bodies: fixed-width records and `|`-delimited tables.

use crate::{mapping::OutputMode, types::ChannelingType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::naming::FilenamePattern;

/// One column of a fixed-width file, at a 0-based character offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub position: usize,
    pub length: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedWidthLayout {
    pub columns: Vec<Column>,
}

impl FixedWidthLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, name: impl Into<String>, position: usize, length: usize) -> Self {
        self.columns.push(Column {
            name: name.into(),
            position,
            length,
        });
        self
    }

    pub fn width(&self) -> usize {
        self.columns
            .iter()
            .map(|c| c.position + c.length)
            .max()
            .unwrap_or(0)
    }

    /// Slice one line into trimmed column values. Short lines are tolerated:
    /// columns past the end of the line come back empty.
    pub fn parse_line(&self, line: &str) -> Map<String, Value> {
        let chars: Vec<char> = line.trim_end_matches(&['\r', '\n'][..]).chars().collect();
        self.columns
            .iter()
            .map(|c| {
                let start = c.position.min(chars.len());
                let end = (c.position + c.length).min(chars.len());
                let text: String = chars[start..end].iter().collect();
                (c.name.clone(), Value::String(text.trim().to_string()))
            })
            .collect()
    }

    /// Every non-blank line of `text`.
    pub fn parse(&self, text: &str) -> Vec<Map<String, Value>> {
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| self.parse_line(line))
            .collect()
    }

    /// Lay a record out by column position. Missing values are blank; values
    /// are space-padded or cut to their column length.
    pub fn render_record(&self, record: &Map<String, Value>) -> String {
        let mut line = vec![' '; self.width()];
        for c in &self.columns {
            let text = record.get(&c.name).map(text_of).unwrap_or_default();
            for (offset, ch) in text.chars().take(c.length).enumerate() {
                line[c.position + offset] = ch;
            }
        }
        line.into_iter().collect()
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn has_line_break(text: &str) -> bool {
    text.contains(&['\r', '\n'][..])
}

/// Concatenate the values of fixed-width resolved documents, one line each.
/// A value containing a line break would split its record and is rejected.
pub fn render_fixed_width(docs: &[Map<String, Value>]) -> Result<String, String> {
    let mut out = String::new();
    for (row, doc) in docs.iter().enumerate() {
        for (key, value) in doc {
            let text = text_of(value);
            if has_line_break(&text) {
                return Err(format!("record {} field '{key}' contains a line break", row + 1));
            }
            out.push_str(&text);
        }
        out.push('\n');
    }
    Ok(out)
}

/// Join each document's values with `separator`, one line per document.
/// Values holding the separator or a line break cannot be represented and
/// are rejected rather than written as a ragged row.
pub fn render_delimited(docs: &[Map<String, Value>], separator: &str, header: bool) -> Result<String, String> {
    let mut out = String::new();
    if header {
        if let Some(first) = docs.first() {
            out.push_str(&first.keys().cloned().collect::<Vec<_>>().join(separator));
            out.push('\n');
        }
    }
    for (row, doc) in docs.iter().enumerate() {
        let mut fields = Vec::with_capacity(doc.len());
        for (key, value) in doc {
            let text = text_of(value);
            if text.contains(separator) || has_line_break(&text) {
                return Err(format!(
                    "record {} field '{key}' contains the separator '{separator}' or a line break",
                    row + 1
                ));
            }
            fields.push(text);
        }
        out.push_str(&fields.join(separator));
        out.push('\n');
    }
    Ok(out)
}

/// Parse a delimited table whose first line is the header. Returns the
/// reason on a row with the wrong number of fields.
pub fn parse_delimited(text: &str, separator: &str) -> Result<Vec<Map<String, Value>>, String> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let Some(header) = lines.next() else {
        return Ok(Vec::new());
    };
    let names: Vec<&str> = header.split(separator).map(str::trim).collect();

    let mut rows = Vec::new();
    for (index, line) in lines.enumerate() {
        let fields: Vec<&str> = line.split(separator).collect();
        if fields.len() != names.len() {
            return Err(format!(
                "row {} has {} fields, header has {}",
                index + 1,
                fields.len(),
                names.len()
            ));
        }
        rows.push(
            names
                .iter()
                .zip(fields)
                .map(|(name, field)| (name.to_string(), Value::String(field.trim().to_string())))
                .collect(),
        );
    }
    Ok(rows)
}

fn default_separator() -> String {
    "|".to_string()
}

fn default_header() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileFormat {
    FixedWidth,
    Delimited {
        #[serde(default = "default_separator")]
        separator: String,
        #[serde(default = "default_header")]
        header: bool,
    },
}

/// Everything needed to exchange one kind of batch file with a partner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileLayout {
    pub channeling_type: ChannelingType,
    /// Mapping table producing one record per transaction.
    pub table: String,
    pub format: FileFormat,
    pub request_dir: String,
    pub approval_dir: String,
    pub filename: FilenamePattern,
    /// Column offsets of the partner's approval file (fixed-width format).
    #[serde(default)]
    pub approval: FixedWidthLayout,
}

impl FileLayout {
    pub fn output_mode(&self) -> OutputMode {
        match self.format {
            FileFormat::FixedWidth       => OutputMode::FixedWidth,
            FileFormat::Delimited { .. } => OutputMode::Json,
        }
    }

    pub fn render(&self, docs: &[Map<String, Value>]) -> Result<String, String> {
        match &self.format {
            FileFormat::FixedWidth => render_fixed_width(docs),
            FileFormat::Delimited { separator, header } => render_delimited(docs, separator, *header),
        }
    }

    pub fn parse_approval(&self, text: &str) -> Result<Vec<Map<String, Value>>, String> {
        match &self.format {
            FileFormat::FixedWidth => Ok(self.approval.parse(text)),
            FileFormat::Delimited { separator, .. } => parse_delimited(text, separator),
        }
    }
}
