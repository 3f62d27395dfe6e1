//! Value post-processing: date formatting, type coercion, fixed widths.

use super::{DataType, OutputMode, Padding};
use crate::error::MappingError;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{json, Value};
use std::fmt::{Display, Write};

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// True when chrono accepts every specifier in `format`.
pub(crate) fn is_valid_strftime(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

fn render(formatted: impl Display) -> Option<String> {
    let mut out = String::new();
    write!(out, "{formatted}").ok()?;
    Some(out)
}

/// Reformat date-like strings; anything else passes through untouched.
pub(crate) fn apply_output_format(value: Value, format: &str) -> Value {
    let Value::String(text) = &value else {
        return value;
    };
    let text = text.trim();

    let formatted = if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        render(dt.format(format))
    } else if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
    {
        render(dt.format(format))
    } else if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        date.and_hms_opt(0, 0, 0).and_then(|dt| render(dt.format(format)))
    } else {
        None
    };

    match formatted {
        Some(s) => Value::String(s),
        None => value,
    }
}

/// Null, empty strings and empty collections count as "no value".
pub(crate) fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

pub(crate) fn coerce(value: Value, data_type: DataType, key_path: &str) -> Result<Value, MappingError> {
    let fail = |v: &Value| MappingError::Coercion {
        key_path: key_path.to_string(),
        data_type: data_type.name().to_string(),
        value: v.to_string(),
    };

    if value.is_null() {
        return Ok(value);
    }

    match data_type {
        DataType::Str => match &value {
            Value::String(_) => Ok(value),
            Value::Number(n) => Ok(json!(n.to_string())),
            Value::Bool(b) => Ok(json!(b.to_string())),
            other => Err(fail(other)),
        },
        DataType::Int => match &value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                .map(|i| json!(i))
                .ok_or_else(|| fail(&value)),
            Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
                    .map(|i| json!(i))
                    .ok_or_else(|| fail(&value))
            }
            Value::Bool(b) => Ok(json!(i64::from(*b))),
            other => Err(fail(other)),
        },
        DataType::Float => match &value {
            Value::Number(n) => n.as_f64().map(|f| json!(f)).ok_or_else(|| fail(&value)),
            Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(|f| json!(f))
                .ok_or_else(|| fail(&value)),
            other => Err(fail(other)),
        },
        DataType::Bool => match &value {
            Value::Bool(_) => Ok(value),
            Value::Number(n) => Ok(json!(n.as_f64().map_or(false, |f| f != 0.0))),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "" => Ok(Value::Null),
                "true" | "1" | "yes" | "y" => Ok(json!(true)),
                "false" | "0" | "no" | "n" => Ok(json!(false)),
                _ => Err(fail(&value)),
            },
            other => Err(fail(other)),
        },
    }
}

/// Text rendering used for fixed-width output.
pub(crate) fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate_chars(text: &str, length: usize) -> String {
    text.chars().take(length).collect()
}

pub(crate) fn fit_length(value: Value, length: usize, mode: OutputMode, padding: Padding) -> Value {
    match mode {
        OutputMode::Json => match value {
            Value::String(s) if s.chars().count() > length => Value::String(truncate_chars(&s, length)),
            other => other,
        },
        OutputMode::FixedWidth => {
            let padding = match padding {
                Padding::Auto if value.is_number() => Padding::Number,
                Padding::Auto => Padding::Word,
                explicit => explicit,
            };
            let text = truncate_chars(&to_text(&value), length);
            let width = text.chars().count();
            if width == length {
                return Value::String(text);
            }
            let fill = length - width;
            let padded = match padding {
                Padding::Number => match text.strip_prefix('-') {
                    Some(digits) => format!("-{}{digits}", "0".repeat(fill)),
                    None => format!("{}{text}", "0".repeat(fill)),
                },
                _ => format!("{text}{}", " ".repeat(fill)),
            };
            Value::String(padded)
        }
    }
}
