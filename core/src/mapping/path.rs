//! Dotted path expressions with an optional `* constant` multiplier.

use crate::{context::Context, error::MappingError};
use serde_json::{json, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Multiplier {
    Int(i64),
    Float(f64),
}

/// `customer.monthly_income*12`, parsed once when the table is compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct PathExpr {
    raw: String,
    segments: Vec<String>,
    multiplier: Option<Multiplier>,
}

impl PathExpr {
    /// Parse `expr`; `key_path` only labels the error.
    pub fn parse(expr: &str, key_path: &str) -> Result<Self, MappingError> {
        let invalid = |reason: &str| MappingError::InvalidPath {
            key_path: key_path.to_string(),
            expr: expr.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = expr.split('*');
        let path_part = parts.next().unwrap_or_default().trim();
        let multiplier = match parts.next() {
            None => None,
            Some(factor) => {
                let factor = factor.trim();
                if let Ok(i) = factor.parse::<i64>() {
                    Some(Multiplier::Int(i))
                } else {
                    match factor.parse::<f64>() {
                        Ok(f) if f.is_finite() => Some(Multiplier::Float(f)),
                        _ => return Err(invalid("multiplier is not a number")),
                    }
                }
            }
        };
        if parts.next().is_some() {
            return Err(invalid("only one '*' multiplier is allowed"));
        }

        if path_part.is_empty() {
            return Err(invalid("empty path"));
        }
        let segments: Vec<String> = path_part.split('.').map(str::to_string).collect();
        if segments
            .iter()
            .any(|s| s.is_empty() || s.chars().any(char::is_whitespace))
        {
            return Err(invalid("empty or malformed path segment"));
        }

        Ok(Self {
            raw: expr.to_string(),
            segments,
            multiplier,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn multiplier(&self) -> Option<Multiplier> {
        self.multiplier
    }

    /// The dotted path without the multiplier suffix.
    pub fn dotted(&self) -> String {
        self.segments.join(".")
    }

    /// Look the path up and apply the multiplier. Missing paths are null.
    pub fn evaluate(&self, ctx: &Context, key_path: &str) -> Result<Value, MappingError> {
        let value = ctx.lookup(self.segments.as_slice()).cloned().unwrap_or(Value::Null);
        match self.multiplier {
            None => Ok(value),
            Some(m) => self.multiply(value, m, key_path),
        }
    }

    fn multiply(&self, value: Value, m: Multiplier, key_path: &str) -> Result<Value, MappingError> {
        let not_numeric = |v: &Value| MappingError::NotNumeric {
            key_path: key_path.to_string(),
            source_path: self.raw.clone(),
            value: v.to_string(),
        };

        let (int, float) = match &value {
            Value::Null => return Ok(Value::Null),
            Value::Number(n) => (n.as_i64(), n.as_f64()),
            Value::String(s) if s.trim().is_empty() => return Ok(Value::Null),
            Value::String(s) => {
                let s = s.trim();
                (s.parse::<i64>().ok(), s.parse::<f64>().ok())
            }
            other => return Err(not_numeric(other)),
        };

        match (int, m) {
            (Some(i), Multiplier::Int(k)) => match i.checked_mul(k) {
                Some(product) => Ok(json!(product)),
                None => Ok(json!(i as f64 * k as f64)),
            },
            _ => {
                let base = float.ok_or_else(|| not_numeric(&value))?;
                let factor = match m {
                    Multiplier::Int(k) => k as f64,
                    Multiplier::Float(f) => f,
                };
                Ok(json!(base * factor))
            }
        }
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
