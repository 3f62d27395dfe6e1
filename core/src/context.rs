//! Resolution context: the bag of records a mapping table reads from.
//!
//! Callers assemble a Context per transaction (loan, customer, application,
//! pre-computed aggregates) and hand it to the resolver. The resolver never
//! fetches anything on its own.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: Map<String, Value>,
    lists: HashMap<String, Vec<Context>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Add any serializable record (e.g. a row struct) under `name`.
    pub fn with_serialized<T: Serialize>(
        self,
        name: impl Into<String>,
        record: &T,
    ) -> Result<Self, serde_json::Error> {
        let value = serde_json::to_value(record)?;
        Ok(self.with(name, value))
    }

    /// Attach a list of child contexts consumed by a repeating table.
    pub fn with_list(mut self, name: impl Into<String>, items: Vec<Context>) -> Self {
        self.lists.insert(name.into(), items);
        self
    }

    /// A copy of this context with one extra entry. Used to build
    /// per-installment or per-address children that still see the parent.
    pub fn variant(&self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clone().with(name, value)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn list(&self, name: &str) -> Option<&[Context]> {
        self.lists.get(name).map(Vec::as_slice)
    }

    /// Walk `segments` through nested objects (by key) and arrays (by index).
    pub fn lookup<S: AsRef<str>>(&self, segments: &[S]) -> Option<&Value> {
        let (first, rest) = segments.split_first()?;
        let mut current = self.values.get(first.as_ref())?;
        for segment in rest {
            let segment = segment.as_ref();
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Build a context from a JSON document: every top-level entry becomes a
    /// context value, except `_lists`, which maps list names to arrays of
    /// objects. Each list item is a child context that sees its parent's
    /// values plus the item's own entries.
    pub fn from_json(document: &Value) -> Result<Self, String> {
        let Value::Object(map) = document else {
            return Err("context document must be a JSON object".into());
        };
        let mut ctx = Self::new();
        for (name, value) in map {
            if name != "_lists" {
                ctx.insert(name.clone(), value.clone());
            }
        }
        let Some(lists) = map.get("_lists") else {
            return Ok(ctx);
        };
        let Value::Object(lists) = lists else {
            return Err("'_lists' must be an object of arrays".into());
        };
        for (list_name, items) in lists {
            let Value::Array(items) = items else {
                return Err(format!("list '{list_name}' must be an array"));
            };
            let mut children = Vec::with_capacity(items.len());
            for item in items {
                let Value::Object(entries) = item else {
                    return Err(format!("items of list '{list_name}' must be objects"));
                };
                let mut child = ctx.clone();
                for (name, value) in entries {
                    child.insert(name.clone(), value.clone());
                }
                children.push(child);
            }
            ctx.lists.insert(list_name.clone(), children);
        }
        Ok(ctx)
    }

    /// Convenience for dotted lookups from transforms (`"payment.principal_amount"`).
    pub fn lookup_dotted(&self, path: &str) -> Option<&Value> {
        let segments: Vec<&str> = path.split('.').collect();
        self.lookup(&segments)
    }
}
