//! Walks a mapping table against a context and builds the output document.
//!
//! Resolution is a pure projection: each field reads only the context, never
//! another field's output, so the order entries are declared in only affects
//! the order of keys in the document.

use super::{
    field::{FieldMapping, FieldSource},
    format,
    table::{child_path, MappingNode, MappingTable},
    OutputMode,
};
use crate::{context::Context, error::MappingError};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Default)]
pub struct Resolver {
    mode: OutputMode,
}

impl Resolver {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }

    pub fn json() -> Self {
        Self::new(OutputMode::Json)
    }

    pub fn fixed_width() -> Self {
        Self::new(OutputMode::FixedWidth)
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Resolve a whole table. Any failing entry aborts the document.
    pub fn resolve_table(&self, table: &MappingTable, ctx: &Context) -> Result<Map<String, Value>, MappingError> {
        self.table_at(table, ctx, "")
    }

    /// One document per context, in input order.
    pub fn resolve_many(
        &self,
        table: &MappingTable,
        contexts: &[Context],
    ) -> Result<Vec<Map<String, Value>>, MappingError> {
        contexts.iter().map(|ctx| self.resolve_table(table, ctx)).collect()
    }

    /// Resolve a single node; `key` labels errors.
    pub fn resolve_node(&self, key: &str, node: &MappingNode, ctx: &Context) -> Result<Value, MappingError> {
        match node {
            MappingNode::Null => Ok(Value::Null),
            MappingNode::Field(field) => self.resolve_field(field, ctx, key),
            MappingNode::Table(table) => self.table_at(table, ctx, key).map(Value::Object),
            MappingNode::Repeat { list, table } => {
                let children = ctx.list(list).ok_or_else(|| MappingError::MissingList {
                    key_path: key.to_string(),
                    list: list.clone(),
                })?;
                let mut items = Vec::with_capacity(children.len());
                for (index, child) in children.iter().enumerate() {
                    let item_path = format!("{key}[{index}]");
                    items.push(Value::Object(self.table_at(table, child, &item_path)?));
                }
                Ok(Value::Array(items))
            }
        }
    }

    pub fn resolve_field(&self, field: &FieldMapping, ctx: &Context, key_path: &str) -> Result<Value, MappingError> {
        let mut value = match &field.source {
            FieldSource::Hardcode(literal) => literal.clone(),
            FieldSource::Path(expr) => expr.evaluate(ctx, key_path)?,
        };

        if let Some(transform) = field.transform {
            value = transform
                .apply(&value, ctx)
                .map_err(|error| MappingError::Transform {
                    key_path: key_path.to_string(),
                    transform: transform.name().to_string(),
                    error,
                })?;
        }

        if let Some(fmt) = &field.output_format {
            value = format::apply_output_format(value, fmt);
        }

        if let Some(data_type) = field.data_type {
            value = format::coerce(value, data_type, key_path)?;
        }

        if !field.allow_null && format::is_empty(&value) {
            return Err(MappingError::NullValue {
                key_path: key_path.to_string(),
                source_path: field.source_label(),
            });
        }

        if let Some(length) = field.length {
            value = format::fit_length(value, length, self.mode, field.padding);
        }

        Ok(value)
    }

    fn table_at(&self, table: &MappingTable, ctx: &Context, key_path: &str) -> Result<Map<String, Value>, MappingError> {
        let mut out = Map::new();
        for (key, node) in table.iter() {
            let path = child_path(key_path, key);
            let value = self.resolve_node(&path, node, ctx)?;
            out.insert(key.clone(), value);
        }
        Ok(out)
    }
}
