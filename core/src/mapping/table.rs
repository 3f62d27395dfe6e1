use super::field::{FieldDescriptor, FieldMapping};
use crate::error::MappingError;
use indexmap::IndexMap;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum MappingNode {
    Field(FieldMapping),
    /// Key the partner requires present but which this system never fills.
    Null,
    Table(MappingTable),
    /// `table` resolved once per child context in the named context list.
    Repeat { list: String, table: MappingTable },
}

/// Ordered output-key → node mapping describing one partner payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingTable {
    entries: IndexMap<String, MappingNode>,
}

pub(super) fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, node: MappingNode) -> Self {
        self.entries.insert(key.into(), node);
        self
    }

    pub fn field(self, key: impl Into<String>, field: FieldMapping) -> Self {
        self.with(key, MappingNode::Field(field))
    }

    pub fn null(self, key: impl Into<String>) -> Self {
        self.with(key, MappingNode::Null)
    }

    pub fn table(self, key: impl Into<String>, table: MappingTable) -> Self {
        self.with(key, MappingNode::Table(table))
    }

    pub fn repeat(self, key: impl Into<String>, list: impl Into<String>, table: MappingTable) -> Self {
        self.with(
            key,
            MappingNode::Repeat {
                list: list.into(),
                table,
            },
        )
    }

    pub fn get(&self, key: &str) -> Option<&MappingNode> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MappingNode)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compile a table from its JSON definition.
    ///
    /// Object values containing `source` are field descriptors; objects with
    /// `repeat` + `table` are repeats; `null` is an explicit null; any other
    /// object is a nested table. Fails on the first invalid entry.
    pub fn from_json(value: &Value) -> Result<Self, MappingError> {
        Self::compile(value, "")
    }

    fn compile(value: &Value, key_path: &str) -> Result<Self, MappingError> {
        let Value::Object(map) = value else {
            return Err(MappingError::InvalidDescriptor {
                key_path: key_path.to_string(),
                reason: format!("expected a table object, found {value}"),
            });
        };
        let mut table = Self::new();
        for (key, entry) in map {
            let path = child_path(key_path, key);
            let node = compile_node(entry, &path)?;
            table.entries.insert(key.clone(), node);
        }
        Ok(table)
    }
}

fn compile_node(entry: &Value, key_path: &str) -> Result<MappingNode, MappingError> {
    match entry {
        Value::Null => Ok(MappingNode::Null),
        Value::Object(obj) if obj.contains_key("source") => {
            let descriptor: FieldDescriptor = serde_json::from_value(entry.clone()).map_err(|e| {
                MappingError::InvalidDescriptor {
                    key_path: key_path.to_string(),
                    reason: e.to_string(),
                }
            })?;
            Ok(MappingNode::Field(descriptor.compile(key_path)?))
        }
        Value::Object(obj) if obj.contains_key("repeat") => compile_repeat(obj, key_path),
        Value::Object(_) => Ok(MappingNode::Table(MappingTable::compile(entry, key_path)?)),
        other => Err(MappingError::InvalidDescriptor {
            key_path: key_path.to_string(),
            reason: format!("unexpected literal {other}; wrap literals in a hardcoded field"),
        }),
    }
}

fn compile_repeat(obj: &Map<String, Value>, key_path: &str) -> Result<MappingNode, MappingError> {
    let invalid = |reason: &str| MappingError::InvalidDescriptor {
        key_path: key_path.to_string(),
        reason: reason.to_string(),
    };
    if obj.len() != 2 {
        return Err(invalid("a repeat takes exactly 'repeat' and 'table'"));
    }
    let list = obj
        .get("repeat")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid("'repeat' must name a context list"))?;
    let table_def = obj
        .get("table")
        .ok_or_else(|| invalid("a repeat needs a 'table'"))?;
    let table = MappingTable::compile(table_def, &format!("{key_path}[]"))?;
    Ok(MappingNode::Repeat {
        list: list.to_string(),
        table,
    })
}
