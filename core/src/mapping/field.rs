use super::{format, path::PathExpr};
use crate::{error::MappingError, transform::TransformId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[serde(alias = "string")]
    Str,
    #[serde(alias = "integer")]
    Int,
    Float,
    #[serde(alias = "boolean")]
    Bool,
}

impl DataType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Str   => "str",
            Self::Int   => "int",
            Self::Float => "float",
            Self::Bool  => "bool",
        }
    }
}

/// How a fixed-width field is filled up to its length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Padding {
    /// Numbers zero-pad, everything else space-pads.
    #[default]
    Auto,
    /// Right-pad with spaces.
    Word,
    /// Left-pad with zeros.
    Number,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldSource {
    /// Emitted verbatim (after coercion/formatting).
    Hardcode(Value),
    Path(PathExpr),
}

/// One output value: where it comes from and how it is shaped.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMapping {
    pub source: FieldSource,
    pub allow_null: bool,
    pub data_type: Option<DataType>,
    pub length: Option<usize>,
    pub output_format: Option<String>,
    pub transform: Option<TransformId>,
    pub padding: Padding,
}

impl FieldMapping {
    fn with_source(source: FieldSource) -> Self {
        Self {
            source,
            allow_null: true,
            data_type: None,
            length: None,
            output_format: None,
            transform: None,
            padding: Padding::Auto,
        }
    }

    pub fn hardcode(value: impl Into<Value>) -> Self {
        Self::with_source(FieldSource::Hardcode(value.into()))
    }

    /// Field read from the context; the expression is parsed here.
    pub fn path(expr: &str) -> Result<Self, MappingError> {
        Ok(Self::with_source(FieldSource::Path(PathExpr::parse(expr, expr)?)))
    }

    pub fn required(mut self) -> Self {
        self.allow_null = false;
        self
    }

    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    pub fn length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    pub fn output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = Some(format.into());
        self
    }

    pub fn transform(mut self, transform: TransformId) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    /// The label used in errors for where the value came from.
    pub fn source_label(&self) -> String {
        match &self.source {
            FieldSource::Hardcode(v) => format!("hardcode {v}"),
            FieldSource::Path(p) => p.as_str().to_string(),
        }
    }
}

/// Raw JSON form of a field descriptor, as written in mapping files.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct FieldDescriptor {
    source: Value,
    #[serde(default)]
    is_hardcode: bool,
    #[serde(default = "default_allow_null")]
    allow_null: bool,
    #[serde(default)]
    data_type: Option<DataType>,
    #[serde(default)]
    length: Option<usize>,
    #[serde(default)]
    output_format: Option<String>,
    #[serde(default)]
    function_post_mapping: Option<String>,
    #[serde(default)]
    is_padding_word: bool,
    #[serde(default)]
    is_padding_number: bool,
}

fn default_allow_null() -> bool {
    true
}

impl FieldDescriptor {
    /// Validate and compile; every check that can run without a context runs here.
    pub(super) fn compile(self, key_path: &str) -> Result<FieldMapping, MappingError> {
        let invalid = |reason: String| MappingError::InvalidDescriptor {
            key_path: key_path.to_string(),
            reason,
        };

        let source = if self.is_hardcode {
            if self.source.is_null() && !self.allow_null {
                return Err(invalid("hardcoded null on a field that does not allow null".into()));
            }
            FieldSource::Hardcode(self.source)
        } else {
            let Value::String(expr) = &self.source else {
                return Err(invalid(format!(
                    "source {} must be a path string unless is_hardcode is set",
                    self.source
                )));
            };
            FieldSource::Path(PathExpr::parse(expr, key_path)?)
        };

        let padding = match (self.is_padding_word, self.is_padding_number) {
            (true, true) => {
                return Err(invalid("is_padding_word and is_padding_number are exclusive".into()))
            }
            (true, false) => Padding::Word,
            (false, true) => Padding::Number,
            (false, false) => Padding::Auto,
        };

        if self.length == Some(0) {
            return Err(invalid("length must be positive".into()));
        }

        if let Some(fmt) = &self.output_format {
            if !format::is_valid_strftime(fmt) {
                return Err(invalid(format!("invalid output_format '{fmt}'")));
            }
        }

        let transform = match &self.function_post_mapping {
            None => None,
            Some(name) => Some(TransformId::from_name(name).ok_or_else(|| {
                MappingError::UnknownTransform {
                    key_path: key_path.to_string(),
                    name: name.clone(),
                }
            })?),
        };

        Ok(FieldMapping {
            source,
            allow_null: self.allow_null,
            data_type: self.data_type,
            length: self.length,
            output_format: self.output_format,
            transform,
            padding,
        })
    }
}
