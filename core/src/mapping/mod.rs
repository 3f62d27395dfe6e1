//! Declarative field mapping.
//!
//! A `MappingTable` describes one partner payload shape: for every output key
//! it holds a field descriptor, an explicit null, a nested table, or a table
//! repeated once per child context. Tables are compiled once (paths parsed,
//! transform names checked) and are read-only afterwards, so one table can be
//! shared by any number of concurrent submissions.

mod field;
mod format;
mod path;
mod resolver;
mod table;

pub use field::{DataType, FieldMapping, FieldSource, Padding};
pub use path::{Multiplier, PathExpr};
pub use resolver::Resolver;
pub use table::{MappingNode, MappingTable};

/// Wire shape the resolver is producing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// JSON/form payloads: `length` only truncates over-long strings.
    #[default]
    Json,
    /// Legacy fixed-width records: every length-constrained field is
    /// rendered as text of exactly `length` characters.
    FixedWidth,
}
