//! Column definitions.

use crate::types::LogicalType;
use indexmap::IndexMap;

/// A single table column.
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub ty: LogicalType,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub default: Option<String>,
    pub notnull: bool,
    pub unsigned: bool,
    pub fixed: bool,
    pub autoincrement: bool,
    pub comment: Option<String>,
    /// Raw DDL override; when set, the emitter uses this text verbatim
    /// instead of deriving a declaration from `ty`/`length`/etc.
    pub column_definition: Option<String>,
    /// Small string-keyed platform options, e.g. `"jsonb" -> "true"`,
    /// `"collation" -> "C"`.
    pub platform_options: IndexMap<String, String>,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: LogicalType) -> Self {
        Self {
            name: name.into(),
            ty,
            length: None,
            precision: None,
            scale: None,
            default: None,
            notnull: true,
            unsigned: false,
            fixed: false,
            autoincrement: false,
            comment: None,
            column_definition: None,
            platform_options: IndexMap::new(),
        }
    }

    pub fn normalized_name(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn is_jsonb(&self) -> bool {
        self.platform_options.get("jsonb").map(|v| v == "true").unwrap_or(false)
    }

    /// Equality used by the diff engine's `ColumnsEqual`: every field that
    /// participates in the emitted declaration, ignoring the name.
    pub fn equals_ignoring_name(&self, other: &Column) -> bool {
        self.ty == other.ty
            && self.length == other.length
            && self.precision == other.precision
            && self.scale == other.scale
            && self.default == other.default
            && self.notnull == other.notnull
            && self.unsigned == other.unsigned
            && self.fixed == other.fixed
            && self.autoincrement == other.autoincrement
            && self.comment == other.comment
            && self.column_definition == other.column_definition
            && self.platform_options == other.platform_options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_name() {
        let a = Column::new("a", LogicalType::Integer);
        let b = Column::new("b", LogicalType::Integer);
        assert!(a.equals_ignoring_name(&b));
    }

    #[test]
    fn equality_detects_type_change() {
        let a = Column::new("a", LogicalType::Integer);
        let b = Column::new("a", LogicalType::Bigint);
        assert!(!a.equals_ignoring_name(&b));
    }
}
