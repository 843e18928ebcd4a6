//! PostgreSQL realization of the type system: SQL declarations and the
//! DB-name ↔ logical-type mapping.
//!
//! Grounded on `postgre_sql_platform.go`'s `Get*TypeDeclarationSQL` family
//! and `InitializeDoctrineTypeMappings`.

use super::LogicalType;
use crate::error::GormiteError;

/// The subset of `Column` fields a type declaration needs to render itself.
#[derive(Debug, Clone, Default)]
pub struct ColumnMetadata {
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub fixed: bool,
    pub autoincrement: bool,
    pub jsonb: bool,
}

/// Renders the platform-specific type fragment of a column declaration,
/// e.g. `VARCHAR(180)`, `NUMERIC(10,2)`, `INT GENERATED BY DEFAULT AS IDENTITY`.
pub fn sql_declaration(ty: LogicalType, meta: &ColumnMetadata) -> Result<String, GormiteError> {
    use LogicalType::*;
    let declared = match ty {
        Integer => {
            if meta.autoincrement {
                "INT GENERATED BY DEFAULT AS IDENTITY".to_string()
            } else {
                "INT".to_string()
            }
        }
        SmallInt => {
            if meta.autoincrement {
                "SMALLINT GENERATED BY DEFAULT AS IDENTITY".to_string()
            } else {
                "SMALLINT".to_string()
            }
        }
        Bigint => {
            if meta.autoincrement {
                "BIGINT GENERATED BY DEFAULT AS IDENTITY".to_string()
            } else {
                "BIGINT".to_string()
            }
        }
        Boolean => "BOOLEAN".to_string(),
        Guid => "UUID".to_string(),
        Date | DateImmutable => "DATE".to_string(),
        DateTime | DateTimeImmutable => "TIMESTAMP(0) WITHOUT TIME ZONE".to_string(),
        DateTimeTz | DateTimeTzImmutable => "TIMESTAMP(0) WITH TIME ZONE".to_string(),
        Time | TimeImmutable => "TIME(0) WITHOUT TIME ZONE".to_string(),
        DateInterval => "VARCHAR(255)".to_string(),
        Decimal => {
            let precision = meta
                .precision
                .ok_or_else(|| GormiteError::InvalidMetadata("DECIMAL column requires precision".into()))?;
            let scale = meta
                .scale
                .ok_or_else(|| GormiteError::InvalidMetadata("DECIMAL column requires scale".into()))?;
            format!("NUMERIC({precision}, {scale})")
        }
        Float | SmallFloat => "DOUBLE PRECISION".to_string(),
        String | AsciiString => {
            if meta.fixed {
                let length = meta.length.unwrap_or(255);
                format!("CHAR({length})")
            } else {
                let length = meta
                    .length
                    .ok_or_else(|| GormiteError::InvalidMetadata("VARCHAR column requires length".into()))?;
                format!("VARCHAR({length})")
            }
        }
        Text | SimpleArray => "TEXT".to_string(),
        Binary => {
            let length = meta.length.unwrap_or(255);
            if meta.fixed {
                format!("BYTEA /* fixed({length}) */")
            } else {
                "BYTEA".to_string()
            }
        }
        Blob => "BYTEA".to_string(),
        Json => {
            if meta.jsonb {
                "JSONB".to_string()
            } else {
                "JSON".to_string()
            }
        }
    };
    Ok(declared)
}

/// PostgreSQL type names that map onto `ty`, used for equality checks in
/// the diff engine and for the introspector's reverse lookup.
pub fn mapped_db_type_names(ty: LogicalType) -> &'static [&'static str] {
    use LogicalType::*;
    match ty {
        Bigint => &["bigint", "bigserial", "int8", "serial8"],
        Boolean => &["bool", "boolean"],
        String | AsciiString => &["bpchar", "char", "inet", "interval", "varchar", "_varchar"],
        Blob | Binary => &["bytea"],
        Date | DateImmutable => &["date", "year"],
        DateTime | DateTimeImmutable => &["datetime", "timestamp"],
        Decimal => &["decimal", "numeric", "money"],
        Float => &["double", "double precision", "float", "float8"],
        SmallFloat => &["float4", "real"],
        Integer => &["int", "int4", "integer", "serial", "serial4"],
        SmallInt => &["int2", "smallint"],
        Json => &["json", "jsonb"],
        Text | SimpleArray => &["text", "tsvector"],
        Time | TimeImmutable => &["time", "timetz"],
        DateTimeTz | DateTimeTzImmutable => &["timestamptz"],
        Guid => &["uuid"],
        DateInterval => &[],
    }
}

/// Resolves a PostgreSQL DB type name (as reported by introspection) to a
/// logical type. Fails with `IntrospectionParseError` for unknown names,
/// per spec §4.2/§7.
pub fn from_db_type_name(name: &str) -> Result<LogicalType, GormiteError> {
    use LogicalType::*;
    let lowered = name.to_lowercase();
    let ty = match lowered.as_str() {
        "bigint" | "bigserial" | "int8" | "serial8" => Bigint,
        "bool" | "boolean" => Boolean,
        "bpchar" | "char" | "inet" | "interval" | "varchar" | "_varchar" => String,
        "bytea" => Blob,
        "date" | "year" => Date,
        "datetime" | "timestamp" => DateTime,
        "decimal" | "numeric" | "money" => Decimal,
        "double" | "double precision" | "float" | "float8" => Float,
        "float4" | "real" => SmallFloat,
        "int" | "int4" | "integer" | "serial" | "serial4" => Integer,
        "int2" | "smallint" => SmallInt,
        "json" | "jsonb" => Json,
        "text" | "tsvector" => Text,
        "time" | "timetz" => Time,
        "timestamptz" => DateTimeTz,
        "uuid" => Guid,
        other => {
            return Err(GormiteError::IntrospectionParseError(format!(
                "unknown PostgreSQL type `{other}`"
            )));
        }
    };
    Ok(ty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varchar_requires_length() {
        let meta = ColumnMetadata::default();
        assert!(sql_declaration(LogicalType::String, &meta).is_err());
    }

    #[test]
    fn varchar_with_length_renders() {
        let meta = ColumnMetadata {
            length: Some(180),
            ..Default::default()
        };
        assert_eq!(sql_declaration(LogicalType::String, &meta).unwrap(), "VARCHAR(180)");
    }

    #[test]
    fn decimal_requires_precision_and_scale() {
        let meta = ColumnMetadata::default();
        assert!(sql_declaration(LogicalType::Decimal, &meta).is_err());
    }

    #[test]
    fn jsonb_flag_selects_jsonb() {
        let meta = ColumnMetadata {
            jsonb: true,
            ..Default::default()
        };
        assert_eq!(sql_declaration(LogicalType::Json, &meta).unwrap(), "JSONB");
    }

    #[test]
    fn integer_autoincrement_uses_identity_clause() {
        let meta = ColumnMetadata {
            autoincrement: true,
            ..Default::default()
        };
        assert_eq!(
            sql_declaration(LogicalType::Integer, &meta).unwrap(),
            "INT GENERATED BY DEFAULT AS IDENTITY"
        );
    }

    #[test]
    fn from_db_type_name_maps_timestamptz() {
        assert_eq!(from_db_type_name("timestamptz").unwrap(), LogicalType::DateTimeTz);
    }

    #[test]
    fn from_db_type_name_rejects_unknown() {
        assert!(from_db_type_name("hstore").is_err());
    }
}
