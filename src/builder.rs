//! Target-schema builder (Component D): consumes plain record/field
//! definitions — the in-scope substitute for the out-of-scope source-file
//! parser — and produces a [`Schema`].
//!
//! Grounded on `pg_migration_lint::catalog::builder`'s fluent
//! construction-API shape, repurposed as the crate's primary
//! target-schema construction path rather than test-only scaffolding.

use crate::asset::generate_identifier_name;
use crate::error::GormiteError;
use crate::schema::{Column, ForeignKeyConstraint, Index, Schema, Table};
use crate::types::LogicalType;
use std::collections::HashMap;

const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Recognized tags on a target field, per spec §6's tag table.
#[derive(Debug, Clone, Default)]
pub struct FieldTags {
    pub db: String,
    pub pk: bool,
    pub nullable: bool,
    pub length: Option<u32>,
    pub default: Option<String>,
    pub type_override: Option<String>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub uniq_groups: Vec<String>,
    pub uniq_conditions: HashMap<String, String>,
    pub index_groups: Vec<String>,
    pub index_conditions: HashMap<String, String>,
    pub on_update: Option<String>,
    pub on_delete: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub primitive_type: String,
    /// Set when this field references another record by name (becomes a FK).
    pub references: Option<String>,
    pub tags: FieldTags,
}

#[derive(Debug, Clone)]
pub struct RecordDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::new();
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn primitive_to_logical(primitive: &str) -> Result<LogicalType, GormiteError> {
    match primitive {
        "int" => Ok(LogicalType::Integer),
        "string" => Ok(LogicalType::String),
        "bool" => Ok(LogicalType::Boolean),
        "float32" => Ok(LogicalType::SmallFloat),
        "float64" => Ok(LogicalType::Float),
        other => Err(GormiteError::UnsupportedFeature(format!(
            "unmapped primitive type `{other}`"
        ))),
    }
}

fn type_override_to_logical(name: &str) -> Result<LogicalType, GormiteError> {
    match name {
        "text" => Ok(LogicalType::Text),
        "varchar" => Ok(LogicalType::String),
        "json" | "jsonb" => Ok(LogicalType::Json),
        "integer" => Ok(LogicalType::Integer),
        "bigint" => Ok(LogicalType::Bigint),
        "decimal" => Ok(LogicalType::Decimal),
        "float" => Ok(LogicalType::Float),
        "smallfloat" => Ok(LogicalType::SmallFloat),
        other => Err(GormiteError::UnsupportedFeature(format!(
            "unknown type override `{other}`"
        ))),
    }
}

/// Builds a [`Schema`] from a set of record definitions.
pub fn build_schema(records: &[RecordDef], default_namespace: &str) -> Result<Schema, GormiteError> {
    let mut schema = Schema::new(default_namespace);

    for record in records {
        let table_name = to_snake_case(&record.name);
        if schema.get_table(&table_name).is_some() {
            continue;
        }
        schema.add_table(Table::new(&table_name))?;
    }

    for record in records {
        let table_name = to_snake_case(&record.name);
        let mut pk_columns: Vec<String> = Vec::new();
        let mut index_groups: HashMap<String, (Vec<String>, Option<String>)> = HashMap::new();
        let mut uniq_groups: HashMap<String, (Vec<String>, Option<String>)> = HashMap::new();

        for field in &record.fields {
            if field.tags.db.is_empty() {
                return Err(GormiteError::InvalidMetadata(format!(
                    "field on record `{}` is missing a `db:` tag",
                    record.name
                )));
            }

            let (ty, is_fk_column) = if let Some(referenced) = &field.references {
                let _ = referenced;
                (LogicalType::Integer, true)
            } else if let Some(override_name) = &field.tags.type_override {
                (type_override_to_logical(override_name)?, false)
            } else {
                (primitive_to_logical(&field.primitive_type)?, false)
            };

            let mut column = Column::new(&field.tags.db, ty);
            column.notnull = !field.tags.nullable;
            column.length = field.tags.length.or(if ty == LogicalType::String && !is_fk_column {
                Some(255)
            } else {
                None
            });
            column.precision = field.tags.precision;
            column.scale = field.tags.scale;
            column.default = field.tags.default.clone();
            if field.tags.type_override.as_deref() == Some("jsonb") {
                column.platform_options.insert("jsonb".to_string(), "true".to_string());
            }

            {
                let table = schema.get_table_mut(&table_name).unwrap();
                table.add_column(column)?;
            }

            if field.tags.pk {
                pk_columns.push(field.tags.db.clone());
            }
            for group in &field.tags.uniq_groups {
                let entry = uniq_groups.entry(group.clone()).or_default();
                entry.0.push(field.tags.db.clone());
                if let Some(predicate) = field.tags.uniq_conditions.get(group) {
                    entry.1 = Some(predicate.clone());
                }
            }
            for group in &field.tags.index_groups {
                let entry = index_groups.entry(group.clone()).or_default();
                entry.0.push(field.tags.db.clone());
                if let Some(predicate) = field.tags.index_conditions.get(group) {
                    entry.1 = Some(predicate.clone());
                }
            }

            if is_fk_column {
                let referenced = field.references.as_ref().unwrap();
                let foreign_table = to_snake_case(referenced);
                let fk_name = generate_identifier_name(
                    &[&field.tags.db],
                    &format!("fk_{table_name}"),
                    schema.config.max_identifier_length,
                );
                let mut fk = ForeignKeyConstraint::new(&fk_name, &[&field.tags.db], &foreign_table, &["id"]);
                fk.on_update = field.tags.on_update.clone();
                fk.on_delete = field.tags.on_delete.clone();
                let table = schema.get_table_mut(&table_name).unwrap();
                table.add_foreign_key_constraint(fk)?;
            }
        }

        let table = schema.get_table_mut(&table_name).unwrap();

        for (group, (columns, predicate)) in &index_groups {
            let name = generate_identifier_name(
                &columns.iter().map(String::as_str).collect::<Vec<_>>(),
                &format!("idx_{table_name}_{group}"),
                MAX_IDENTIFIER_LENGTH,
            );
            let cols: Vec<&str> = columns.iter().map(String::as_str).collect();
            let mut idx = Index::new(&name, &cols, false, false);
            idx.where_clause = predicate.clone();
            table.add_index(idx)?;
        }

        for (_, (columns, predicate)) in &uniq_groups {
            let cols_joined = columns.join("_");
            let name = format!("idx__{table_name}__{cols_joined}__uniq");
            let cols: Vec<&str> = columns.iter().map(String::as_str).collect();
            let mut idx = Index::new(&name, &cols, true, false);
            idx.where_clause = predicate.clone();
            table.add_index(idx)?;
        }

        if !pk_columns.is_empty() {
            let cols: Vec<&str> = pk_columns.iter().map(String::as_str).collect();
            let pk_name = format!("{table_name}_pkey");
            table.add_index(Index::new(&pk_name, &cols, true, true))?;
        }
    }

    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(db: &str, primitive: &str) -> FieldDef {
        FieldDef {
            primitive_type: primitive.to_string(),
            references: None,
            tags: FieldTags {
                db: db.to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn builds_table_with_primary_key() {
        let mut id = field("id", "int");
        id.tags.pk = true;
        let record = RecordDef {
            name: "AppUser".to_string(),
            fields: vec![id],
        };
        let schema = build_schema(&[record], "public").unwrap();
        let table = schema.get_table("app_user").unwrap();
        assert!(table.primary_key_name.is_some());
    }

    #[test]
    fn reference_field_becomes_foreign_key() {
        let mut owner = field("owner_id", "int");
        owner.references = Some("AppUser".to_string());
        let record = RecordDef {
            name: "Order".to_string(),
            fields: vec![field("id", "int"), owner],
        };
        let schema = build_schema(&[RecordDef { name: "AppUser".into(), fields: vec![field("id", "int")] }, record], "public")
            .unwrap();
        let table = schema.get_table("order").unwrap();
        assert_eq!(table.foreign_keys.len(), 1);
    }

    #[test]
    fn uniq_tag_creates_unique_index() {
        let mut email = field("email", "string");
        email.tags.uniq_groups = vec!["email".to_string()];
        let record = RecordDef {
            name: "AppUser".to_string(),
            fields: vec![field("id", "int"), email],
        };
        let schema = build_schema(&[record], "public").unwrap();
        let table = schema.get_table("app_user").unwrap();
        assert!(table.indexes.contains_key("idx__app_user__email__uniq"));
    }

    #[test]
    fn missing_db_tag_is_an_error() {
        let mut f = field("", "int");
        f.tags.db = String::new();
        let record = RecordDef {
            name: "Broken".to_string(),
            fields: vec![f],
        };
        assert!(build_schema(&[record], "public").is_err());
    }
}
