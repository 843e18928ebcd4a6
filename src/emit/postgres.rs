//! The PostgreSQL DDL emitter: a pure function from a [`SchemaDiff`] (or a
//! whole [`Schema`]) to an ordered `Vec<String>` of statements.
//!
//! Grounded on
//! `original_source/pkg/platforms/postgres_platform/postgre_sql_platform.go`.
//! The statement ordering is a hard contract — see spec §4.5.

use crate::diff::{SchemaDiff, TableDiff};
use crate::error::GormiteError;
use crate::schema::foreign_key::VALID_FK_ACTIONS;
use crate::schema::index::{Index, UniqueConstraint};
use crate::schema::{Column, ForeignKeyConstraint, Schema, Table};
use crate::types::postgres::ColumnMetadata;
use crate::types::{self, LogicalType};

/// Quotes an identifier only when it isn't already a safe lowercase
/// `[a-z_][a-z0-9_]*` token — a simplification of the source's
/// reserved-keyword lookup, sufficient without a full keyword table.
fn quote_ident(name: &str) -> String {
    let safe = name
        .chars()
        .next()
        .map(|c| c.is_ascii_lowercase() || c == '_')
        .unwrap_or(false)
        && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if safe {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

fn column_metadata(col: &Column) -> ColumnMetadata {
    ColumnMetadata {
        length: col.length,
        precision: col.precision,
        scale: col.scale,
        fixed: col.fixed,
        autoincrement: col.autoincrement,
        jsonb: col.is_jsonb(),
    }
}

/// String defaults are quoted (`'` doubled); numeric/boolean/time-sentinel
/// defaults are emitted verbatim.
fn render_default(default: &str) -> String {
    const SENTINELS: [&str; 3] = ["CURRENT_TIMESTAMP", "CURRENT_DATE", "CURRENT_TIME"];
    let upper = default.to_uppercase();
    if SENTINELS.contains(&upper.as_str()) {
        return default.to_string();
    }
    if default.parse::<f64>().is_ok() {
        return default.to_string();
    }
    if upper == "TRUE" || upper == "FALSE" {
        return upper;
    }
    format!("'{}'", default.replace('\'', "''"))
}

fn column_declaration(col: &Column) -> Result<String, GormiteError> {
    if let Some(raw) = &col.column_definition {
        return Ok(format!("{} {raw}", quote_ident(&col.name)));
    }
    let ty_sql = types::sql_declaration(col.ty, &column_metadata(col))?;
    let mut decl = format!("{} {ty_sql}", quote_ident(&col.name));
    if col.notnull {
        decl.push_str(" NOT NULL");
    }
    if let Some(default) = &col.default
        && !col.autoincrement
    {
        decl.push_str(" DEFAULT ");
        decl.push_str(&render_default(default));
    }
    Ok(decl)
}

fn index_columns_sql(index: &Index) -> String {
    let mut lengths = index.lengths.clone().unwrap_or_default().into_iter();
    index
        .column_names()
        .iter()
        .map(|c| {
            let length = lengths.next().flatten();
            match length {
                Some(n) => format!("{}({n})", quote_ident(c)),
                None => quote_ident(c),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn create_index_sql(table_name: &str, index: &Index) -> String {
    let unique = if index.is_unique && !index.is_primary { "UNIQUE " } else { "" };
    let where_clause = index
        .where_clause
        .as_ref()
        .map(|w| format!(" WHERE {w}"))
        .unwrap_or_default();
    format!(
        "CREATE {unique}INDEX {} ON {table_name} ({}){where_clause};",
        quote_ident(&index.name),
        index_columns_sql(index)
    )
}

fn drop_index_sql(table_name: &str, index: &Index) -> String {
    if index.is_primary {
        format!("ALTER TABLE {table_name} DROP CONSTRAINT {};", quote_ident(&format!("{table_name}_pkey")))
    } else {
        format!("DROP INDEX {};", quote_ident(&index.name))
    }
}

fn unique_constraint_sql(uc: &UniqueConstraint) -> String {
    let cols = uc
        .column_names()
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CONSTRAINT {} UNIQUE ({cols})", quote_ident(&uc.name))
}

fn validate_fk_action(action: &str) -> Result<(), GormiteError> {
    if VALID_FK_ACTIONS.contains(&action) {
        Ok(())
    } else {
        Err(GormiteError::InvalidMetadata(format!("unknown FK action `{action}`")))
    }
}

fn foreign_key_clause(fk: &ForeignKeyConstraint) -> Result<String, GormiteError> {
    let local = fk
        .local_column_names()
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let foreign = fk
        .foreign_column_names()
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let mut clause = format!(
        "FOREIGN KEY ({local}) REFERENCES {} ({foreign})",
        quote_ident(&fk.foreign_table)
    );
    if let Some(on_update) = &fk.on_update {
        validate_fk_action(on_update)?;
        clause.push_str(&format!(" ON UPDATE {on_update}"));
    }
    if let Some(on_delete) = &fk.on_delete {
        validate_fk_action(on_delete)?;
        clause.push_str(&format!(" ON DELETE {on_delete}"));
    }
    Ok(clause)
}

fn add_foreign_key_sql(table_name: &str, fk: &ForeignKeyConstraint) -> Result<String, GormiteError> {
    Ok(format!(
        "ALTER TABLE {table_name} ADD CONSTRAINT {} {};",
        quote_ident(&fk.name),
        foreign_key_clause(fk)?
    ))
}

fn drop_foreign_key_sql(table_name: &str, fk: &ForeignKeyConstraint) -> String {
    format!("ALTER TABLE {table_name} DROP CONSTRAINT {};", quote_ident(&fk.name))
}

/// `CREATE TABLE` without foreign keys — columns, primary key, indexes,
/// unique constraints. FKs are added afterward so cyclic references never
/// block table creation order.
fn create_table_sql(table: &Table) -> Result<Vec<String>, GormiteError> {
    if table.columns.is_empty() {
        return Err(GormiteError::InvalidMetadata(format!(
            "table `{}` has no columns",
            table.name
        )));
    }
    let table_name = quote_ident(&table.name);
    let mut parts = Vec::new();
    for col in table.columns.values() {
        parts.push(column_declaration(col)?);
    }
    if let Some(pk_name) = &table.primary_key_name
        && let Some(pk_index) = table.indexes.get(pk_name)
    {
        parts.push(format!("PRIMARY KEY ({})", index_columns_sql(pk_index)));
    }
    for uc in table.unique_constraints.values() {
        parts.push(unique_constraint_sql(uc));
    }

    let unlogged = if table.unlogged { "UNLOGGED " } else { "" };
    let mut statements = vec![format!(
        "CREATE {unlogged}TABLE {table_name} (\n    {}\n);",
        parts.join(",\n    ")
    )];

    for idx in table.indexes.values() {
        if table.primary_key_name.as_deref() == Some(&idx.normalized_name()) {
            continue;
        }
        statements.push(create_index_sql(&table_name, idx));
    }
    Ok(statements)
}

fn alter_table_diff_sql(diff: &TableDiff, table_name: &str) -> Result<Vec<String>, GormiteError> {
    let mut sql = Vec::new();

    // pre: drop modified/dropped FKs, drop modified/dropped indexes.
    for fk in &diff.modified_foreign_keys {
        sql.push(drop_foreign_key_sql(table_name, &fk.old));
    }
    for fk in &diff.dropped_foreign_keys {
        sql.push(drop_foreign_key_sql(table_name, fk));
    }
    for idx in &diff.modified_indexes {
        sql.push(drop_index_sql(table_name, &idx.old));
    }
    for idx in &diff.dropped_indexes {
        sql.push(drop_index_sql(table_name, idx));
    }

    // column adds/drops/alters.
    for col in &diff.added_columns {
        sql.push(format!(
            "ALTER TABLE {table_name} ADD {};",
            column_declaration(col)?
        ));
    }
    for col in &diff.dropped_columns {
        sql.push(format!("ALTER TABLE {table_name} DROP {};", quote_ident(&col.name)));
    }
    for cd in &diff.changed_columns {
        let old_name = quote_ident(&cd.old.name);
        let new_name = quote_ident(&cd.new.name);
        if cd.old.name != cd.new.name {
            sql.push(format!("ALTER TABLE {table_name} RENAME COLUMN {old_name} TO {new_name};"));
        }
        if cd.old.ty != cd.new.ty
            || cd.old.length != cd.new.length
            || cd.old.precision != cd.new.precision
            || cd.old.scale != cd.new.scale
            || cd.old.fixed != cd.new.fixed
        {
            let ty_sql = types::sql_declaration(cd.new.ty, &column_metadata(&cd.new))?;
            sql.push(format!("ALTER TABLE {table_name} ALTER {new_name} TYPE {ty_sql};"));
        }
        if cd.old.default != cd.new.default {
            match &cd.new.default {
                Some(default) => sql.push(format!(
                    "ALTER TABLE {table_name} ALTER {new_name} SET DEFAULT {};",
                    render_default(default)
                )),
                None => sql.push(format!("ALTER TABLE {table_name} ALTER {new_name} DROP DEFAULT;")),
            }
        }
        if cd.old.notnull != cd.new.notnull {
            if cd.new.notnull {
                sql.push(format!("ALTER TABLE {table_name} ALTER {new_name} SET NOT NULL;"));
            } else {
                sql.push(format!("ALTER TABLE {table_name} ALTER {new_name} DROP NOT NULL;"));
            }
        }
        if cd.old.autoincrement != cd.new.autoincrement {
            if cd.new.autoincrement {
                sql.push(format!(
                    "ALTER TABLE {table_name} ALTER {new_name} ADD GENERATED BY DEFAULT AS IDENTITY;"
                ));
            } else {
                sql.push(format!("ALTER TABLE {table_name} ALTER {new_name} DROP IDENTITY;"));
            }
        }
    }

    for col in diff
        .added_columns
        .iter()
        .chain(diff.changed_columns.iter().map(|cd| &cd.new))
    {
        if let Some(comment) = &col.comment {
            sql.push(format!(
                "COMMENT ON COLUMN {table_name}.{} IS '{}';",
                quote_ident(&col.name),
                comment.replace('\'', "''")
            ));
        }
    }

    // post: add added/modified FKs, create added/modified indexes, rename
    // renamed indexes.
    for idx in &diff.added_indexes {
        sql.push(create_index_sql(table_name, idx));
    }
    for idx in &diff.modified_indexes {
        sql.push(create_index_sql(table_name, &idx.new));
    }
    for renamed in &diff.renamed_indexes {
        sql.push(format!(
            "ALTER INDEX {} RENAME TO {};",
            quote_ident(&renamed.old_name),
            quote_ident(&renamed.new.name)
        ));
    }
    for fk in &diff.added_foreign_keys {
        sql.push(add_foreign_key_sql(table_name, fk)?);
    }
    for fk in &diff.modified_foreign_keys {
        sql.push(add_foreign_key_sql(table_name, &fk.new)?);
    }

    Ok(sql)
}

/// `ALTER SEQUENCE` only touches increment/cache — `initial_value`/`START
/// WITH` cannot be altered after creation, matching the source.
fn alter_sequence_sql(seq: &crate::schema::Sequence) -> String {
    let mut stmt = format!(
        "ALTER SEQUENCE {} INCREMENT BY {}",
        quote_ident(&seq.name),
        seq.allocation_size
    );
    if let Some(cache) = seq.cache {
        if cache > 1 {
            stmt.push_str(&format!(" CACHE {cache}"));
        }
    }
    stmt.push(';');
    stmt
}

/// Emits the ordered DDL sequence for a schema diff. See spec §4.5 for the
/// exact cross-table ordering contract.
pub fn emit_diff(diff: &SchemaDiff) -> Result<Vec<String>, GormiteError> {
    let mut sql = Vec::new();

    for s in &diff.created_schemas {
        sql.push(format!("CREATE SCHEMA {};", quote_ident(s)));
    }
    for seq in &diff.altered_sequences {
        sql.push(alter_sequence_sql(seq));
    }
    for seq in &diff.dropped_sequences {
        sql.push(format!("DROP SEQUENCE {} CASCADE;", quote_ident(&seq.name)));
    }
    for seq in &diff.created_sequences {
        sql.push(format!(
            "CREATE SEQUENCE {} START WITH {} INCREMENT BY {};",
            quote_ident(&seq.name),
            seq.initial_value,
            seq.allocation_size
        ));
    }

    for table in &diff.created_tables {
        sql.extend(create_table_sql(table)?);
    }
    for table in &diff.created_tables {
        let table_name = quote_ident(&table.name);
        for fk in table.foreign_keys.values() {
            sql.push(add_foreign_key_sql(&table_name, fk)?);
        }
    }
    for table in &diff.dropped_tables {
        let table_name = quote_ident(&table.name);
        for fk in table.foreign_keys.values() {
            sql.push(drop_foreign_key_sql(&table_name, fk));
        }
    }
    for table in &diff.dropped_tables {
        sql.push(format!("DROP TABLE {};", quote_ident(&table.name)));
    }
    for table_diff in &diff.altered_tables {
        let table_name = quote_ident(&table_diff.table_name);
        sql.extend(alter_table_diff_sql(table_diff, &table_name)?);
    }

    Ok(sql)
}

/// Emits `CREATE TABLE`/index/FK statements for an entire schema (used for
/// an initial migration against an empty database).
pub fn emit_schema(schema: &Schema) -> Result<Vec<String>, GormiteError> {
    let mut sql = Vec::new();
    for ns in schema.namespaces.iter().filter(|ns| *ns != &schema.default_namespace) {
        sql.push(format!("CREATE SCHEMA {};", quote_ident(ns)));
    }
    for seq in schema.sequences.values() {
        sql.push(format!(
            "CREATE SEQUENCE {} START WITH {} INCREMENT BY {};",
            quote_ident(&seq.name),
            seq.initial_value,
            seq.allocation_size
        ));
    }
    for table in schema.tables.values() {
        sql.extend(create_table_sql(table)?);
    }
    for table in schema.tables.values() {
        let table_name = quote_ident(&table.name);
        for fk in table.foreign_keys.values() {
            sql.push(add_foreign_key_sql(&table_name, fk)?);
        }
    }
    Ok(sql)
}
