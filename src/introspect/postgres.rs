//! PostgreSQL live-schema introspector (Component E): queries system
//! catalogs to materialize a [`Schema`] identical in shape to the
//! target-schema builder's output.
//!
//! Grounded on
//! `original_source/pkg/schema_managers/postgres_schema_manager/postgre_sql_schema_manager.go`.
//! A handful of query fragments the original composed from injected
//! platform snippets (the default-value subquery, `indkey`/`indrelid` as
//! `oid`/`int2vector`) are made explicit here as plain casts/subqueries —
//! see DESIGN.md.

use crate::error::GormiteError;
use crate::schema::{Column, ForeignKeyConstraint, Index, Schema, Sequence, Table};
use crate::types::LogicalType;
use regex::Regex;
use std::sync::OnceLock;
use tokio_postgres::Client;

/// Bookkeeping tables belonging to other migration tools, elided from the
/// introspected schema the way the source's caller post-processes them.
const BOOKKEEPING_TABLES: [&str; 2] = ["schema_migrations", "goose_db_version"];

fn varchar_length_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\((\d*)\)").unwrap())
}

fn numeric_precision_scale_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z]+\(([0-9]+),([0-9]+)\)").unwrap())
}

fn default_cast_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^['(](.*)[')]::").unwrap())
}

fn default_null_cast_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^NULL::").unwrap())
}

fn default_quoted_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"'([^']+)'::").unwrap())
}

fn on_update_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"ON UPDATE ([a-zA-Z0-9]+( (NULL|ACTION|DEFAULT))?)").unwrap())
}

fn on_delete_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"ON DELETE ([a-zA-Z0-9]+( (NULL|ACTION|DEFAULT))?)").unwrap())
}

fn foreign_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"FOREIGN KEY \((.+)\) REFERENCES (.+)\((.+)\)").unwrap())
}

/// Introspects the live database reachable through `client`, scoped to the
/// schemas on `current_schemas(false)`, and returns a [`Schema`] in the
/// same shape the target-schema builder produces.
pub async fn introspect_schema(client: &Client, default_namespace: &str) -> Result<Schema, GormiteError> {
    let mut schema = Schema::new(default_namespace);

    for name in list_schema_names(client).await? {
        schema.namespaces.insert(name);
    }

    for sequence in list_sequences(client).await? {
        schema.add_sequence(sequence)?;
    }

    let database_name = current_database(client).await?;

    for (schema_name, table_name) in list_table_names(client, &database_name).await? {
        if BOOKKEEPING_TABLES.contains(&table_name.as_str()) {
            continue;
        }
        let qualified = if schema_name == default_namespace {
            table_name.clone()
        } else {
            format!("{schema_name}.{table_name}")
        };

        let mut table = Table::new(&qualified);

        for column in select_table_columns(client, &table_name).await? {
            table.add_column(column)?;
        }

        let (unlogged, comment) = fetch_table_options(client, &table_name).await?;
        table.unlogged = unlogged;
        table.comment = comment;

        for index in select_index_columns(client, &table_name).await? {
            table.add_index(index)?;
        }

        for fk in select_foreign_keys(client, &table_name).await? {
            table.add_foreign_key_constraint(fk)?;
        }

        schema.add_table(table)?;
    }

    Ok(schema)
}

async fn current_database(client: &Client) -> Result<String, GormiteError> {
    let row = client.query_one("SELECT current_database() AS name", &[]).await?;
    Ok(row.get::<_, String>("name"))
}

async fn list_schema_names(client: &Client) -> Result<Vec<String>, GormiteError> {
    let rows = client
        .query(
            "SELECT schema_name FROM information_schema.schemata \
             WHERE schema_name NOT LIKE 'pg\\_%' AND schema_name != 'information_schema'",
            &[],
        )
        .await?;
    Ok(rows.iter().map(|r| r.get("schema_name")).collect())
}

async fn list_sequences(client: &Client) -> Result<Vec<Sequence>, GormiteError> {
    let rows = client
        .query(
            "SELECT sequence_name, sequence_schema, minimum_value, increment \
             FROM information_schema.sequences \
             WHERE sequence_schema NOT LIKE 'pg\\_%' AND sequence_schema != 'information_schema'",
            &[],
        )
        .await?;

    let mut sequences = Vec::with_capacity(rows.len());
    for row in rows {
        let relname: String = row.get("sequence_name");
        let schemaname: String = row.get("sequence_schema");
        let minimum_value: String = row.get("minimum_value");
        let increment: String = row.get("increment");

        let name = if schemaname == "public" {
            relname
        } else {
            format!("{schemaname}.{relname}")
        };

        let mut sequence = Sequence::new(name);
        sequence.initial_value = minimum_value.parse().map_err(|_| {
            GormiteError::IntrospectionParseError(format!("non-numeric sequence minimum_value `{minimum_value}`"))
        })?;
        sequence.allocation_size = increment.parse().map_err(|_| {
            GormiteError::IntrospectionParseError(format!("non-numeric sequence increment `{increment}`"))
        })?;
        sequences.push(sequence);
    }
    Ok(sequences)
}

async fn list_table_names(client: &Client, database_name: &str) -> Result<Vec<(String, String)>, GormiteError> {
    let rows = client
        .query(
            "SELECT table_schema, table_name FROM information_schema.tables \
             WHERE table_catalog = $1 \
               AND table_schema NOT LIKE 'pg\\_%' \
               AND table_schema != 'information_schema' \
               AND table_name != 'geometry_columns' \
               AND table_name != 'spatial_ref_sys' \
               AND table_type = 'BASE TABLE'",
            &[&database_name],
        )
        .await?;
    Ok(rows
        .iter()
        .map(|r| (r.get("table_schema"), r.get("table_name")))
        .collect())
}

async fn select_table_columns(client: &Client, table_name: &str) -> Result<Vec<Column>, GormiteError> {
    let rows = client
        .query(
            "SELECT
                a.attnum,
                quote_ident(a.attname) AS field,
                t.typname AS type,
                format_type(a.atttypid, a.atttypmod) AS complete_type,
                (SELECT t1.typname FROM pg_catalog.pg_type t1 WHERE t1.oid = t.typbasetype) AS domain_type,
                (SELECT format_type(t2.typbasetype, t2.typtypmod) FROM pg_catalog.pg_type t2
                    WHERE t2.typtype = 'd' AND t2.oid = a.atttypid) AS domain_complete_type,
                a.attnotnull AS isnotnull,
                a.attidentity::text AS attidentity,
                (SELECT collcollate FROM pg_catalog.pg_collation tc WHERE tc.oid = a.attcollation) AS collation,
                (SELECT pg_get_expr(adbin, adrelid) FROM pg_attrdef
                    WHERE adrelid = a.attrelid AND adnum = a.attnum) AS default,
                (SELECT description FROM pg_description
                    WHERE objoid = c.oid AND a.attnum = pg_description.objsubid) AS comment
             FROM pg_attribute a
                 INNER JOIN pg_class c ON c.oid = a.attrelid
                 INNER JOIN pg_type t ON t.oid = a.atttypid
                 INNER JOIN pg_namespace n ON n.oid = c.relnamespace
                 LEFT JOIN pg_depend d ON d.objid = c.oid AND d.deptype = 'e'
                     AND d.classid = (SELECT oid FROM pg_class WHERE relname = 'pg_class')
             WHERE a.attnum > 0 AND c.relkind = 'r' AND d.refobjid IS NULL
                 AND n.nspname = ANY(current_schemas(false))
                 AND n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
                 AND c.relname = $1
             ORDER BY a.attnum",
            &[&table_name],
        )
        .await?;

    rows.iter().map(build_column).collect()
}

fn build_column(row: &tokio_postgres::Row) -> Result<Column, GormiteError> {
    let field: String = row.get("field");
    let db_type: String = row.get("type");
    let complete_type: String = row.get("complete_type");
    let domain_type: Option<String> = row.get("domain_type");
    let domain_complete_type: Option<String> = row.get("domain_complete_type");
    let isnotnull: bool = row.get("isnotnull");
    let attidentity: String = row.get("attidentity");
    let collation: Option<String> = row.get("collation");
    let mut default: Option<String> = row.get("default");
    let comment: Option<String> = row.get("comment");

    let mut dbtype = db_type.to_lowercase();
    let mut complete = complete_type;
    if let Some(domain) = domain_type.filter(|d| !d.is_empty()) {
        if crate::types::from_db_type_name(&dbtype).is_err() {
            dbtype = domain.to_lowercase();
            if let Some(domain_complete) = domain_complete_type {
                complete = domain_complete;
            }
        }
    }

    if let Some(d) = &default {
        if let Some(caps) = default_cast_re().captures(d) {
            default = Some(caps[1].to_string());
        } else if default_null_cast_re().is_match(d) {
            default = None;
        }
    }

    let mut length = if matches!(dbtype.as_str(), "varchar" | "bpchar") {
        varchar_length_re()
            .captures(&complete)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .filter(|n| *n > 0)
    } else {
        None
    };

    let mut fixed = false;
    let mut precision = None;
    let mut scale = None;
    let mut jsonb = false;

    match dbtype.as_str() {
        "smallint" | "int2" | "int" | "int4" | "integer" | "bigint" | "int8" | "year" => {
            length = None;
        }
        "bool" | "boolean" => {
            length = None;
        }
        "json" | "text" | "_varchar" | "varchar" => {
            default = default.map(|d| d.replace("''", "'"));
        }
        "char" | "bpchar" => {
            fixed = true;
        }
        "float" | "float4" | "float8" | "double" | "double precision" | "real" | "decimal" | "money" | "numeric" => {
            if let Some(caps) = numeric_precision_scale_re().captures(&complete) {
                precision = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
                scale = caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok());
                length = None;
            }
        }
        "jsonb" => {
            jsonb = true;
        }
        _ => {}
    }

    if let Some(d) = &default {
        if let Some(caps) = default_quoted_re().captures(d) {
            default = Some(caps[1].to_string());
        }
    }

    let ty = crate::types::from_db_type_name(&dbtype)?;

    let mut column = Column::new(&field, ty);
    column.length = length;
    column.precision = precision;
    column.scale = scale;
    column.default = default;
    column.notnull = isnotnull;
    column.fixed = fixed;
    column.autoincrement = attidentity == "d";
    column.comment = comment;
    if let Some(collation) = collation {
        column.platform_options.insert("collation".to_string(), collation);
    }
    if ty == LogicalType::Json && jsonb {
        column.platform_options.insert("jsonb".to_string(), "true".to_string());
    }

    Ok(column)
}

async fn select_index_columns(client: &Client, table_name: &str) -> Result<Vec<Index>, GormiteError> {
    let rows = client
        .query(
            "SELECT
                quote_ident(ic.relname) AS relname,
                i.indisunique,
                i.indisprimary,
                i.indkey::text AS indkey,
                i.indrelid::text AS indrelid,
                pg_get_expr(i.indpred, i.indrelid) AS where_clause
             FROM pg_index i
                 JOIN pg_class AS tc ON tc.oid = i.indrelid
                 JOIN pg_namespace tn ON tn.oid = tc.relnamespace
                 JOIN pg_class AS ic ON ic.oid = i.indexrelid
             WHERE tc.relname = $1
                 AND tn.nspname = ANY(current_schemas(false))
                 AND tn.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')",
            &[&table_name],
        )
        .await?;

    let mut indexes = Vec::with_capacity(rows.len());
    for row in rows {
        let relname: String = row.get("relname");
        let is_unique: bool = row.get("indisunique");
        let is_primary: bool = row.get("indisprimary");
        let indkey: String = row.get("indkey");
        let indrelid: String = row.get("indrelid");
        let where_clause: Option<String> = row.get("where_clause");

        let col_numbers: Vec<i16> = indkey
            .split_whitespace()
            .map(|s| {
                s.parse().map_err(|_| {
                    GormiteError::IntrospectionParseError(format!("non-numeric indkey entry `{s}`"))
                })
            })
            .collect::<Result<_, _>>()?;

        let relid: i64 = indrelid
            .parse()
            .map_err(|_| GormiteError::IntrospectionParseError(format!("non-numeric indrelid `{indrelid}`")))?;

        let column_names = resolve_index_column_names(client, relid, &col_numbers).await?;
        let cols: Vec<&str> = column_names.iter().map(String::as_str).collect();

        let mut index = Index::new(&relname, &cols, is_unique, is_primary);
        index.where_clause = where_clause;
        indexes.push(index);
    }
    Ok(indexes)
}

async fn resolve_index_column_names(
    client: &Client,
    relid: i64,
    col_numbers: &[i16],
) -> Result<Vec<String>, GormiteError> {
    let rows = client
        .query(
            "SELECT attnum, attname FROM pg_attribute \
             WHERE attrelid = $1 AND attnum = ANY($2) ORDER BY attnum ASC",
            &[&relid, &col_numbers],
        )
        .await?;

    let mut by_attnum = std::collections::HashMap::new();
    for row in &rows {
        let attnum: i16 = row.get("attnum");
        let attname: String = row.get("attname");
        by_attnum.insert(attnum, attname);
    }

    col_numbers
        .iter()
        .map(|n| {
            by_attnum
                .get(n)
                .cloned()
                .ok_or_else(|| GormiteError::IntrospectionParseError(format!("unresolved index column attnum {n}")))
        })
        .collect()
}

async fn select_foreign_keys(client: &Client, table_name: &str) -> Result<Vec<ForeignKeyConstraint>, GormiteError> {
    let rows = client
        .query(
            "SELECT quote_ident(r.conname) AS conname, pg_get_constraintdef(r.oid, true) AS condef
             FROM pg_constraint r
                 JOIN pg_class AS tc ON tc.oid = r.conrelid
                 JOIN pg_namespace tn ON tn.oid = tc.relnamespace
             WHERE tc.relname = $1
                 AND tn.nspname = ANY(current_schemas(false))
                 AND tn.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
                 AND r.contype = 'f'",
            &[&table_name],
        )
        .await?;

    rows.iter()
        .map(|row| {
            let conname: String = row.get("conname");
            let condef: String = row.get("condef");
            parse_foreign_key(&conname, &condef)
        })
        .collect()
}

fn parse_foreign_key(conname: &str, condef: &str) -> Result<ForeignKeyConstraint, GormiteError> {
    let caps = foreign_key_re().captures(condef).ok_or_else(|| {
        GormiteError::IntrospectionParseError(format!("could not parse foreign key definition `{condef}`"))
    })?;

    let local_columns: Vec<String> = caps[1].split(',').map(|c| c.trim().to_string()).collect();
    let foreign_table = caps[2].trim().to_string();
    let foreign_columns: Vec<String> = caps[3].split(',').map(|c| c.trim().to_string()).collect();

    let local: Vec<&str> = local_columns.iter().map(String::as_str).collect();
    let foreign: Vec<&str> = foreign_columns.iter().map(String::as_str).collect();

    let mut fk = ForeignKeyConstraint::new(conname, &local, foreign_table, &foreign);
    fk.on_update = on_update_re()
        .captures(condef)
        .map(|c| c[1].to_string());
    fk.on_delete = on_delete_re()
        .captures(condef)
        .map(|c| c[1].to_string());
    Ok(fk)
}

async fn fetch_table_options(client: &Client, table_name: &str) -> Result<(bool, Option<String>), GormiteError> {
    let row = client
        .query_opt(
            "SELECT
                CASE c.relpersistence WHEN 'u' THEN true ELSE false END AS unlogged,
                obj_description(c.oid, 'pg_class') AS comment
             FROM pg_class c
                 INNER JOIN pg_namespace n ON n.oid = c.relnamespace
             WHERE c.relkind = 'r' AND c.relname = $1
                 AND n.nspname = ANY(current_schemas(false))
                 AND n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')",
            &[&table_name],
        )
        .await?;

    match row {
        Some(row) => Ok((row.get("unlogged"), row.get("comment"))),
        None => Ok((false, None)),
    }
}
