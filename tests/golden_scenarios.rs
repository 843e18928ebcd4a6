//! End-to-end golden scenarios, exercised through the public API: build a
//! target schema, diff it against a hand-built "live" schema, emit DDL.

use gormite::diff::compare_schemas;
use gormite::emit::emit_diff;
use gormite::schema::{Column, ForeignKeyConstraint, Index, Schema, Table, UniqueConstraint};
use gormite::types::LogicalType;

fn schema_with(table: Table) -> Schema {
    let mut s = Schema::new("public");
    s.add_table(table).unwrap();
    s
}

fn app_user_with_pk() -> Table {
    let mut t = Table::new("app_user");
    let mut id = Column::new("id", LogicalType::Integer);
    id.autoincrement = true;
    t.add_column(id).unwrap();
    t.add_index(Index::new("app_user_pkey", &["id"], true, true)).unwrap();
    t
}

#[test]
fn s1_add_column_emits_alter_then_unique_index() {
    let old = schema_with(app_user_with_pk());

    let mut new_table = app_user_with_pk();
    let mut email = Column::new("email", LogicalType::String);
    email.length = Some(180);
    new_table.add_column(email).unwrap();
    new_table
        .add_unique_constraint(UniqueConstraint::new("uq_email", &["email"]))
        .unwrap();
    let new = schema_with(new_table);

    let diff = compare_schemas(&old, &new);
    let sql = emit_diff(&diff).unwrap();

    assert!(sql[0].starts_with("ALTER TABLE app_user ADD email VARCHAR(180) NOT NULL"));
    assert!(sql.iter().any(|s| s.starts_with("CREATE UNIQUE INDEX")));
}

#[test]
fn s2_explicit_rename_emits_rename_column_only() {
    let mut old_table = app_user_with_pk();
    old_table.add_column(Column::new("full_name", LogicalType::String)).unwrap();
    let old = schema_with(old_table);

    let mut new_table = app_user_with_pk();
    new_table.add_column(Column::new("display_name", LogicalType::String)).unwrap();
    new_table.renamed_columns.insert("display_name".to_string(), "full_name".to_string());
    let new = schema_with(new_table);

    let diff = compare_schemas(&old, &new);
    let sql = emit_diff(&diff).unwrap();

    assert_eq!(sql, vec!["ALTER TABLE app_user RENAME COLUMN full_name TO display_name;".to_string()]);
}

#[test]
fn s3_default_change_emits_set_default() {
    let old = schema_with(app_user_with_pk());

    let mut new_table = app_user_with_pk();
    new_table.modify_column("id", |c| c.default = Some("'Anonymous'".to_string())).unwrap();
    let new = schema_with(new_table);

    let diff = compare_schemas(&old, &new);
    let sql = emit_diff(&diff).unwrap();

    assert!(sql.iter().any(|s| s.contains("SET DEFAULT 'Anonymous'")));
}

#[test]
fn s4_primary_key_drop_emits_constraint_drop_first() {
    let old = schema_with(app_user_with_pk());

    let mut new_table = app_user_with_pk();
    new_table.drop_primary_key();
    let new = schema_with(new_table);

    let diff = compare_schemas(&old, &new);
    let sql = emit_diff(&diff).unwrap();

    assert_eq!(sql[0], "ALTER TABLE app_user DROP CONSTRAINT app_user_pkey;");
}

#[test]
fn s5_foreign_key_target_rewrite_drops_then_adds() {
    let mut old_table = Table::new("orders");
    old_table.add_column(Column::new("id", LogicalType::Integer)).unwrap();
    old_table.add_column(Column::new("user_id", LogicalType::Integer)).unwrap();
    old_table
        .add_foreign_key_constraint(ForeignKeyConstraint::new("fk1", &["user_id"], "users", &["id"]))
        .unwrap();
    let old = schema_with(old_table);

    let mut new_table = Table::new("orders");
    new_table.add_column(Column::new("id", LogicalType::Integer)).unwrap();
    new_table.add_column(Column::new("user_id", LogicalType::Integer)).unwrap();
    new_table
        .add_foreign_key_constraint(ForeignKeyConstraint::new("fk1", &["user_id"], "accounts", &["id"]))
        .unwrap();
    let new = schema_with(new_table);

    let diff = compare_schemas(&old, &new);
    let sql = emit_diff(&diff).unwrap();

    let drop_pos = sql.iter().position(|s| s.contains("DROP CONSTRAINT fk1")).unwrap();
    let add_pos = sql.iter().position(|s| s.contains("ADD CONSTRAINT fk1")).unwrap();
    assert!(drop_pos < add_pos);
    assert!(sql[add_pos].contains("REFERENCES accounts"));
}

#[test]
fn s6_equivalent_partial_unique_index_yields_empty_diff() {
    let mut old_table = app_user_with_pk();
    old_table.add_column(Column::new("email", LogicalType::String)).unwrap();
    old_table.add_column(Column::new("identity_type", LogicalType::String)).unwrap();
    let mut old_index = Index::new("idx__app_user__email__uniq", &["email"], true, false);
    old_index.where_clause = Some("identity_type='email'".to_string());
    old_table.add_index(old_index).unwrap();
    let old = schema_with(old_table);

    let mut new_table = app_user_with_pk();
    new_table.add_column(Column::new("email", LogicalType::String)).unwrap();
    new_table.add_column(Column::new("identity_type", LogicalType::String)).unwrap();
    let mut new_index = Index::new("idx__app_user__email__uniq", &["email"], true, false);
    new_index.where_clause = Some("identity_type='email'".to_string());
    new_table.add_index(new_index).unwrap();
    let new = schema_with(new_table);

    let diff = compare_schemas(&old, &new);
    assert!(diff.is_empty());
    assert!(emit_diff(&diff).unwrap().is_empty());
}
