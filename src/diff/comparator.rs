//! Comparator algorithm: deterministic, single-pass, no I/O.
//!
//! Grounded on `original_source/pkg/diff_calc/comparator.go`'s
//! `CompareSchemas`/`CompareTables`/`detectRenamedColumns`/
//! `detectRenamedIndexes`/`diffForeignKey`.

use super::{ColumnDiff, ForeignKeyDiff, IndexDiff, RenamedIndex, SchemaDiff, TableDiff};
use crate::schema::foreign_key::ForeignKeyConstraint;
use crate::schema::index::Index;
use crate::schema::sequence::is_autoincrement_sequence_name;
use crate::schema::{Column, Schema, Sequence, Table};

pub fn compare_schemas(old: &Schema, new: &Schema) -> SchemaDiff {
    let mut diff = SchemaDiff::default();

    for ns in &new.namespaces {
        if !old.namespaces.contains(ns) {
            diff.created_schemas.push(ns.clone());
        }
    }
    for ns in &old.namespaces {
        if !new.namespaces.contains(ns) {
            diff.dropped_schemas.push(ns.clone());
        }
    }

    // Tables, matched by shortest name relative to `new`'s default namespace.
    let old_by_shortest: std::collections::HashMap<String, &Table> = old
        .tables
        .iter()
        .map(|(k, t)| (old.table_shortest_name(k), t))
        .collect();

    for (new_key, new_table) in &new.tables {
        let shortest = new.table_shortest_name(new_key);
        match old_by_shortest.get(&shortest) {
            None => diff.created_tables.push(new_table.clone()),
            Some(old_table) => {
                let table_diff = compare_tables(old_table, new_table);
                if !table_diff.is_empty() {
                    diff.altered_tables.push(table_diff);
                }
            }
        }
    }
    for (old_key, old_table) in &old.tables {
        let shortest = old.table_shortest_name(old_key);
        if !new
            .tables
            .iter()
            .any(|(k, _)| new.table_shortest_name(k) == shortest)
        {
            diff.dropped_tables.push(old_table.clone());
        }
    }

    // Sequences, eliding the auto-increment sequence of a matching single-
    // column integer PK on either side.
    for (key, seq) in &new.sequences {
        match old.sequences.get(key) {
            None => {
                if !is_autoincrement_sequence_elsewhere(new, &seq.normalized_name()) {
                    diff.created_sequences.push(seq.clone());
                }
            }
            Some(old_seq) => {
                if diff_sequence(old_seq, seq) {
                    diff.altered_sequences.push(seq.clone());
                }
            }
        }
    }
    for (key, seq) in &old.sequences {
        if new.sequences.contains_key(key) {
            continue;
        }
        if is_autoincrement_sequence_elsewhere(old, &seq.normalized_name()) {
            continue;
        }
        diff.dropped_sequences.push(seq.clone());
    }

    diff
}

fn diff_sequence(old: &Sequence, new: &Sequence) -> bool {
    old.allocation_size != new.allocation_size || old.initial_value != new.initial_value
}

fn is_autoincrement_sequence_elsewhere(schema: &Schema, sequence_shortest_name: &str) -> bool {
    schema.tables.values().any(|table| {
        let Some(pk_name) = &table.primary_key_name else {
            return false;
        };
        let Some(pk_index) = table.indexes.get(pk_name) else {
            return false;
        };
        let cols = pk_index.column_names();
        if cols.len() != 1 {
            return false;
        }
        let Some(col) = table.get_column(cols[0]) else {
            return false;
        };
        if col.ty != crate::types::LogicalType::Integer {
            return false;
        }
        is_autoincrement_sequence_name(
            sequence_shortest_name,
            &schema.table_shortest_name(&table.normalized_name()),
            &col.normalized_name(),
        )
    })
}

pub fn compare_tables(old: &Table, new: &Table) -> TableDiff {
    let mut diff = TableDiff {
        table_name: new.name.clone(),
        ..Default::default()
    };

    let mut added: Vec<Column> = Vec::new();
    let mut changed: Vec<ColumnDiff> = Vec::new();
    for (key, new_col) in &new.columns {
        match old.columns.get(key) {
            None => added.push(new_col.clone()),
            Some(old_col) => {
                if !old_col.equals_ignoring_name(new_col) {
                    changed.push(ColumnDiff {
                        old: old_col.clone(),
                        new: new_col.clone(),
                    });
                }
            }
        }
    }
    let mut dropped: Vec<Column> = old
        .columns
        .iter()
        .filter(|(key, _)| !new.columns.contains_key(*key))
        .map(|(_, c)| c.clone())
        .collect();

    // Explicit renames.
    for (new_key, original_key) in &new.renamed_columns {
        let Some(added_pos) = added.iter().position(|c| &c.normalized_name() == new_key) else {
            continue;
        };
        let Some(dropped_pos) = dropped.iter().position(|c| &c.normalized_name() == original_key) else {
            continue;
        };
        let new_col = added.remove(added_pos);
        let old_col = dropped.remove(dropped_pos);
        changed.push(ColumnDiff { old: old_col, new: new_col });
    }

    // Implicit rename detection: a unique structurally-equal pair.
    let mut rename_pairs = Vec::new();
    for (ai, a) in added.iter().enumerate() {
        let candidates: Vec<usize> = dropped
            .iter()
            .enumerate()
            .filter(|(_, d)| d.equals_ignoring_name(a))
            .map(|(di, _)| di)
            .collect();
        if candidates.len() != 1 {
            continue;
        }
        // and `a` must be the only added column matching that dropped one.
        let di = candidates[0];
        let matches_for_dropped = added.iter().filter(|c| c.equals_ignoring_name(&dropped[di])).count();
        if matches_for_dropped != 1 {
            continue;
        }
        rename_pairs.push((ai, di));
    }
    rename_pairs.sort_by(|a, b| b.0.cmp(&a.0));
    for (ai, di) in rename_pairs {
        let new_col = added.remove(ai);
        let old_col = dropped.remove(di);
        changed.push(ColumnDiff { old: old_col, new: new_col });
    }

    diff.added_columns = added;
    diff.changed_columns = changed;
    diff.dropped_columns = dropped;

    diff_indexes(old, new, &mut diff);
    diff_foreign_keys(old, new, &mut diff);

    diff
}

fn diff_indexes(old: &Table, new: &Table, diff: &mut TableDiff) {
    let mut added: Vec<&Index> = Vec::new();
    let mut modified: Vec<IndexDiff> = Vec::new();
    let mut matched_old: std::collections::HashSet<String> = std::collections::HashSet::new();

    for (key, new_idx) in &new.indexes {
        match old.indexes.get(key) {
            None => added.push(new_idx),
            Some(old_idx) => {
                matched_old.insert(key.clone());
                let diff_index = !(old_idx.is_fulfilled_by(new_idx) && new_idx.is_fulfilled_by(old_idx));
                if diff_index {
                    modified.push(IndexDiff {
                        old: old_idx.clone(),
                        new: new_idx.clone(),
                    });
                }
            }
        }
    }
    let mut dropped: Vec<&Index> = old
        .indexes
        .iter()
        .filter(|(k, _)| !matched_old.contains(*k))
        .map(|(_, idx)| idx)
        .collect();

    // Rename detection: unique mutual-fulfillment pair across the
    // remaining added/dropped sets.
    let mut renamed = Vec::new();
    let mut consumed_added = vec![false; added.len()];
    let mut consumed_dropped = vec![false; dropped.len()];
    for (ai, a) in added.iter().enumerate() {
        let candidates: Vec<usize> = dropped
            .iter()
            .enumerate()
            .filter(|(di, d)| !consumed_dropped[*di] && a.is_fulfilled_by(d) && d.is_fulfilled_by(a))
            .map(|(di, _)| di)
            .collect();
        if candidates.len() != 1 {
            continue;
        }
        let di = candidates[0];
        let matches_for_dropped = added
            .iter()
            .enumerate()
            .filter(|(i, c)| !consumed_added[*i] && c.is_fulfilled_by(dropped[di]) && dropped[di].is_fulfilled_by(c))
            .count();
        if matches_for_dropped != 1 {
            continue;
        }
        consumed_added[ai] = true;
        consumed_dropped[di] = true;
        renamed.push(RenamedIndex {
            old_name: dropped[di].name.clone(),
            new: (*a).clone(),
        });
    }

    diff.added_indexes = added
        .iter()
        .enumerate()
        .filter(|(i, _)| !consumed_added[*i])
        .map(|(_, idx)| (*idx).clone())
        .collect();
    diff.dropped_indexes = dropped
        .iter()
        .enumerate()
        .filter(|(i, _)| !consumed_dropped[*i])
        .map(|(_, idx)| (*idx).clone())
        .collect();
    diff.modified_indexes = modified;
    diff.renamed_indexes = renamed;
}

/// `true` iff the two FKs differ: local/foreign column lists, unqualified
/// foreign table name, or effective on-update/on-delete actions.
fn diff_fk(a: &ForeignKeyConstraint, b: &ForeignKeyConstraint) -> bool {
    let lower = |v: Vec<&str>| v.into_iter().map(|s| s.to_lowercase()).collect::<Vec<_>>();
    lower(a.local_column_names()) != lower(b.local_column_names())
        || lower(a.foreign_column_names()) != lower(b.foreign_column_names())
        || a.unqualified_foreign_table_name() != b.unqualified_foreign_table_name()
        || a.effective_on_update() != b.effective_on_update()
        || a.effective_on_delete() != b.effective_on_delete()
}

fn diff_foreign_keys(old: &Table, new: &Table, diff: &mut TableDiff) {
    let mut remaining_old: Vec<&ForeignKeyConstraint> = old.foreign_keys.values().collect();
    let mut remaining_new: Vec<&ForeignKeyConstraint> = new.foreign_keys.values().collect();

    // Pass 1: consume structurally-identical pairs (unchanged).
    let mut i = 0;
    while i < remaining_old.len() {
        let mut matched = None;
        for (j, new_fk) in remaining_new.iter().enumerate() {
            if !diff_fk(remaining_old[i], new_fk) {
                matched = Some(j);
                break;
            }
        }
        if let Some(j) = matched {
            remaining_old.remove(i);
            remaining_new.remove(j);
        } else {
            i += 1;
        }
    }

    // Pass 2: same normalized name among the rest -> modified.
    let mut modified = Vec::new();
    let mut i = 0;
    while i < remaining_old.len() {
        let name = remaining_old[i].normalized_name();
        if let Some(j) = remaining_new.iter().position(|fk| fk.normalized_name() == name) {
            modified.push(ForeignKeyDiff {
                old: remaining_old.remove(i).clone(),
                new: remaining_new.remove(j).clone(),
            });
        } else {
            i += 1;
        }
    }

    diff.modified_foreign_keys = modified;
    diff.dropped_foreign_keys = remaining_old.into_iter().cloned().collect();
    diff.added_foreign_keys = remaining_new.into_iter().cloned().collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;
    use crate::types::LogicalType;

    fn table(name: &str, cols: &[&str]) -> Table {
        let mut t = Table::new(name);
        for c in cols {
            t.add_column(Column::new(*c, LogicalType::Integer)).unwrap();
        }
        t
    }

    #[test]
    fn round_trip_trivial() {
        let mut s = Schema::new("public");
        s.add_table(table("app_user", &["id"])).unwrap();
        let diff = compare_schemas(&s, &s);
        assert!(diff.is_empty());
    }

    #[test]
    fn anti_symmetry_of_creation_and_drop() {
        let mut s = Schema::new("public");
        s.add_table(table("app_user", &["id"])).unwrap();
        let empty = Schema::new("public");

        let created = compare_schemas(&empty, &s);
        assert_eq!(created.created_tables.len(), 1);
        assert!(created.dropped_tables.is_empty());

        let dropped = compare_schemas(&s, &empty);
        assert_eq!(dropped.dropped_tables.len(), 1);
        assert!(dropped.created_tables.is_empty());
    }

    #[test]
    fn explicit_rename_collapses_to_single_column_diff() {
        let old = table("app_user", &["id", "full_name"]);
        let mut new = table("app_user", &["id"]);
        new.add_column(Column::new("display_name", LogicalType::Integer)).unwrap();
        new.renamed_columns.insert("display_name".to_string(), "full_name".to_string());

        let diff = compare_tables(&old, &new);
        assert_eq!(diff.changed_columns.len(), 1);
        assert_eq!(diff.changed_columns[0].old.name, "full_name");
        assert_eq!(diff.changed_columns[0].new.name, "display_name");
        assert!(diff.added_columns.is_empty());
        assert!(diff.dropped_columns.is_empty());
    }

    #[test]
    fn implicit_rename_requires_unique_candidate() {
        let old = table("app_user", &["id", "a", "b"]);
        let new = table("app_user", &["id", "c", "d"]);
        // a, b, c, d are all the same type (Integer) so every added column
        // matches every dropped column — ambiguous, nothing is promoted.
        let diff = compare_tables(&old, &new);
        assert_eq!(diff.added_columns.len(), 2);
        assert_eq!(diff.dropped_columns.len(), 2);
        assert!(diff.changed_columns.is_empty());
    }

    #[test]
    fn foreign_key_target_rewrite_is_modified_not_drop_add() {
        let mut old = table("orders", &["id", "user_id"]);
        old.add_foreign_key_constraint(ForeignKeyConstraint::new("fk1", &["user_id"], "users", &["id"]))
            .unwrap();
        let mut new = table("orders", &["id", "user_id"]);
        new.add_foreign_key_constraint(ForeignKeyConstraint::new("fk1", &["user_id"], "accounts", &["id"]))
            .unwrap();

        let diff = compare_tables(&old, &new);
        assert_eq!(diff.modified_foreign_keys.len(), 1);
        assert!(diff.added_foreign_keys.is_empty());
        assert!(diff.dropped_foreign_keys.is_empty());
    }

    #[test]
    fn s6_equivalent_partial_unique_indexes_produce_no_diff() {
        let mut old = table("app_user", &["id", "email", "identity_type"]);
        let mut old_index = Index::new("idx__app_user__email__uniq", &["email"], true, false);
        old_index.where_clause = Some("identity_type='email'".to_string());
        old.add_index(old_index).unwrap();

        let mut new = table("app_user", &["id", "email", "identity_type"]);
        let mut new_index = Index::new("idx__app_user__email__uniq", &["email"], true, false);
        new_index.where_clause = Some("identity_type='email'".to_string());
        new.add_index(new_index).unwrap();

        let diff = compare_tables(&old, &new);
        assert!(diff.added_indexes.is_empty());
        assert!(diff.dropped_indexes.is_empty());
    }

    #[test]
    fn sequence_with_changed_allocation_size_is_altered_not_recreated() {
        use crate::schema::Sequence;

        let mut old = Schema::new("public");
        old.add_sequence(Sequence::new("order_id_seq")).unwrap();
        let mut new = Schema::new("public");
        let mut seq = Sequence::new("order_id_seq");
        seq.allocation_size = 5;
        new.add_sequence(seq).unwrap();

        let diff = compare_schemas(&old, &new);
        assert_eq!(diff.altered_sequences.len(), 1);
        assert!(diff.created_sequences.is_empty());
        assert!(diff.dropped_sequences.is_empty());
    }

    #[test]
    fn unchanged_sequence_produces_no_diff() {
        use crate::schema::Sequence;

        let mut old = Schema::new("public");
        old.add_sequence(Sequence::new("order_id_seq")).unwrap();
        let mut new = Schema::new("public");
        new.add_sequence(Sequence::new("order_id_seq")).unwrap();

        let diff = compare_schemas(&old, &new);
        assert!(diff.is_empty());
    }
}
