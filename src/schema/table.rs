//! Table: the mutation API used by both the target-schema builder and the
//! live-schema introspector.
//!
//! Grounded on `original_source/pkg/assets/table.go`.

use crate::asset::generate_identifier_name;
use crate::error::GormiteError;
use crate::schema::column::Column;
use crate::schema::foreign_key::ForeignKeyConstraint;
use crate::schema::index::{Index, UniqueConstraint};
use indexmap::IndexMap;

const MAX_IDENTIFIER_LENGTH: usize = 63;

#[derive(Debug, Clone, Default)]
pub struct Table {
    pub name: String,
    pub columns: IndexMap<String, Column>,
    pub indexes: IndexMap<String, Index>,
    /// Normalized names of indexes synthesized by `ensure_supporting_index`,
    /// subject to silent replacement by a later explicit index.
    pub implicit_indexes: IndexMap<String, ()>,
    pub unique_constraints: IndexMap<String, UniqueConstraint>,
    pub foreign_keys: IndexMap<String, ForeignKeyConstraint>,
    pub primary_key_name: Option<String>,
    /// new (normalized) -> original_oldest (normalized), collapsing chains.
    pub renamed_columns: IndexMap<String, String>,
    pub comment: Option<String>,
    pub unlogged: bool,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn normalized_name(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.get(&name.to_lowercase())
    }

    pub fn add_column(&mut self, column: Column) -> Result<(), GormiteError> {
        let key = column.normalized_name();
        if self.columns.contains_key(&key) {
            return Err(GormiteError::DuplicateName {
                kind: "column",
                name: column.name,
            });
        }
        self.columns.insert(key, column);
        Ok(())
    }

    /// Renames a column, collapsing multi-rename chains so only
    /// original↔current survives. A rename back to the original name
    /// removes the chain entry entirely.
    pub fn rename_column(&mut self, old: &str, new: &str) -> Result<(), GormiteError> {
        let old_key = old.to_lowercase();
        let new_key = new.to_lowercase();
        if old_key == new_key {
            return Err(GormiteError::InvalidMetadata(format!(
                "cannot rename column `{old}` to itself"
            )));
        }
        let mut column = self
            .columns
            .shift_remove(&old_key)
            .ok_or_else(|| GormiteError::NotFound {
                kind: "column",
                name: old.to_string(),
            })?;
        column.name = new.to_string();
        self.columns.insert(new_key.clone(), column);

        let original = self.renamed_columns.shift_remove(&old_key).unwrap_or(old_key);
        if original == new_key {
            // Reverting to the original name collapses the chain away.
            self.renamed_columns.shift_remove(&new_key);
        } else {
            self.renamed_columns.insert(new_key, original);
        }
        Ok(())
    }

    pub fn modify_column(&mut self, name: &str, f: impl FnOnce(&mut Column)) -> Result<(), GormiteError> {
        let key = name.to_lowercase();
        let column = self.columns.get_mut(&key).ok_or_else(|| GormiteError::NotFound {
            kind: "column",
            name: name.to_string(),
        })?;
        f(column);
        Ok(())
    }

    /// Drops a column and every index/constraint/FK referencing it —
    /// PostgreSQL drops the entire constraint, not just the column from it.
    pub fn drop_column(&mut self, name: &str) {
        let key = name.to_lowercase();
        self.columns.shift_remove(&key);
        self.indexes.retain(|_, idx| !idx.columns.contains_key(&key));
        self.implicit_indexes
            .retain(|k, _| self.indexes.contains_key(k));
        self.unique_constraints
            .retain(|_, uc| !uc.columns.contains_key(&key));
        self.foreign_keys
            .retain(|_, fk| !fk.local_columns.contains_key(&key));
        if self
            .primary_key_name
            .as_ref()
            .is_some_and(|pk| !self.indexes.contains_key(pk))
        {
            self.primary_key_name = None;
        }
    }

    /// Adds an index, replacing a same-named implicit index if the new one
    /// fulfills it; any other name collision fails.
    pub fn add_index(&mut self, index: Index) -> Result<(), GormiteError> {
        let key = index.normalized_name();
        if let Some(existing) = self.indexes.get(&key) {
            let is_implicit = self.implicit_indexes.contains_key(&key);
            if is_implicit && index.is_fulfilled_by(existing) {
                // silent replacement
            } else {
                return Err(GormiteError::DuplicateName {
                    kind: "index",
                    name: index.name,
                });
            }
        }
        if index.is_primary {
            self.primary_key_name = Some(key.clone());
        }
        self.implicit_indexes.shift_remove(&key);
        self.indexes.insert(key, index);
        Ok(())
    }

    pub fn drop_index(&mut self, name: &str) {
        let key = name.to_lowercase();
        self.indexes.shift_remove(&key);
        self.implicit_indexes.shift_remove(&key);
        if self.primary_key_name.as_deref() == Some(key.as_str()) {
            self.primary_key_name = None;
        }
    }

    pub fn drop_primary_key(&mut self) {
        if let Some(pk) = self.primary_key_name.take() {
            self.indexes.shift_remove(&pk);
            self.implicit_indexes.shift_remove(&pk);
        }
    }

    /// Ensures a supporting index exists for `columns`, synthesizing one
    /// named from `generate_identifier_name` if no existing index already
    /// fulfills a unique-index candidate over them. Used by both
    /// `add_unique_constraint` and `add_foreign_key_constraint` — see
    /// DESIGN.md open-question #1.
    fn ensure_supporting_index(&mut self, columns: &[&str], is_unique: bool) {
        let candidate_name =
            generate_identifier_name(columns, &format!("idx_{}", self.name), MAX_IDENTIFIER_LENGTH);
        let candidate = Index::new(&candidate_name, columns, is_unique, false);

        let fulfilled = self
            .indexes
            .values()
            .any(|existing| candidate.is_fulfilled_by(existing));
        if fulfilled {
            return;
        }

        let key = candidate.normalized_name();
        self.implicit_indexes.insert(key.clone(), ());
        self.indexes.insert(key, candidate);
    }

    pub fn add_unique_constraint(&mut self, constraint: UniqueConstraint) -> Result<(), GormiteError> {
        let key = constraint.normalized_name();
        if self.unique_constraints.contains_key(&key) {
            return Err(GormiteError::DuplicateName {
                kind: "unique constraint",
                name: constraint.name,
            });
        }
        let columns = constraint.column_names();
        self.ensure_supporting_index(&columns, true);
        self.unique_constraints.insert(key, constraint);
        Ok(())
    }

    pub fn add_foreign_key_constraint(&mut self, fk: ForeignKeyConstraint) -> Result<(), GormiteError> {
        let key = fk.normalized_name();
        if self.foreign_keys.contains_key(&key) {
            return Err(GormiteError::DuplicateName {
                kind: "foreign key",
                name: fk.name,
            });
        }
        for col in fk.local_column_names() {
            if !self.columns.contains_key(&col.to_lowercase()) {
                return Err(GormiteError::NotFound {
                    kind: "column",
                    name: col.to_string(),
                });
            }
        }
        let columns = fk.local_column_names();
        self.ensure_supporting_index(&columns, false);
        self.foreign_keys.insert(key, fk);
        Ok(())
    }

    pub fn columns_are_indexed(&self, columns: &[&str]) -> bool {
        self.indexes.values().any(|idx| idx.spans_columns(columns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LogicalType;

    fn table_with_columns(cols: &[&str]) -> Table {
        let mut t = Table::new("app_user");
        for c in cols {
            t.add_column(Column::new(*c, LogicalType::Integer)).unwrap();
        }
        t
    }

    #[test]
    fn add_duplicate_column_fails() {
        let mut t = table_with_columns(&["id"]);
        assert!(t.add_column(Column::new("id", LogicalType::Integer)).is_err());
    }

    #[test]
    fn rename_column_collapses_chain() {
        let mut t = table_with_columns(&["full_name"]);
        t.rename_column("full_name", "display_name").unwrap();
        assert_eq!(
            t.renamed_columns.get("display_name").map(|s| s.as_str()),
            Some("full_name")
        );
        t.rename_column("display_name", "full_name").unwrap();
        assert!(t.renamed_columns.is_empty());
        assert!(t.get_column("full_name").is_some());
    }

    #[test]
    fn rename_column_chain_through_three_names() {
        let mut t = table_with_columns(&["a"]);
        t.rename_column("a", "b").unwrap();
        t.rename_column("b", "c").unwrap();
        assert_eq!(t.renamed_columns.get("c").map(|s| s.as_str()), Some("a"));
        assert_eq!(t.renamed_columns.len(), 1);
    }

    #[test]
    fn drop_column_removes_dependent_index() {
        let mut t = table_with_columns(&["id", "email"]);
        t.add_index(Index::new("idx_email", &["email"], false, false)).unwrap();
        t.drop_column("email");
        assert!(t.indexes.is_empty());
    }

    #[test]
    fn add_unique_constraint_synthesizes_implicit_index() {
        let mut t = table_with_columns(&["id", "email"]);
        t.add_unique_constraint(UniqueConstraint::new("uq_email", &["email"]))
            .unwrap();
        assert_eq!(t.indexes.len(), 1);
        assert_eq!(t.implicit_indexes.len(), 1);
    }

    #[test]
    fn add_unique_constraint_skips_index_when_already_covered() {
        let mut t = table_with_columns(&["id", "email"]);
        t.add_index(Index::new("idx_email_uniq", &["email"], true, false))
            .unwrap();
        t.add_unique_constraint(UniqueConstraint::new("uq_email", &["email"]))
            .unwrap();
        assert_eq!(t.indexes.len(), 1, "no new index should be synthesized");
        assert!(t.implicit_indexes.is_empty());
    }

    #[test]
    fn add_foreign_key_requires_existing_local_columns() {
        let mut t = table_with_columns(&["id"]);
        let fk = ForeignKeyConstraint::new("fk1", &["missing_col"], "other", &["id"]);
        assert!(t.add_foreign_key_constraint(fk).is_err());
    }

    #[test]
    fn explicit_index_replaces_implicit_one_silently() {
        let mut t = table_with_columns(&["id", "email"]);
        t.add_unique_constraint(UniqueConstraint::new("uq_email", &["email"]))
            .unwrap();
        let implicit_name = t.implicit_indexes.keys().next().unwrap().clone();
        let explicit = Index::new(&implicit_name, &["email"], true, false);
        assert!(t.add_index(explicit).is_ok());
        assert!(t.implicit_indexes.is_empty());
    }

    #[test]
    fn drop_primary_key_clears_name_and_index() {
        let mut t = table_with_columns(&["id"]);
        t.add_index(Index::new("app_user_pkey", &["id"], true, true)).unwrap();
        assert!(t.primary_key_name.is_some());
        t.drop_primary_key();
        assert!(t.primary_key_name.is_none());
        assert!(t.indexes.is_empty());
    }
}
