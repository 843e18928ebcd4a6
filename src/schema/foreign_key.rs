//! Foreign key constraints.
//!
//! Grounded on `original_source/pkg/assets/foreign_key_constraint.go`.

use indexmap::IndexMap;

/// Referential actions accepted by PostgreSQL for `ON UPDATE`/`ON DELETE`.
pub const VALID_FK_ACTIONS: [&str; 5] =
    ["CASCADE", "SET NULL", "NO ACTION", "RESTRICT", "SET DEFAULT"];

#[derive(Debug, Clone)]
pub struct ForeignKeyConstraint {
    pub name: String,
    pub local_columns: IndexMap<String, String>,
    pub foreign_table: String,
    pub foreign_columns: IndexMap<String, String>,
    pub on_update: Option<String>,
    pub on_delete: Option<String>,
    pub match_option: Option<String>,
    pub deferrable: bool,
    pub deferred: bool,
}

impl ForeignKeyConstraint {
    pub fn new(
        name: impl Into<String>,
        local_columns: &[&str],
        foreign_table: impl Into<String>,
        foreign_columns: &[&str],
    ) -> Self {
        let map = |cols: &[&str]| {
            let mut m = IndexMap::new();
            for c in cols {
                m.insert(c.to_lowercase(), (*c).to_string());
            }
            m
        };
        Self {
            name: name.into(),
            local_columns: map(local_columns),
            foreign_table: foreign_table.into(),
            foreign_columns: map(foreign_columns),
            on_update: None,
            on_delete: None,
            match_option: None,
            deferrable: false,
            deferred: false,
        }
    }

    pub fn normalized_name(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn local_column_names(&self) -> Vec<&str> {
        self.local_columns.values().map(|s| s.as_str()).collect()
    }

    pub fn foreign_column_names(&self) -> Vec<&str> {
        self.foreign_columns.values().map(|s| s.as_str()).collect()
    }

    pub fn unqualified_foreign_table_name(&self) -> String {
        match self.foreign_table.split_once('.') {
            Some((_, rest)) => rest.to_lowercase(),
            None => self.foreign_table.to_lowercase(),
        }
    }

    /// `NO ACTION` and `RESTRICT` both fold to "no action recorded",
    /// per `onEvent` in the source.
    pub fn effective_on_update(&self) -> Option<&str> {
        Self::fold_action(self.on_update.as_deref())
    }

    pub fn effective_on_delete(&self) -> Option<&str> {
        Self::fold_action(self.on_delete.as_deref())
    }

    fn fold_action(action: Option<&str>) -> Option<&str> {
        match action {
            Some("NO ACTION") | Some("RESTRICT") | None => None,
            Some(other) => Some(other),
        }
    }

    /// True if any of this FK's local columns appears among `index_columns`.
    pub fn intersects_index_columns(&self, index_columns: &[&str]) -> bool {
        index_columns.iter().any(|ic| {
            self.local_columns
                .values()
                .any(|lc| lc.to_lowercase() == ic.to_lowercase())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_action_and_restrict_are_equivalent() {
        let mut fk = ForeignKeyConstraint::new("fk1", &["user_id"], "users", &["id"]);
        fk.on_delete = Some("NO ACTION".to_string());
        assert_eq!(fk.effective_on_delete(), None);
        fk.on_delete = Some("RESTRICT".to_string());
        assert_eq!(fk.effective_on_delete(), None);
        fk.on_delete = Some("CASCADE".to_string());
        assert_eq!(fk.effective_on_delete(), Some("CASCADE"));
    }

    #[test]
    fn unqualified_foreign_table_name_strips_namespace() {
        let fk = ForeignKeyConstraint::new("fk1", &["user_id"], "public.Users", &["id"]);
        assert_eq!(fk.unqualified_foreign_table_name(), "users");
    }

    #[test]
    fn intersects_index_columns_is_case_insensitive() {
        let fk = ForeignKeyConstraint::new("fk1", &["User_Id"], "users", &["id"]);
        assert!(fk.intersects_index_columns(&["user_id"]));
        assert!(!fk.intersects_index_columns(&["email"]));
    }
}
