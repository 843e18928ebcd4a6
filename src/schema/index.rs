//! Index, unique constraint, and the `IsFulfilledBy` algebra.
//!
//! Grounded on `original_source/pkg/gormite/assets/index.go`.

use indexmap::IndexMap;

/// A table index — plain, unique, or primary.
#[derive(Debug, Clone)]
pub struct Index {
    pub name: String,
    /// Ordered column-name map; order matters for [`Index::spans_columns`].
    pub columns: IndexMap<String, String>,
    pub is_primary: bool,
    pub is_unique: bool,
    pub flags: IndexMap<String, ()>,
    pub where_clause: Option<String>,
    pub lengths: Option<Vec<Option<u32>>>,
}

impl Index {
    pub fn new(name: impl Into<String>, columns: &[&str], is_unique: bool, is_primary: bool) -> Self {
        let mut cols = IndexMap::new();
        for c in columns {
            cols.insert(c.to_lowercase(), (*c).to_string());
        }
        Self {
            name: name.into(),
            columns: cols,
            is_primary,
            is_unique: is_unique || is_primary,
            flags: IndexMap::new(),
            where_clause: None,
            lengths: None,
        }
    }

    pub fn normalized_name(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.values().map(|s| s.as_str()).collect()
    }

    pub fn is_simple_index(&self) -> bool {
        !self.is_primary && !self.is_unique
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains_key(&flag.to_lowercase())
    }

    pub fn add_flag(&mut self, flag: &str) {
        self.flags.insert(flag.to_lowercase(), ());
    }

    /// Same columns, same order, case/quote-insensitively. Sorted compare
    /// per `SpansColumns` — "same columns" ignores ordering at this check.
    pub fn spans_columns(&self, column_names: &[&str]) -> bool {
        let mut mine: Vec<String> = self.column_names().iter().map(|c| c.to_lowercase()).collect();
        let mut theirs: Vec<String> = column_names.iter().map(|c| c.to_lowercase()).collect();
        mine.sort();
        theirs.sort();
        mine == theirs
    }

    fn same_partial_index(&self, other: &Index) -> bool {
        match (&self.where_clause, &other.where_clause) {
            (Some(a), Some(b)) => a == b,
            (None, None) => true,
            _ => false,
        }
    }

    fn has_same_column_lengths(&self, other: &Index) -> bool {
        let filter = |lengths: &Option<Vec<Option<u32>>>| -> Vec<u32> {
            lengths
                .as_ref()
                .map(|v| v.iter().filter_map(|l| *l).collect())
                .unwrap_or_default()
        };
        filter(&self.lengths) == filter(&other.lengths)
    }

    /// `self` is satisfied by `other` — see spec §4.3.
    pub fn is_fulfilled_by(&self, other: &Index) -> bool {
        if other.columns.len() != self.columns.len() {
            return false;
        }
        if !self.spans_columns(&other.column_names()) {
            return false;
        }
        if !self.same_partial_index(other) {
            return false;
        }
        if !self.has_same_column_lengths(other) {
            return false;
        }
        if !self.is_unique && !self.is_primary {
            return true;
        }
        if other.is_primary != self.is_primary {
            return false;
        }
        other.is_unique == self.is_unique
    }

    /// A non-unique, non-primary index this one can silently overwrite.
    pub fn overrules(&self, other: &Index) -> bool {
        if other.is_primary {
            return false;
        }
        if self.is_simple_index() && other.is_unique {
            return false;
        }
        self.spans_columns(&other.column_names())
            && (self.is_primary || self.is_unique)
            && self.same_partial_index(other)
    }
}

/// A named `UNIQUE(...)` table constraint, distinct from a unique index.
#[derive(Debug, Clone)]
pub struct UniqueConstraint {
    pub name: String,
    pub columns: IndexMap<String, String>,
    pub flags: IndexMap<String, ()>,
}

impl UniqueConstraint {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        let mut cols = IndexMap::new();
        for c in columns {
            cols.insert(c.to_lowercase(), (*c).to_string());
        }
        Self {
            name: name.into(),
            columns: cols,
            flags: IndexMap::new(),
        }
    }

    pub fn normalized_name(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.values().map(|s| s.as_str()).collect()
    }

    /// An index candidate that would fulfill this constraint's columns.
    pub fn as_index_candidate(&self, name: impl Into<String>) -> Index {
        let cols: Vec<&str> = self.column_names();
        Index::new(name, &cols, true, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_fulfilled_by_is_reflexive_for_plain_index() {
        let idx = Index::new("idx_a", &["x", "y"], false, false);
        assert!(idx.is_fulfilled_by(&idx.clone()));
    }

    #[test]
    fn plain_index_is_fulfilled_by_unique_over_same_columns() {
        let plain = Index::new("idx_a", &["x"], false, false);
        let unique = Index::new("uniq_a", &["x"], true, false);
        assert!(plain.is_fulfilled_by(&unique));
    }

    #[test]
    fn unique_is_not_fulfilled_by_plain_over_same_columns() {
        let plain = Index::new("idx_a", &["x"], false, false);
        let unique = Index::new("uniq_a", &["x"], true, false);
        assert!(!unique.is_fulfilled_by(&plain));
    }

    #[test]
    fn different_column_count_never_fulfills() {
        let a = Index::new("a", &["x"], false, false);
        let b = Index::new("b", &["x", "y"], false, false);
        assert!(!a.is_fulfilled_by(&b));
    }

    #[test]
    fn spans_columns_ignores_order() {
        let idx = Index::new("idx", &["x", "y"], false, false);
        assert!(idx.spans_columns(&["y", "x"]));
    }

    #[test]
    fn partial_index_where_clause_must_match() {
        let mut a = Index::new("a", &["x"], true, false);
        a.where_clause = Some("active = true".to_string());
        let b = Index::new("b", &["x"], true, false);
        assert!(!a.is_fulfilled_by(&b));
    }

    #[test]
    fn length_options_with_only_none_entries_equal_absent() {
        let mut a = Index::new("a", &["x"], false, false);
        a.lengths = Some(vec![None]);
        let b = Index::new("b", &["x"], false, false);
        assert!(a.is_fulfilled_by(&b));
    }
}
