//! Schema: the top-level container of tables, sequences, and namespaces.

use crate::error::GormiteError;
use crate::schema::sequence::Sequence;
use crate::schema::table::Table;
use indexmap::{IndexMap, IndexSet};

#[derive(Debug, Clone)]
pub struct SchemaConfig {
    pub max_identifier_length: usize,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            max_identifier_length: 63,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Schema {
    pub default_namespace: String,
    pub namespaces: IndexSet<String>,
    pub tables: IndexMap<String, Table>,
    pub sequences: IndexMap<String, Sequence>,
    pub config: SchemaConfig,
}

impl Schema {
    pub fn new(default_namespace: impl Into<String>) -> Self {
        let default_namespace = default_namespace.into();
        let mut namespaces = IndexSet::new();
        namespaces.insert(default_namespace.clone());
        Self {
            default_namespace,
            namespaces,
            tables: IndexMap::new(),
            sequences: IndexMap::new(),
            config: SchemaConfig::default(),
        }
    }

    /// Adds a table, rejecting duplicates by normalized qualified name.
    /// A table with a non-default namespace auto-creates that namespace.
    pub fn add_table(&mut self, table: Table) -> Result<(), GormiteError> {
        let key = table.normalized_name();
        if self.tables.contains_key(&key) {
            return Err(GormiteError::DuplicateName {
                kind: "table",
                name: table.name,
            });
        }
        if let Some((ns, _)) = key.split_once('.') {
            self.namespaces.insert(ns.to_string());
        }
        self.tables.insert(key, table);
        Ok(())
    }

    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(&name.to_lowercase())
    }

    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(&name.to_lowercase())
    }

    pub fn add_sequence(&mut self, sequence: Sequence) -> Result<(), GormiteError> {
        let key = sequence.normalized_name();
        if self.sequences.contains_key(&key) {
            return Err(GormiteError::DuplicateName {
                kind: "sequence",
                name: sequence.name,
            });
        }
        self.sequences.insert(key, sequence);
        Ok(())
    }

    /// Shortest name for a table relative to this schema's default namespace.
    pub fn table_shortest_name(&self, normalized_table_key: &str) -> String {
        match normalized_table_key.split_once('.') {
            Some((ns, name)) if ns == self.default_namespace => name.to_string(),
            _ => normalized_table_key.to_string(),
        }
    }
}
