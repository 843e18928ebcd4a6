//! gormite: PostgreSQL schema-migration generator.
//!
//! Builds a target [`schema::Schema`] from plain record/field definitions,
//! introspects a live database into the same model, diffs the two, and emits
//! the DDL (and migration files for `migrate`/`goose`) needed to bring the
//! database in line with the target.

pub mod asset;
pub mod builder;
pub mod config;
pub mod diff;
pub mod emit;
pub mod error;
pub mod introspect;
pub mod runner;
pub mod schema;
pub mod types;

// Re-export commonly used types
pub use builder::{FieldDef, FieldTags, RecordDef, build_schema};
pub use config::Config;
pub use diff::{SchemaDiff, TableDiff, compare_schemas, compare_tables};
pub use error::GormiteError;
pub use introspect::introspect_schema;
pub use runner::{Runner, Tool};
pub use schema::Schema;
