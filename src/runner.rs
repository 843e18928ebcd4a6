//! Migration runner shell (Component H): orchestrates the target-schema
//! builder and the live-schema introspector into a diff, then the diff into
//! a migration file pair — or, in `validate` mode, into a pass/fail report.
//!
//! Grounded on `pg_migration_lint::pipeline::LintPipeline`'s shape: a small
//! struct holding the pieces, one method per pipeline stage.

use crate::builder::{RecordDef, build_schema};
use crate::diff::{SchemaDiff, compare_schemas};
use crate::emit::emit_diff;
use crate::error::GormiteError;
use crate::introspect::introspect_schema;
use std::path::{Path, PathBuf};
use tokio_postgres::Client;

const GENERATED_HEADER: &str = "-- THIS FILE WAS GENERATED BY GORMITE, EDIT IT IF YOU WANT <3";

/// Which external migration runner the output is formatted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Migrate,
    Goose,
}

impl Tool {
    pub fn parse(name: &str) -> Result<Self, GormiteError> {
        match name {
            "migrate" => Ok(Tool::Migrate),
            "goose" => Ok(Tool::Goose),
            other => Err(GormiteError::UnsupportedFeature(format!(
                "unknown migration tool `{other}`, expected migrate or goose"
            ))),
        }
    }
}

pub struct Runner<'a> {
    client: &'a Client,
    default_namespace: String,
}

impl<'a> Runner<'a> {
    pub fn new(client: &'a Client, default_namespace: impl Into<String>) -> Self {
        Self {
            client,
            default_namespace: default_namespace.into(),
        }
    }

    /// Builds the target schema from `records`, introspects the live
    /// database, and diffs live -> target (the forward/"up" direction).
    pub async fn compute_diff(&self, records: &[RecordDef]) -> Result<SchemaDiff, GormiteError> {
        let target = build_schema(records, &self.default_namespace)?;
        let live = introspect_schema(self.client, &self.default_namespace).await?;
        Ok(compare_schemas(&live, &target))
    }

    /// Diffs target -> live (the reverse/"down" direction), for generating
    /// the matching rollback migration.
    pub async fn compute_reverse_diff(&self, records: &[RecordDef]) -> Result<SchemaDiff, GormiteError> {
        let target = build_schema(records, &self.default_namespace)?;
        let live = introspect_schema(self.client, &self.default_namespace).await?;
        Ok(compare_schemas(&target, &live))
    }
}

/// `validate` subcommand: success when there is no pending diff, otherwise
/// an error listing the DDL that would be generated.
pub fn validate(diff: &SchemaDiff) -> Result<(), GormiteError> {
    if diff.is_empty() {
        return Ok(());
    }
    let pending = emit_diff(diff)?;
    Err(GormiteError::UnsupportedFeature(format!(
        "pending migrations detected:\n{}",
        pending.join("\n")
    )))
}

/// `diff` subcommand: writes the generated migration file(s) for `tool`.
/// Refuses to generate empty files — "no changes detected" is an error here,
/// unlike in `validate` mode.
pub fn write_migration(
    diff: &SchemaDiff,
    reverse: &SchemaDiff,
    tool: Tool,
    migrations_dir: &Path,
    timestamp: &str,
) -> Result<Vec<PathBuf>, GormiteError> {
    if diff.is_empty() {
        return Err(GormiteError::UnsupportedFeature("no changes detected".to_string()));
    }

    let up = emit_diff(diff)?;
    let down = emit_diff(reverse)?;

    std::fs::create_dir_all(migrations_dir)?;

    match tool {
        Tool::Migrate => {
            let up_path = migrations_dir.join(format!("{timestamp}_gen.up.sql"));
            let down_path = migrations_dir.join(format!("{timestamp}_gen.down.sql"));
            std::fs::write(&up_path, render_plain(&up))?;
            std::fs::write(&down_path, render_plain(&down))?;
            Ok(vec![up_path, down_path])
        }
        Tool::Goose => {
            let path = migrations_dir.join(format!("{timestamp}_gen.sql"));
            std::fs::write(&path, render_goose(&up, &down))?;
            Ok(vec![path])
        }
    }
}

fn render_plain(statements: &[String]) -> String {
    let mut out = String::new();
    out.push_str(GENERATED_HEADER);
    out.push_str("\n\n");
    for stmt in statements {
        out.push_str(stmt);
        out.push('\n');
    }
    out
}

fn render_goose(up: &[String], down: &[String]) -> String {
    format!(
        "-- +goose Up\n-- +goose StatementBegin\n{}\n-- +goose StatementEnd\n\n-- +goose Down\n-- +goose StatementBegin\n{}\n-- +goose StatementEnd\n",
        up.join("\n"),
        down.join("\n"),
    )
}

/// Current UTC time formatted as `yyyymmddhhmmss`, for migration filenames.
pub fn timestamp_now() -> String {
    chrono::Utc::now().format("%Y%m%d%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::SchemaDiff;

    #[test]
    fn validate_succeeds_on_empty_diff() {
        assert!(validate(&SchemaDiff::default()).is_ok());
    }

    #[test]
    fn write_migration_refuses_empty_diff() {
        let dir = tempfile::tempdir().unwrap();
        let empty = SchemaDiff::default();
        let err = write_migration(&empty, &empty, Tool::Migrate, dir.path(), "20260101000000").unwrap_err();
        assert!(err.to_string().contains("no changes"));
    }

    #[test]
    fn write_migration_creates_up_and_down_files_for_migrate_tool() {
        let dir = tempfile::tempdir().unwrap();
        let mut diff = SchemaDiff::default();
        diff.created_schemas.push("app".to_string());
        let empty = SchemaDiff::default();

        let paths = write_migration(&diff, &empty, Tool::Migrate, dir.path(), "20260101000000").unwrap();
        assert_eq!(paths.len(), 2);
        let up = std::fs::read_to_string(&paths[0]).unwrap();
        assert!(up.contains(GENERATED_HEADER));
        assert!(up.contains("CREATE SCHEMA"));
    }

    #[test]
    fn write_migration_creates_single_file_for_goose_tool() {
        let dir = tempfile::tempdir().unwrap();
        let mut diff = SchemaDiff::default();
        diff.created_schemas.push("app".to_string());
        let empty = SchemaDiff::default();

        let paths = write_migration(&diff, &empty, Tool::Goose, dir.path(), "20260101000000").unwrap();
        assert_eq!(paths.len(), 1);
        let contents = std::fs::read_to_string(&paths[0]).unwrap();
        assert!(contents.contains("-- +goose Up"));
        assert!(contents.contains("-- +goose Down"));
    }

    #[test]
    fn tool_parse_rejects_unknown_names() {
        assert!(Tool::parse("liquibase").is_err());
        assert!(matches!(Tool::parse("migrate"), Ok(Tool::Migrate)));
        assert!(matches!(Tool::parse("goose"), Ok(Tool::Goose)));
    }
}
