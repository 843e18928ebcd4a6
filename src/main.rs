//! gormite CLI.
//!
//! Entry point for the schema-migration generator.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gormite::builder::RecordDef;
use gormite::config::Config;
use gormite::runner::{self, Runner, Tool};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gormite")]
#[command(
    about = "Generates PostgreSQL migration SQL from a target schema and a live database",
    long_about = None
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Target migration runner format. Required in `diff` mode; overrides
    /// `output.tool` from the config file.
    #[arg(long)]
    tool: Option<String>,

    /// Database connection string. Overrides `database.dsn` from the config file.
    #[arg(long)]
    dsn: Option<String>,

    /// Path to the configuration file.
    #[arg(long, default_value = "gormite.yaml")]
    config: PathBuf,
}

#[derive(Subcommand, Debug, Default)]
enum Command {
    /// Generate migration files for the current diff (default).
    #[default]
    Diff,
    /// Exit non-zero if a pending diff exists, without writing files.
    Validate,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(run(args))
}

async fn run(args: Args) -> Result<()> {
    let config = Config::from_file(&args.config).context("failed to load configuration")?;

    let dsn = args.dsn.clone().unwrap_or_else(|| config.database.dsn.clone());
    let (client, connection) = tokio_postgres::connect(&dsn, tokio_postgres::NoTls)
        .await
        .context("failed to connect to database")?;

    tokio::spawn(async move {
        if let Err(err) = connection.await {
            tracing::error!(%err, "postgres connection terminated");
        }
    });

    // Discovering target records from annotated source files is out of
    // scope for this crate (see spec §1); callers that have a parser wire
    // its output in here.
    let records: Vec<RecordDef> = Vec::new();

    let runner = Runner::new(&client, config.schema.default_schema.clone());

    match args.command.unwrap_or_default() {
        Command::Diff => {
            let tool_name = args.tool.as_deref().unwrap_or(config.output.tool.as_str());
            let tool = Tool::parse(tool_name)?;

            let diff = runner.compute_diff(&records).await?;
            let reverse = runner.compute_reverse_diff(&records).await?;
            let timestamp = runner::timestamp_now();
            let paths = runner::write_migration(&diff, &reverse, tool, &config.output.migrations_dir, &timestamp)?;
            for path in paths {
                println!("wrote {}", path.display());
            }
            Ok(())
        }
        Command::Validate => {
            let diff = runner.compute_diff(&records).await?;
            match runner::validate(&diff) {
                Ok(()) => {
                    println!("schema is up to date");
                    Ok(())
                }
                Err(err) => {
                    eprintln!("{err}");
                    std::process::exit(1);
                }
            }
        }
    }
}
