//! crudsmith CLI
//!
//! Generates data access code from a definition file and applies its
//! entities to Postgres.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crudsmith_core::prelude::*;
use crudsmith_migrate::prelude::*;

/// CRUD code generation and Postgres migrations from entity definitions.
#[derive(Parser)]
#[command(name = "crudsmith")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write generated code and optionally migrate the database.
    Generate {
        /// Definition file.
        file: PathBuf,

        /// Directory for generated files (defaults to the file's directory).
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Apply the entities to the database after writing code.
        #[arg(long)]
        migrate: bool,

        /// Role that owns new tables and sequences (defaults to [user]).
        #[arg(long, env = "CRUDSMITH_OWNER")]
        owner: Option<String>,

        /// Connection URL overriding the header's server settings.
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
    },

    /// Parse a definition file and report what it describes.
    Check {
        /// Definition file.
        file: PathBuf,

        /// Print the parsed model as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the migration statements without connecting.
    ///
    /// Objects created or renamed by earlier entities are tracked. Tables
    /// named by [alter table] that the file does not create first are
    /// assumed to exist and to be empty, and no other object is assumed.
    Plan {
        /// Definition file.
        file: PathBuf,

        /// Role that owns new tables and sequences (defaults to [user]).
        #[arg(long, env = "CRUDSMITH_OWNER")]
        owner: Option<String>,
    },
}

fn load(path: &Path) -> anyhow::Result<ParsedFile> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let parsed = parse_str(&text).with_context(|| format!("failed to parse {}", path.display()))?;
    info!(
        file = %path.display(),
        entities = parsed.entities.len(),
        "Definition file parsed"
    );
    Ok(parsed)
}

/// Logs the outcome of each entity and fails if any did not migrate.
fn summarize(results: &[Result<MigrationReport>]) -> anyhow::Result<()> {
    let failed = results.iter().filter(|r| r.is_err()).count();
    for report in results.iter().flatten() {
        for moved in &report.displaced {
            info!(kind = %moved.kind, from = %moved.from, to = %moved.to, "Renamed existing object");
        }
        info!(
            entity = %report.entity,
            table = %report.table,
            sequence_start = report.sequence_start,
            "Migrated"
        );
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {} entities failed to migrate", results.len());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Generate {
            file,
            out_dir,
            migrate,
            owner,
            database_url,
        } => {
            let parsed = load(&file)?;
            let dir = out_dir.unwrap_or_else(|| {
                file.parent()
                    .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
            });
            let renderer = RustRenderer::new(&parsed.config.package);
            let units = write_units(&renderer, &parsed.entities, &dir)?;
            for unit in &units {
                info!(path = %unit.path.display(), entities = ?unit.entities, "Generated");
            }

            if migrate {
                let db = match database_url {
                    Some(url) => PgDatabase::connect_url(&url).await?,
                    None => PgDatabase::connect(&parsed.config).await?,
                };
                let owner = owner.unwrap_or_else(|| parsed.config.user.clone());
                let executor = MigrationExecutor::new(&db, owner);
                let results = executor.migrate_all(&parsed.entities).await;
                db.close().await;
                summarize(&results)?;
            }
        }

        Commands::Check { file, json } => {
            let parsed = load(&file)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&parsed)?);
            } else {
                for entity in &parsed.entities {
                    let mode = match &entity.mode {
                        EntityMode::Create => "create".to_string(),
                        EntityMode::Alter { prior_table, .. } => format!("alter {prior_table}"),
                    };
                    println!(
                        "{} -> {} ({} columns, {mode}) in {}",
                        entity.name,
                        entity.qualified_table_name(),
                        entity.columns.len(),
                        entity.file_name
                    );
                }
            }
        }

        Commands::Plan { file, owner } => {
            let parsed = load(&file)?;
            let db = DryRunDatabase::new().assume_prior_tables(&parsed.entities);
            warn!("Dry run: altered tables the file does not create are assumed to exist and be empty");
            let owner = owner.unwrap_or_else(|| parsed.config.user.clone());
            let executor = MigrationExecutor::new(&db, owner);
            let results = executor.migrate_all(&parsed.entities).await;
            summarize(&results)?;
        }
    }

    Ok(())
}
