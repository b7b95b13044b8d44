//! CLI tool for schema validation and data inspection.
//!
//! Provides commands for:
//! - Creating a store from the bundled schema definition
//! - Schema validation and integrity auditing
//! - Store inspection and version lineage lookup

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use warehouse_core::config::CatalogConfig;
use warehouse_core::integrity::{IntegrityAuditor, IntegrityReport};
use warehouse_core::schema::{render_report, Introspector, SchemaValidator, SCHEMA_SQL};
use warehouse_core::store::Store;
use warehouse_core::versions::{get_version, version_history, VersionKind};

/// Command-line arguments for the warehouse tool.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Do not enable foreign key enforcement on the connection
    #[arg(long, global = true)]
    no_foreign_keys: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new store and apply the schema definition
    CreateDb {
        /// Path of the database file to create
        db_path: PathBuf,

        /// Schema definition script (default: bundled schema)
        #[arg(long)]
        schema: Option<PathBuf>,
    },

    /// Show tables, columns, foreign keys and row counts
    Info {
        /// Path of the database file
        db_path: PathBuf,
    },

    /// Validate the store against the expected schema
    Validate {
        /// Path of the database file
        db_path: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Audit stored data for integrity violations
    Integrity {
        /// Path of the database file
        db_path: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the version lineage of a library or algorithm build
    History {
        /// Entity kind: library or algorithm
        kind: String,

        /// Id of the newest version
        id: i64,

        /// Path of the database file
        #[arg(long, default_value = "database.db")]
        db: PathBuf,

        /// Print the history as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let config_for = |path: &Path| CatalogConfig {
        db_path: path.to_path_buf(),
        enforce_foreign_keys: !cli.no_foreign_keys,
        ..Default::default()
    };

    match &cli.command {
        Commands::CreateDb { db_path, schema } => {
            create_db(&config_for(db_path), schema.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Info { db_path } => {
            show_info(&config_for(db_path))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate { db_path, json } => validate(&config_for(db_path), *json),
        Commands::Integrity { db_path, json } => integrity(&config_for(db_path), *json),
        Commands::History { kind, id, db, json } => {
            history(&config_for(db), kind, *id, *json)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn create_db(config: &CatalogConfig, schema: Option<&Path>) -> anyhow::Result<()> {
    if config.db_path.exists() {
        bail!("Database already exists: {}", config.db_path.display());
    }
    let sql = match schema {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema file {}", path.display()))?,
        None => SCHEMA_SQL.to_string(),
    };

    let mut store = Store::create(config)?;
    if let Err(e) = store.apply_schema(&sql) {
        // Close the connection before removing the file.
        drop(store);
        remove_partial(&config.db_path);
        return Err(e.into());
    }
    tracing::info!("Applied schema to {}", config.db_path.display());
    println!("Created database: {}", config.db_path.display());
    Ok(())
}

fn remove_partial(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed partial database {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove partial database {}: {}", path.display(), e),
    }
}

fn show_info(config: &CatalogConfig) -> anyhow::Result<()> {
    let store = Store::open(config)?;
    let introspector = Introspector::new(&store);
    let tables = introspector.tables()?;
    if tables.is_empty() {
        println!("No tables found in {}", config.db_path.display());
        return Ok(());
    }
    let counts = introspector.row_counts()?;

    println!("=== Database structure ===");
    println!("Database: {}", config.db_path.display());
    println!(
        "Foreign key enforcement: {}",
        if introspector.foreign_keys_enabled()? { "on" } else { "off" }
    );
    println!();

    for table in &tables {
        println!("Table: {} ({} rows)", table, counts.get(table).copied().unwrap_or(0));
        let columns = introspector.columns(table)?;
        if !columns.is_empty() {
            println!("  Columns:");
            for column in columns {
                let pk = if column.primary_key { " (PK)" } else { "" };
                let not_null = if column.not_null { " NOT NULL" } else { "" };
                println!("    - {} ({}){}{}", column.name, column.declared_type, pk, not_null);
            }
        }
        let foreign_keys = introspector.foreign_keys(table)?;
        if !foreign_keys.is_empty() {
            println!("  Foreign keys:");
            for fk in foreign_keys {
                println!("    - {} -> {}.{}", fk.from_column, fk.to_table, fk.to_column);
            }
        }
        println!();
    }

    let indexes = introspector.indexes()?;
    if !indexes.is_empty() {
        println!("Indexes:");
        for index in indexes {
            println!("  - {}", index);
        }
    }
    Ok(())
}

fn validate(config: &CatalogConfig, json: bool) -> anyhow::Result<ExitCode> {
    let store = Store::open(config)?;
    let report = SchemaValidator::new().validate(&store)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", render_report(&report, &config.db_path.display().to_string()));
        if report.is_valid {
            println!("This database is compatible with the data warehouse");
        } else {
            println!("This database is NOT compatible with the data warehouse");
        }
    }

    Ok(if report.is_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn integrity(config: &CatalogConfig, json: bool) -> anyhow::Result<ExitCode> {
    let store = Store::open(config)?;
    let report = IntegrityAuditor::new().audit(&store);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_integrity(&report);
    }

    Ok(if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_integrity(report: &IntegrityReport) {
    println!("=== Data integrity audit ===");
    println!("Foreign key violations: {}", report.foreign_key_violations.len());
    for v in &report.foreign_key_violations {
        println!(
            "  - {} rowid={} column={} -> {}",
            v.table,
            v.rowid.map_or_else(|| "-".to_string(), |id| id.to_string()),
            v.from_column.as_deref().unwrap_or("?"),
            v.parent_table
        );
    }
    println!("Interval violations: {}", report.interval_violations.len());
    for v in &report.interval_violations {
        println!("  - tag {}: start={} end={}", v.tag_id, v.start, v.end);
    }
    println!("Orphaned rows:");
    for (relationship, count) in report.orphaned_counts.iter().filter(|(_, count)| **count > 0) {
        println!("  - {}: {}", relationship, count);
    }
    for (kind, groups) in &report.duplicate_hash_groups {
        for group in groups {
            println!(
                "Duplicate {} commit hash {} ({} rows: {:?})",
                kind, group.commit_hash, group.count, group.ids
            );
        }
    }
    for (kind, rows) in &report.malformed_hashes {
        for row in rows {
            println!("Malformed {} commit hash at id {}: {}", kind, row.id, row.commit_hash);
        }
    }
    for v in &report.problem_flag_violations {
        println!(
            "Analysis data {} inconsistent with problem flag: {:?}",
            v.analysis_data_id, v.reason
        );
    }
    for failure in &report.check_failures {
        println!("Check {} could not run: {}", failure.check, failure.message);
    }
    println!("Result: {}", if report.is_clean() { "CLEAN" } else { "VIOLATIONS FOUND" });
}

fn history(config: &CatalogConfig, kind: &str, id: i64, json: bool) -> anyhow::Result<()> {
    let kind: VersionKind = kind.parse()?;
    let store = Store::open(config)?;
    // Unknown ids are an error at the command line.
    get_version(&store, kind, id)?;
    let records = version_history(&store, kind, id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!("=== {} version history (oldest first) ===", kind);
    for record in records {
        println!(
            "  {} {} [{}] base={}",
            record.id,
            record.version.as_deref().unwrap_or("-"),
            record.commit_hash.as_deref().unwrap_or("-"),
            record
                .base_version_id
                .map_or_else(|| "-".to_string(), |id| id.to_string())
        );
        if let Some(info) = record.update_info.as_deref() {
            println!("      {}", info);
        }
    }
    Ok(())
}
