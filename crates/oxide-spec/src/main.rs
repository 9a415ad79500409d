//! oxide-spec CLI
//!
//! Inspect, render and run capabilities for one table.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_spec::core::TableMeta;
use oxide_spec::spec::{AggregateSpec, CompoundQuerySpec, DeleteSpec, InsertSpec, QuerySpec, UpdateSpec};
use oxide_spec::{AnyCapability, CapabilityKind, Factory, FactoryConfig, Params, DEFAULT_MAX_CONDITION_DEPTH};

/// Declarative query capabilities over SQLite.
#[derive(Parser)]
#[command(name = "oxide-spec")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Table metadata as JSON (`{"name": ..., "fields": [...]}`).
    #[arg(short, long)]
    schema: PathBuf,

    /// JSON array of capabilities to register, each tagged with `kind`.
    #[arg(short, long)]
    capabilities: Option<PathBuf>,

    /// Database URL (SQLite path or connection string).
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database: String,

    /// Maximum nesting depth of condition trees (0 disables the check).
    #[arg(long, env = "OXIDE_SPEC_MAX_CONDITION_DEPTH", default_value_t = DEFAULT_MAX_CONDITION_DEPTH)]
    max_depth: usize,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Operation kinds accepted by `params`.
#[derive(Clone, Copy, ValueEnum)]
enum SpecKind {
    Query,
    Select,
    Update,
    Delete,
    Aggregate,
    Compound,
    Insert,
}

/// Ad hoc operations run from a spec file.
#[derive(Clone, Copy, ValueEnum)]
enum AdHocKind {
    Compound,
    Insert,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered capabilities with their parameters.
    Catalog,

    /// Show SQL and bind order for a capability.
    Render {
        /// Capability kind.
        kind: CapabilityKind,
        /// Capability name.
        name: String,
    },

    /// Derive the parameters of a spec file without registering it.
    Params {
        /// Kind of spec in the file.
        #[arg(value_enum)]
        kind: SpecKind,
        /// Spec as JSON.
        spec: PathBuf,
    },

    /// Run a capability and print its result as JSON.
    Run {
        /// Capability kind.
        kind: CapabilityKind,
        /// Capability name.
        name: String,
        /// Parameter values as a JSON object.
        #[arg(short, long, default_value = "{}")]
        params: String,
        /// SQL script executed before the capability (e.g. schema setup).
        #[arg(long)]
        setup: Option<PathBuf>,
    },

    /// Run an ad hoc compound or insert spec.
    Exec {
        /// Kind of spec in the file.
        #[arg(value_enum)]
        kind: AdHocKind,
        /// Spec as JSON.
        spec: PathBuf,
        /// Parameter values as a JSON object.
        #[arg(short, long, default_value = "{}")]
        params: String,
        /// SQL script executed before the statement.
        #[arg(long)]
        setup: Option<PathBuf>,
    },
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_params(raw: &str) -> anyhow::Result<Params> {
    let value: Value = serde_json::from_str(raw).context("parsing --params")?;
    Ok(Params::from_json(&value)?)
}

async fn connect(database: &str, setup: Option<&Path>) -> anyhow::Result<sqlx::SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(database)
        .await?;
    if let Some(path) = setup {
        let script = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        sqlx::raw_sql(&script).execute(&pool).await?;
        info!("Applied setup script {}", path.display());
    }
    Ok(pool)
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
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let table: TableMeta = read_json(&cli.schema)?;
    let config = FactoryConfig::default().max_condition_depth(cli.max_depth);
    let factory = Factory::with_config(table, config)?;
    if let Some(path) = &cli.capabilities {
        let caps: Vec<AnyCapability> = read_json(path)?;
        factory.add_all(caps)?;
    }

    match cli.command {
        Commands::Catalog => print_json(&factory.catalog())?,

        Commands::Render { kind, name } => print_json(&factory.render(kind, &name)?)?,

        Commands::Params { kind, spec } => {
            let deriver = factory.deriver();
            let params = match kind {
                SpecKind::Query | SpecKind::Select => {
                    deriver.derive_query(&read_json::<QuerySpec>(&spec)?)?
                }
                SpecKind::Update => deriver.derive_update(&read_json::<UpdateSpec>(&spec)?)?,
                SpecKind::Delete => deriver.derive_delete(&read_json::<DeleteSpec>(&spec)?)?,
                SpecKind::Aggregate => {
                    deriver.derive_aggregate(&read_json::<AggregateSpec>(&spec)?)?
                }
                SpecKind::Compound => {
                    deriver.derive_compound(&read_json::<CompoundQuerySpec>(&spec)?)?
                }
                SpecKind::Insert => deriver.derive_insert(&read_json::<InsertSpec>(&spec)?),
            };
            print_json(&params)?;
        }

        Commands::Run {
            kind,
            name,
            params,
            setup,
        } => {
            let params = parse_params(&params)?;
            let pool = connect(&cli.database, setup.as_deref()).await?;
            let result = factory
                .executor()
                .run_json(&pool, kind, &name, &params)
                .await?;
            print_json(&result)?;
        }

        Commands::Exec {
            kind,
            spec,
            params,
            setup,
        } => {
            let params = parse_params(&params)?;
            let pool = connect(&cli.database, setup.as_deref()).await?;
            let executor = factory.executor();
            let result = match kind {
                AdHocKind::Compound => {
                    let prepared = executor.prepare_compound(&read_json(&spec)?)?;
                    let rows = prepared.fetch_json(&pool, &params).await?;
                    Value::Array(rows.into_iter().map(Value::Object).collect())
                }
                AdHocKind::Insert => {
                    let affected = executor
                        .insert(&pool, &read_json::<InsertSpec>(&spec)?, &params)
                        .await?;
                    serde_json::json!({ "rows_affected": affected })
                }
            };
            print_json(&result)?;
        }
    }

    Ok(())
}
