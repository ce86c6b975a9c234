//! dabrel CLI - add relationships to a data-access gateway configuration
//!
//! Usage:
//!   dabrel discover [--entity <alias>] [--json]
//!   dabrel add [--entity <alias>] [--all] [--dry-run]
//!   dabrel link [--dry-run]
//!   dabrel entities
//!
//! Examples:
//!   dabrel --schema schema.json discover --entity Author
//!   dabrel --config dab-config.json add --all --dry-run
//!   dabrel link

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dabrel::config::{load_env_file, Settings};
use dabrel::emit::{CommandExecutor, ExecutorPool, RecordingExecutor, RelationshipEmitter, DEFAULT_IDLE_TIMEOUT};
use dabrel::gateway::EntityCatalog;
use dabrel::metadata::{SchemaSource, SnapshotSource, WorkerSchemaSource};
use dabrel::prompt::TerminalPrompter;
use dabrel::worker::WorkerClient;
use dabrel::{AddOptions, Outcome, Session};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "dabrel")]
#[command(about = "Discover relationships and add them to a data-access gateway configuration")]
#[command(version)]
struct Cli {
    /// Gateway configuration file (defaults to gateway.config_file)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Settings file (defaults to $DABREL_CONFIG, ./dabrel.toml, ~/.config/dabrel/config.toml)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Read the schema from a JSON snapshot instead of the worker
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List relationships that could be added
    Discover {
        /// Only relationships from this entity
        #[arg(short, long)]
        entity: Option<String>,

        /// Print JSON instead of a list
        #[arg(long)]
        json: bool,
    },

    /// Choose discovered relationships and add them
    Add {
        /// Only relationships from this entity
        #[arg(short, long)]
        entity: Option<String>,

        /// Add every unambiguous relationship without asking
        #[arg(long)]
        all: bool,

        /// Print the gateway commands instead of running them
        #[arg(long)]
        dry_run: bool,
    },

    /// Add a many-to-many relationship through a linking table, step by step
    Link {
        /// Print the gateway command instead of running it
        #[arg(long)]
        dry_run: bool,
    },

    /// List configured entities
    Entities,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Entities => cmd_entities(&cli),
        Commands::Discover { entity, json } => cmd_discover(&cli, entity.as_deref(), *json).await,
        Commands::Add {
            entity,
            all,
            dry_run,
        } => {
            let options = AddOptions {
                entity: entity.clone(),
                all: *all,
            };
            cmd_add(&cli, &options, *dry_run).await
        }
        Commands::Link { dry_run } => cmd_link(&cli, *dry_run).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env("DABREL_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let mut settings = match &cli.settings {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load()?,
    };
    if let Some(config) = &cli.config {
        settings.gateway.config_file = config.display().to_string();
    }
    if let Some(schema) = &cli.schema {
        settings.schema.snapshot = Some(schema.display().to_string());
    }
    Ok(settings)
}

/// Snapshot source when one is configured, else the schema worker.
///
/// Reads the gateway configuration first so a broken configuration is
/// reported before any connection is attempted.
async fn open_schema_source(settings: &Settings) -> CliResult<Box<dyn SchemaSource>> {
    let config_path = settings.config_path()?;
    let catalog = EntityCatalog::load(&config_path)?;

    // Both sides qualify bare table names the same way.
    let default_schema = catalog.default_schema();

    if let Some(snapshot) = settings.snapshot_path()? {
        debug!(path = %snapshot.display(), %default_schema, "using schema snapshot");
        let source = SnapshotSource::from_file(&snapshot, default_schema)?;
        return Ok(Box::new(source));
    }

    let env_file = load_env_file(&settings.env_file_path()?)?;
    let connection = catalog.connection(&env_file)?;

    let client = WorkerClient::spawn_with_settings(settings).await?;
    Ok(Box::new(WorkerSchemaSource::new(
        Arc::new(client),
        connection.to_params(),
        default_schema,
    )))
}

/// The emitter, plus the recorder when this is a dry run.
fn build_emitter(
    settings: &Settings,
    dry_run: bool,
) -> CliResult<(RelationshipEmitter, Option<Arc<RecordingExecutor>>)> {
    let config_path = settings.config_path()?;

    if dry_run || settings.executor.dry_run {
        let recorder = Arc::new(RecordingExecutor::new(settings.gateway.cli.clone()));
        let pool = ExecutorPool::fixed(recorder.clone());
        return Ok((RelationshipEmitter::new(pool, config_path), Some(recorder)));
    }

    let idle_timeout = settings.executor.idle_timeout().unwrap_or_else(|e| {
        warn!(error = %e, "invalid executor.idle_timeout; using default");
        DEFAULT_IDLE_TIMEOUT
    });
    let emitter = RelationshipEmitter::process(
        settings.gateway.cli.clone(),
        settings.executor.env.clone(),
        config_path,
        idle_timeout,
    );
    Ok((emitter, None))
}

fn cmd_entities(cli: &Cli) -> CliResult<ExitCode> {
    let settings = load_settings(cli)?;
    let config_path = settings.config_path()?;
    let catalog = EntityCatalog::load(&config_path)?;

    if catalog.is_empty() {
        println!("No entities configured in {}.", config_path.display());
        return Ok(ExitCode::SUCCESS);
    }

    println!("Entities in {}:", config_path.display());
    for entity in catalog.iter() {
        println!(
            "  - {} ({} {}, {} relationship(s))",
            entity.alias,
            entity.source_type,
            entity.source_object,
            entity.relationships.len()
        );
        for relationship in &entity.relationships {
            println!(
                "      {} -> {} ({})",
                relationship.name, relationship.target_entity, relationship.cardinality
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn cmd_discover(cli: &Cli, entity: Option<&str>, json: bool) -> CliResult<ExitCode> {
    let settings = load_settings(cli)?;
    let source = open_schema_source(&settings).await?;
    let (emitter, _) = build_emitter(&settings, true)?;
    let prompter = TerminalPrompter::new();
    let session = Session::new(source.as_ref(), &prompter, &emitter);

    let candidates = session.discover(entity).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
    } else if candidates.is_empty() {
        println!("No new relationships to add.");
    } else {
        for candidate in &candidates {
            println!("  - {}", candidate.label());
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn cmd_add(cli: &Cli, options: &AddOptions, dry_run: bool) -> CliResult<ExitCode> {
    let settings = load_settings(cli)?;
    let source = open_schema_source(&settings).await?;
    let (emitter, recorder) = build_emitter(&settings, dry_run)?;
    let prompter = TerminalPrompter::new();
    let session = Session::new(source.as_ref(), &prompter, &emitter);

    let outcome = session.add_relationships(options).await?;
    report(&outcome, recorder.as_deref()).await;
    Ok(ExitCode::SUCCESS)
}

async fn cmd_link(cli: &Cli, dry_run: bool) -> CliResult<ExitCode> {
    let settings = load_settings(cli)?;
    let source = open_schema_source(&settings).await?;
    let (emitter, recorder) = build_emitter(&settings, dry_run)?;
    let prompter = TerminalPrompter::new();
    let session = Session::new(source.as_ref(), &prompter, &emitter);

    let outcome = session.link_tables().await?;
    report(&outcome, recorder.as_deref()).await;
    Ok(ExitCode::SUCCESS)
}

async fn report(outcome: &Outcome, recorder: Option<&RecordingExecutor>) {
    if let Some(recorder) = recorder {
        for command in recorder.commands().await {
            println!("{} {}", recorder.program(), command.join(" "));
        }
    }

    if let Outcome::Applied { failures, .. } = outcome {
        for failure in failures {
            eprintln!("Failed: {}: {}", failure.relationship, failure.error);
        }
    }
    println!("{}", outcome.summary());
}
