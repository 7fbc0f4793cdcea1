use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use modelsync_core::{TableModel, create_table_sql};
use modelsync_db::{
    Action, ColumnSnapshot, ComponentOutcome, ConsolePrompt, ModelRegistry, RefreshOutcome,
    SyncConfig, SyncReport, component_phase, load_models, plan,
};
use modelsync_sqlite::SqliteComponentStore;
use serde::Serialize;
use tracing::Level;

/// CLI-specific output format enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Sql,
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "modelsync")]
#[command(about = "Declarative table models synchronised with a live database")]
struct Cli {
    /// Log debug output to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate one or more model files.
    Validate(ValidateArgs),
    /// Print CREATE TABLE statements for a model file.
    CreateSql(CreateSqlArgs),
    /// Print the DDL that would reconcile live columns with a model file.
    Plan(PlanArgs),
    /// Sync component files with a SQLite database.
    Components(ComponentsArgs),
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Model files (YAML or JSON).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct CreateSqlArgs {
    /// Model file (YAML or JSON).
    model: PathBuf,
}

#[derive(Debug, Args)]
struct PlanArgs {
    /// Model file (YAML or JSON).
    #[arg(long)]
    model: PathBuf,
    /// JSON snapshot of live columns: table name to a list of columns.
    #[arg(long)]
    live: PathBuf,
    /// Output format.
    #[arg(long, default_value = "sql")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct ComponentsArgs {
    /// SQLite database file.
    #[arg(long)]
    db: PathBuf,
    /// Model file (YAML or JSON).
    #[arg(long)]
    model: PathBuf,
    /// Directory holding `<table>.component.json` files.
    #[arg(long)]
    dir: Option<PathBuf>,
    /// Push local components instead of only refreshing them.
    #[arg(long)]
    migrate_components: bool,
    /// Sync configuration file (YAML).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Validate(args) => run_validate(args),
        Command::CreateSql(args) => run_create_sql(args),
        Command::Plan(args) => run_plan(args),
        Command::Components(args) => run_components(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Loads every model file into one registry and returns its models in
/// dependency order.
fn load_ordered(paths: &[PathBuf]) -> Result<Vec<TableModel>, String> {
    let mut registry = ModelRegistry::new();
    for path in paths {
        for model in load_models(path).map_err(|e| format!("{}: {e}", path.display()))? {
            registry.register(model).map_err(|e| e.to_string())?;
        }
    }
    registry.drain().map_err(|e| e.to_string())
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let models = load_ordered(&args.inputs)?;
    println!(
        "Validated {} model file(s) declaring {} table(s).",
        args.inputs.len(),
        models.len()
    );
    Ok(())
}

fn run_create_sql(args: CreateSqlArgs) -> Result<(), String> {
    for model in load_ordered(std::slice::from_ref(&args.model))? {
        println!("{}\n", create_table_sql(&model));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct TablePlan {
    table: String,
    exists: bool,
    actions: Vec<Action>,
}

fn run_plan(args: PlanArgs) -> Result<(), String> {
    let models = load_ordered(std::slice::from_ref(&args.model))?;
    let text = fs::read_to_string(&args.live)
        .map_err(|e| format!("Failed to read live snapshot '{}': {e}", args.live.display()))?;
    let live: HashMap<String, Vec<ColumnSnapshot>> = serde_json::from_str(&text)
        .map_err(|e| format!("Invalid live snapshot '{}': {e}", args.live.display()))?;

    let plans: Vec<TablePlan> = models
        .iter()
        .map(|model| match live.get(model.name()) {
            Some(columns) if !columns.is_empty() => TablePlan {
                table: model.name().to_string(),
                exists: true,
                actions: plan(model, columns),
            },
            _ => TablePlan {
                table: model.name().to_string(),
                exists: false,
                actions: Vec::new(),
            },
        })
        .collect();

    match args.format {
        CliOutputFormat::Json => {
            let json = serde_json::to_string_pretty(&plans).map_err(|e| e.to_string())?;
            println!("{json}");
        }
        CliOutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(&plans).map_err(|e| e.to_string())?;
            print!("{yaml}");
        }
        CliOutputFormat::Sql => {
            for (model, table_plan) in models.iter().zip(&plans) {
                print_sql_plan(model, table_plan);
            }
        }
    }
    Ok(())
}

fn print_sql_plan(model: &TableModel, table_plan: &TablePlan) {
    println!("-- {}", table_plan.table);
    if !table_plan.exists {
        println!("{}\n", create_table_sql(model));
        return;
    }
    if table_plan.actions.is_empty() {
        println!("-- up to date\n");
        return;
    }
    for action in &table_plan.actions {
        if !action.reasons.is_empty() {
            println!("-- {}", action.reasons.join("; "));
        }
        println!("{}", action.sql);
    }
    println!();
}

fn run_components(args: ComponentsArgs) -> Result<(), String> {
    let mut config = match &args.config {
        Some(path) => SyncConfig::load(path)
            .map_err(|e| format!("Failed to load config '{}': {e}", path.display()))?,
        None => SyncConfig::default(),
    };
    if let Some(dir) = args.dir {
        config.components_dir = dir;
    }
    config.migrate_components |= args.migrate_components;

    let models = load_ordered(std::slice::from_ref(&args.model))?;
    let conn = rusqlite::Connection::open(&args.db)
        .map_err(|e| format!("Failed to open database '{}': {e}", args.db.display()))?;
    let store = SqliteComponentStore::new(&conn);
    let mut prompt = ConsolePrompt::stdin();

    for model in &models {
        store
            .ensure_table(model)
            .map_err(|e| format!("Failed to create table '{}': {e}", model.name()))?;

        let Some((cache, outcome)) = component_phase(model, &store, &config, &mut prompt)
            .map_err(|e| e.to_string())?
        else {
            println!("{}: no component file", model.name());
            continue;
        };
        match outcome {
            ComponentOutcome::Synced(report)
            | ComponentOutcome::Refreshed(RefreshOutcome::Pushed(report)) => {
                print_sync_report(model.name(), &report)
            }
            ComponentOutcome::Refreshed(RefreshOutcome::Refreshed) => println!(
                "{}: refreshed {} component(s) from the database",
                model.name(),
                cache.records().len()
            ),
            ComponentOutcome::Refreshed(RefreshOutcome::Discarded) => {
                println!("{}: local components discarded", model.name())
            }
        }
        tracing::debug!(table = model.name(), path = %cache.path().display(), "component file written");
    }
    Ok(())
}

fn print_sync_report(table: &str, report: &SyncReport) {
    println!(
        "{table}: {} inserted, {} deleted, {} failed",
        report.inserted.len(),
        report.deleted.len(),
        report.failures.len()
    );
    for failure in &report.failures {
        println!("  {} {}: {}", failure.action, failure.key, failure.message);
    }
}
