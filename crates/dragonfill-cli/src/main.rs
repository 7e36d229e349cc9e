mod registry;

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use dragonfill_core::{
    BusinessConfig, ConfigError, ReferenceCatalogs, ValidationReport, validate_catalogs,
    validate_config,
};
use dragonfill_generate::{GenerateOptions, GenerationEngine, GenerationError};
use registry::{RunContext, init_run_logging, init_stderr_logging, start_run, write_json};
use schemars::schema_for;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "dragonfill", version, about = "Synthetic data for a board game shop")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate the dataset into a new run directory.
    Generate(GenerateArgs),
    /// Validate business parameters and catalogs without generating.
    Check(InputArgs),
    /// Print the JSON schema of the business parameter file.
    Schema(SchemaArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Business parameter file (TOML). Built-in defaults when omitted.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Directory with catalog CSV files. Bundled catalogs when omitted.
    #[arg(long, value_name = "DIR")]
    catalogs: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Seed of every random stream.
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Overrides `shop.end_date` (YYYY-MM-DD).
    #[arg(long, value_name = "DATE")]
    end_date: Option<NaiveDate>,
    /// Output directory for runs.
    #[arg(long, default_value = "runs")]
    out: PathBuf,
    /// Skip the dataset checks after assembly.
    #[arg(long, default_value_t = false)]
    no_checks: bool,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Write the schema to a file instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Check(args) => run_check(args),
        Command::Schema(args) => run_schema(args),
    }
}

fn run_generate(args: GenerateArgs) -> Result<(), CliError> {
    let GenerateArgs {
        input,
        seed,
        end_date,
        out,
        no_checks,
    } = args;

    let mut config = load_config(input.config.as_deref())?;
    if let Some(end_date) = end_date {
        config.shop.end_date = end_date;
    }
    let catalogs = load_catalogs(input.catalogs.as_deref())?;

    let run_ctx = RunContext {
        run_id: Uuid::new_v4().to_string(),
        started_at: chrono::Utc::now(),
        out_dir: out.clone(),
        seed,
        verify: !no_checks,
        config_path: input.config,
        catalogs_dir: input.catalogs,
        config,
    };
    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path)?;

    tracing::info!(event = "run_started", run_id = %run_ctx.run_id, seed);
    tracing::info!(event = "config_written", path = %run_paths.config_path.display());
    let timer = Instant::now();

    let engine = GenerationEngine::new(GenerateOptions {
        out_dir: out,
        seed,
        verify: !no_checks,
        ..GenerateOptions::default()
    });
    let report = match engine.run_in(
        &run_paths.run_root,
        &run_ctx.run_id,
        &run_ctx.config,
        &catalogs,
    ) {
        Ok(report) => report,
        Err(err) => {
            tracing::error!(event = "run_finished", status = "failed", error = %err);
            return Err(err.into());
        }
    };

    for table in &report.tables {
        tracing::info!(event = "table_written", table = %table.table, rows = table.rows);
    }
    tracing::info!(
        event = "run_finished",
        status = "success",
        duration_ms = timer.elapsed().as_millis() as u64,
        dropped_rental_visits = report.dropped_rental_visits,
        warnings = report.warnings.len()
    );

    println!("run_dir={}", run_paths.run_root.display());
    Ok(())
}

fn run_check(args: InputArgs) -> Result<(), CliError> {
    init_stderr_logging()?;

    let config = match args.config.as_deref() {
        Some(path) => BusinessConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => BusinessConfig::default(),
    };
    let catalogs = load_catalogs(args.catalogs.as_deref())?;

    let mut report = validate_config(&config);
    report.merge(validate_catalogs(&catalogs, &config));
    print_report(&report);

    if report.is_ok() {
        println!(
            "ok: {} errors, {} warnings",
            report.errors.len(),
            report.warnings.len()
        );
        Ok(())
    } else {
        Err(ConfigError::Invalid(report).into())
    }
}

fn run_schema(args: SchemaArgs) -> Result<(), CliError> {
    let schema = schema_for!(BusinessConfig);
    match args.out {
        Some(path) => write_json(&path, &schema)?,
        None => println!("{}", serde_json::to_string_pretty(&schema)?),
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<BusinessConfig, ConfigError> {
    match path {
        Some(path) => BusinessConfig::load(path),
        None => Ok(BusinessConfig::default()),
    }
}

fn load_catalogs(dir: Option<&Path>) -> Result<ReferenceCatalogs, ConfigError> {
    match dir {
        Some(dir) => ReferenceCatalogs::load(dir),
        None => ReferenceCatalogs::bundled(),
    }
}

fn print_report(report: &ValidationReport) {
    for issue in &report.errors {
        println!("error: {issue}");
    }
    for issue in &report.warnings {
        println!("warning: {issue}");
    }
}
