//! OpenAPI Components CLI
//!
//! Dereference and convert JSON Schemas, or build `components.schemas` from
//! the models declared in a service configuration.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use oas_components::{
    convert, load_schema, DefaultFetcher, ModelCatalog, ResolverOptions, SchemaEngine,
    SchemaSource, DEFAULT_MAX_REPAIR_PASSES,
};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "oas-components")]
#[command(about = "Build OpenAPI components from JSON Schema models")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every $ref in a schema into one self-contained tree
    Dereference {
        /// Schema source: file path or URL (http:// or https://)
        schema: String,

        #[command(flatten)]
        fetch: FetchArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Dereference a schema and convert it into named OpenAPI schemas
    Convert {
        /// Schema source: file path or URL (http:// or https://)
        schema: String,

        /// Component name for the top-level schema
        #[arg(long, short)]
        name: String,

        #[command(flatten)]
        fetch: FetchArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Register every model of a service configuration (JSON or YAML)
    Components {
        /// Service configuration file
        config: PathBuf,

        /// Report failed models and keep going instead of aborting
        #[arg(long)]
        continue_on_error: bool,

        #[command(flatten)]
        fetch: FetchArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args)]
struct FetchArgs {
    /// Local directory containing schema files
    #[arg(long)]
    schema_local_base: Option<PathBuf>,

    /// URL prefix to strip when mapping to local (e.g., https://schemas.example.com/v1)
    #[arg(long, requires = "schema_local_base")]
    schema_remote_base: Option<String>,

    /// Upper bound on self-reference repair passes
    #[arg(long, default_value_t = DEFAULT_MAX_REPAIR_PASSES)]
    max_repair_passes: usize,
}

impl FetchArgs {
    fn fetcher(&self) -> DefaultFetcher {
        match (&self.schema_remote_base, &self.schema_local_base) {
            (Some(remote), Some(local)) => DefaultFetcher::with_url_mapping(remote.clone(), local),
            _ => DefaultFetcher::new(),
        }
    }

    fn engine(&self, base_dir: &Path) -> SchemaEngine {
        SchemaEngine::with_fetcher(self.fetcher()).with_options(
            ResolverOptions::new()
                .base_dir(base_dir)
                .max_repair_passes(self.max_repair_passes),
        )
    }
}

#[derive(Args)]
struct OutputArgs {
    /// Output file (stdout if not specified)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Dereference {
            schema,
            fetch,
            output,
        } => run_dereference(&schema, &fetch, &output),
        Commands::Convert {
            schema,
            name,
            fetch,
            output,
        } => run_convert(&schema, &name, &fetch, &output),
        Commands::Components {
            config,
            continue_on_error,
            fetch,
            output,
        } => run_components(&config, continue_on_error, &fetch, &output),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn dereference_source(schema: &str, fetch: &FetchArgs) -> Result<Value, u8> {
    let source = SchemaSource::parse(schema).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    fetch
        .engine(Path::new("."))
        .dereference(&source)
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })
}

fn run_dereference(schema: &str, fetch: &FetchArgs, output: &OutputArgs) -> Result<(), u8> {
    let dereferenced = dereference_source(schema, fetch)?;
    write_output(&dereferenced, output)
}

fn run_convert(schema: &str, name: &str, fetch: &FetchArgs, output: &OutputArgs) -> Result<(), u8> {
    let dereferenced = dereference_source(schema, fetch)?;
    let converted = convert(&dereferenced, name).map_err(|e| {
        eprintln!("Error: {}", e);
        2u8
    })?;

    let value = serde_json::to_value(&converted).map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    write_output(&value, output)
}

fn run_components(
    config_path: &Path,
    continue_on_error: bool,
    fetch: &FetchArgs,
    output: &OutputArgs,
) -> Result<(), u8> {
    let config = load_schema(config_path).map_err(|e| {
        eprintln!("Error loading {}: {}", config_path.display(), e);
        e.exit_code() as u8
    })?;

    let catalog = ModelCatalog::from_service(&config).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    // Relative schema paths in the configuration are relative to the file itself.
    let base_dir = config_path.parent().unwrap_or(Path::new("."));
    let mut engine = fetch.engine(base_dir);

    let mut failed = 0;
    for model in &catalog {
        if let Err(e) = engine.add_model(model) {
            eprintln!("Error: {}", e);
            if !continue_on_error {
                return Err(e.exit_code() as u8);
            }
            failed += 1;
        }
    }

    if failed > 0 {
        eprintln!(
            "Warning: {} of {} models skipped due to errors",
            failed,
            catalog.len()
        );
    }

    let document = json!({
        "components": {
            "schemas": engine.registry().to_value()
        }
    });
    write_output(&document, output)
}

fn write_output(value: &Value, output: &OutputArgs) -> Result<(), u8> {
    let rendered = if output.pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match &output.output {
        Some(path) => {
            std::fs::write(path, &rendered).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", rendered);
        }
    }

    Ok(())
}
