//! Thin CLI: validate one JSON document against a compiled schema.
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use json_tyck::{validate_str, Repository, SchemaRepository, ValidationError};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// validate a JSON value against a compiled schema document
#[derive(Parser, Debug)]
#[command(version)]
pub struct CommandLineInterface {
    /// root type to validate against (defaults to the schema's root)
    #[arg(long = "type", value_name = "NAME")]
    type_name: Option<String>,

    /// diagnostic output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// log at debug level (otherwise RUST_LOG, or warn)
    #[arg(short, long)]
    verbose: bool,

    /// JSON literal, or a path to a JSON file
    json: String,

    /// compiled schema document
    schema: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// 0 when valid, 1 when there are diagnostics, 2 when the schema or input
    /// could not be loaded.
    pub fn run(&self) -> ExitCode {
        init_tracing(self.verbose);
        let errors = match self.execute() {
            Ok(errors) => errors,
            Err(error) => {
                eprintln!("{} {error:#}", "error:".red().bold());
                return ExitCode::from(2);
            }
        };
        if let Err(error) = self.report(&errors) {
            eprintln!("{} {error:#}", "error:".red().bold());
            return ExitCode::from(2);
        }
        if errors.is_empty() { ExitCode::SUCCESS } else { ExitCode::from(1) }
    }

    fn execute(&self) -> Result<Vec<ValidationError>> {
        let repo = SchemaRepository::from_path(&self.schema)
            .with_context(|| format!("failed to load schema {}", self.schema.display()))?;
        let root = repo
            .resolve_root_type(self.type_name.as_deref())
            .context("failed to resolve root type")?;
        let input = load_input(&self.json)?;
        Ok(validate_str(&input, &repo, Some(root.as_str())))
    }

    fn report(&self, errors: &[ValidationError]) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(errors)?);
            }
            OutputFormat::Text if errors.is_empty() => {
                println!("{}", "valid".green());
            }
            OutputFormat::Text => {
                for error in errors {
                    println!(
                        "{}: {} {}",
                        error.path.red(),
                        error.message,
                        format!("[{}]", error.code).dimmed(),
                    );
                }
            }
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// A path to an existing file is read; anything else is taken as JSON text.
fn load_input(arg: &str) -> Result<String> {
    let path = Path::new(arg);
    if path.is_file() {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read JSON input {}", path.display()))
    } else {
        Ok(arg.to_string())
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
