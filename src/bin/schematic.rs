//! Schematic CLI
//!
//! Command-line interface for validating JSON payloads against declarative
//! schema definitions.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use schematic::{
    lint, load_definition_auto, load_payload, FileStatus, Schema, Schematic, Severity, Value,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schematic")]
#[command(about = "Validate JSON payloads against schema definitions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a payload against a definition
    Validate {
        /// Payload file to validate
        payload: PathBuf,

        /// Definition source: file path or URL (http:// or https://)
        #[arg(long, short)]
        schema: String,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Validate a payload and print the parsed output (defaults applied, unknown keys stripped)
    Parse {
        /// Payload file to parse
        payload: PathBuf,

        /// Definition source: file path or URL (http:// or https://)
        #[arg(long, short)]
        schema: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Lint definition files for errors (syntax, invalid definitions, suspicious constructs)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate {
            payload,
            schema,
            json,
        } => run_validate(&payload, &schema, json),

        Commands::Parse {
            payload,
            schema,
            output,
            pretty,
        } => run_parse(&payload, &schema, output, pretty),

        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, &format, strict, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Load the payload and compile the definition, reporting failures in the requested format.
fn prepare(payload_path: &Path, schema_source: &str, json_output: bool) -> Result<(Value, Schema), u8> {
    let payload = load_payload(payload_path).map_err(|e| {
        report_error(json_output, &format!("loading payload: {}", e));
        e.exit_code() as u8
    })?;

    let schema = load_definition_auto(schema_source)
        .and_then(|definition| definition.compile())
        .map_err(|e| {
            report_error(json_output, &format!("loading schema: {}", e));
            e.exit_code() as u8
        })?;

    Ok((payload, schema))
}

fn run_validate(payload_path: &Path, schema_source: &str, json_output: bool) -> Result<(), u8> {
    let (payload, schema) = prepare(payload_path, schema_source, json_output)?;

    let outcome = schema.safe_parse(payload);
    if outcome.is_valid() {
        if json_output {
            println!(r#"{{"valid":true}}"#);
        } else {
            println!("Valid");
        }
        return Ok(());
    }

    if json_output {
        let output = serde_json::json!({
            "valid": false,
            "errors": outcome.errors()
        });
        println!("{}", output);
    } else {
        eprintln!("Validation failed:");
        for error in outcome.errors() {
            eprintln!("  {}", error);
        }
    }
    Err(1)
}

fn run_parse(
    payload_path: &Path,
    schema_source: &str,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let (payload, schema) = prepare(payload_path, schema_source, false)?;

    let parsed = schema.parse(payload).map_err(|err| {
        eprintln!("Validation failed:");
        for error in &err.errors {
            eprintln!("  {}", error);
        }
        1u8
    })?;

    let rendered = if pretty {
        serde_json::to_string_pretty(&parsed)
    } else {
        serde_json::to_string(&parsed)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &rendered).map_err(|e| {
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

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", serde_json::json!({ "valid": false, "error": msg }));
    } else {
        eprintln!("Error: {}", msg);
    }
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, strict);
    let passed = result.is_ok() && (!strict || result.warnings == 0);

    if format == "json" {
        let rendered = serde_json::to_string_pretty(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", rendered);
    } else {
        if !quiet {
            println!("Linting {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || file_result.status != FileStatus::Ok {
                println!("  {} {}", status_icon, file_result.file.display());
            }

            for diag in &file_result.diagnostics {
                let (color, label) = match diag.severity {
                    Severity::Error => ("\x1b[31m", "error"),
                    Severity::Warning => ("\x1b[33m", "warning"),
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}[{}]\x1b[0m: {} - {}",
                        color, label, diag.code, diag.path, diag.message
                    );
                }
            }
        }

        println!();
        if passed {
            println!(
                "\x1b[32m✓ {} files checked, all passed\x1b[0m",
                result.files_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if passed {
        Ok(())
    } else {
        Err(1)
    }
}
