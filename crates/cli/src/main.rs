// Deal sheet CLI - normalize a fee-split export into the upload schema

mod exit_codes;
mod normalize;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dealsheet_io::TableError;
use dealsheet_normalize::NormalizeError;
use exit_codes::{normalize_exit_code, EXIT_ERROR, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "dealsheet")]
#[command(about = "Normalize deal split exports into the upload schema")]
#[command(version)]
struct Cli {
    /// Only log warnings and errors
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a source export and write the upload-ready CSV
    #[command(after_help = "\
Examples:
  dealsheet run --source deals.csv --reference agents.csv --target-example upload.csv
  dealsheet run --source deals.csv --reference agents.csv --target-example upload.csv --json
  dealsheet run --source deals.csv --reference agents.csv --target-example upload.csv \\
      --config custom.normalize.toml --output out.csv")]
    Run {
        /// Deal split export (one row per agent per deal)
        #[arg(long)]
        source: PathBuf,

        /// Agent directory with a name column and an email column
        #[arg(long)]
        reference: PathBuf,

        /// Example file whose first line is the target header
        #[arg(long)]
        target_example: PathBuf,

        /// Normalization config TOML (defaults to the built-in profile)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output CSV path (default: "<config name> <YYYY-MM-DD>.csv")
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Print the run report as JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Validate a normalization config without running
    #[command(after_help = "\
Examples:
  dealsheet validate
  dealsheet validate custom.normalize.toml")]
    Validate {
        /// Config TOML (built-in profile when omitted)
        config: Option<PathBuf>,
    },

    /// Print the target schema after header rules, one field per line
    Schema {
        /// Example file whose first line is the target header
        #[arg(long)]
        target_example: PathBuf,

        /// Normalization config TOML (defaults to the built-in profile)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_IO, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<TableError> for CliError {
    fn from(err: TableError) -> Self {
        Self::io(err.to_string())
    }
}

impl From<NormalizeError> for CliError {
    fn from(err: NormalizeError) -> Self {
        let hint = match &err {
            NormalizeError::MissingColumn { dataset, .. } if dataset == "source" => {
                Some("add the export's column name to the [source] aliases in a --config file")
            }
            NormalizeError::MissingColumn { .. } => {
                Some("the reference file needs one header containing \"name\" and one containing \"email\"")
            }
            NormalizeError::EmptySchema => Some("the first line of --target-example must list the upload fields"),
            _ => None,
        };
        Self {
            code: normalize_exit_code(&err),
            message: err.to_string(),
            hint: hint.map(String::from),
        }
    }
}

fn init_logging(quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // Also installs the `log` bridge, so engine records show up here.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.quiet);

    let result = match cli.command {
        Commands::Run {
            source,
            reference,
            target_example,
            config,
            output,
            json,
        } => normalize::cmd_run(normalize::RunArgs {
            source,
            reference,
            target_example,
            config,
            output,
            json,
        }),
        Commands::Validate { config } => normalize::cmd_validate(config),
        Commands::Schema { target_example, config } => normalize::cmd_schema(target_example, config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}
