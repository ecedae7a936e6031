//! `dealsheet run|validate|schema`: file loading around the normalization engine.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};

use dealsheet_io::csv::{export, import, read_file_as_utf8, read_header_line};
use dealsheet_normalize::schema::TargetSchema;
use dealsheet_normalize::{NormalizeConfig, NormalizeInput};

use crate::exit_codes::EXIT_INVALID_CONFIG;
use crate::CliError;

pub struct RunArgs {
    pub source: PathBuf,
    pub reference: PathBuf,
    pub target_example: PathBuf,
    pub config: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub json: bool,
}

/// Built-in profile, or the TOML at `path`.
fn load_config(path: Option<&Path>) -> Result<NormalizeConfig, CliError> {
    let Some(path) = path else {
        return Ok(NormalizeConfig::builtin()?);
    };
    log::debug!("loading config {}", path.display());
    let config_str = read_file_as_utf8(path)?;
    NormalizeConfig::from_toml(&config_str)
        .map_err(|e| CliError::new(EXIT_INVALID_CONFIG, format!("{}: {e}", path.display())))
}

/// `{config name} {YYYY-MM-DD}.csv`
pub fn default_output_name(config_name: &str, date: NaiveDate) -> PathBuf {
    PathBuf::from(format!("{} {}.csv", config_name, date.format("%Y-%m-%d")))
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;

    let output = args
        .output
        .unwrap_or_else(|| default_output_name(&config.name, Local::now().date_naive()));
    if output.is_dir() {
        return Err(CliError::usage(format!("output path {} is a directory", output.display()))
            .with_hint("pass a file name to --output"));
    }

    let input = NormalizeInput {
        source: import(&args.source)?,
        reference: import(&args.reference)?,
        target_header: read_header_line(&args.target_example)?,
    };

    let result = dealsheet_normalize::run(&config, &input)?;

    // Nothing is written until the engine has succeeded.
    export(&output, &result.table.headers, &result.table.rendered_rows())?;

    if args.json {
        let json_str = serde_json::to_string_pretty(&result.report)
            .map_err(|e| CliError::internal(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    // Human summary to stderr
    let r = &result.report;
    eprintln!(
        "{}: {} records loaded, {} incomplete, {} duplicates, {} written",
        r.config_name, r.loaded, r.incomplete_removed, r.duplicates_removed, r.output_rows,
    );
    if !r.agent_names_unmapped.is_empty() {
        eprintln!("unmapped agents: {}", r.agent_names_unmapped.join(", "));
    }
    eprintln!("wrote {}", output.display());

    Ok(())
}

pub fn cmd_validate(config_path: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(config_path.as_deref())?;
    eprintln!(
        "valid: '{}' with {} column mapping(s), {} header rule(s), {} text replacement(s)",
        config.name,
        config.columns.pairs().len(),
        config.schema.rules.len(),
        config.text.replace.len(),
    );
    Ok(())
}

pub fn cmd_schema(target_example: PathBuf, config_path: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(config_path.as_deref())?;
    let header = read_header_line(&target_example)?;
    let schema = TargetSchema::from_header(header, &config.schema.rules)?;
    for field in schema.fields() {
        println!("{field}");
    }
    Ok(())
}
