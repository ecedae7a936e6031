use thiserror::Error;

#[derive(Debug, Error)]
pub enum NormalizeError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (duplicate mapping target, empty alias list, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// A required column could not be resolved in an input dataset.
    #[error(
        "{dataset}: could not find {column} column (tried {}); available columns: {}",
        quoted(.tried),
        quoted(.available)
    )]
    MissingColumn {
        dataset: String,
        column: String,
        tried: Vec<String>,
        available: Vec<String>,
    },
    /// The target schema example had no usable header line.
    #[error("target schema example has no field names")]
    EmptySchema,
}

fn quoted(names: &[String]) -> String {
    if names.is_empty() {
        return "none".into();
    }
    names
        .iter()
        .map(|n| format!("\"{n}\""))
        .collect::<Vec<_>>()
        .join(", ")
}
