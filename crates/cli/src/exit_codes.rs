//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | Usage error (bad args, output path is a directory)   |
//! | 3    | Input file unreadable or malformed                   |
//! | 4    | Input schema error (required column, empty header)   |
//! | 5    | Invalid normalization config                         |

use dealsheet_normalize::NormalizeError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
/// clap exits with this code on its own parse failures.
pub const EXIT_USAGE: u8 = 2;

/// An input or output file could not be read, parsed or written.
pub const EXIT_IO: u8 = 3;

/// A required column is missing from the source or reference file, or the
/// target example has no field names.
pub const EXIT_INPUT_SCHEMA: u8 = 4;

/// Config TOML failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 5;

/// Map an engine error to its exit code.
pub fn normalize_exit_code(err: &NormalizeError) -> u8 {
    match err {
        NormalizeError::ConfigParse(_) | NormalizeError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        NormalizeError::MissingColumn { .. } | NormalizeError::EmptySchema => EXIT_INPUT_SCHEMA,
    }
}
