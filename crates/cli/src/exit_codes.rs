//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success (including "awaiting input" hints)           |
//! | 1    | General error (unspecified)                          |
//! | 2    | CLI usage error (bad args)                           |
//! | 3    | Input file cannot be read as a table                 |
//! | 4    | A table lacks every column the operation needs       |
//! | 5    | Output file (table or map) could not be written      |
//! | 6    | Map requested but no row has coordinates             |
//! | 7    | Profile cannot be read, parsed or validated          |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `engine_exit_code` or the relevant `CliError` constructor

use sabana_engine::SabanaError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Input file missing, unsupported or not a table.
pub const EXIT_UNREADABLE: u8 = 3;

/// Cross-reference on a table without the needed columns.
pub const EXIT_MISSING_COLUMN: u8 = 4;

/// `--out` or `--map` could not be written.
pub const EXIT_WRITE: u8 = 5;

/// `--map` with a result set that has no coordinates.
pub const EXIT_NO_COORDINATES: u8 = 6;

/// `--profile` unreadable or invalid.
pub const EXIT_PROFILE: u8 = 7;

/// Map an engine error to its exit code.
pub fn engine_exit_code(err: &SabanaError) -> u8 {
    match err {
        SabanaError::Unreadable { .. } => EXIT_UNREADABLE,
        SabanaError::MissingColumn { .. } => EXIT_MISSING_COLUMN,
        SabanaError::ProfileParse(_) | SabanaError::ProfileValidation(_) => EXIT_PROFILE,
        SabanaError::NoTable => EXIT_ERROR,
    }
}
