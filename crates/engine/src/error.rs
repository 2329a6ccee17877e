use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum SabanaError {
    /// A table lacks every column an operation needs.
    MissingColumn { table: String, column: String },
    /// Input could not be read as a table at all.
    Unreadable { name: String, reason: String },
    /// An interaction needs a primary table and none is loaded.
    NoTable,
    /// TOML parse / deserialization error in an analysis profile.
    ProfileParse(String),
    /// Profile values out of range.
    ProfileValidation(String),
}

impl fmt::Display for SabanaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingColumn { table, column } => {
                write!(f, "{table} table: missing column '{column}'")
            }
            Self::Unreadable { name, reason } => {
                write!(f, "cannot read '{name}' as a table: {reason}")
            }
            Self::NoTable => write!(f, "no table loaded"),
            Self::ProfileParse(msg) => write!(f, "profile parse error: {msg}"),
            Self::ProfileValidation(msg) => write!(f, "profile validation error: {msg}"),
        }
    }
}

impl std::error::Error for SabanaError {}
