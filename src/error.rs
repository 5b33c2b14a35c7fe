use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Repair(#[from] RepairError),
    #[error("payload invalid: {0}")]
    Payload(String),
    #[error("store is locked by another run: {0}")]
    StoreLocked(String),
    #[error("config file invalid or unreadable: {0}")]
    InvalidConfig(String),
}

/// A payload the salvage repairer could not turn into valid JSON.
///
/// Location fields describe the *original* parse failure, not the failure of
/// the patched text, so the diagnostic points at the offending input.
#[derive(Debug, Clone, Error)]
#[error(
    "unrecoverable JSON ({reason}) at line {line} column {column} (byte {offset}); near: {excerpt:?}"
)]
pub struct RepairError {
    pub reason: String,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
    pub excerpt: String,
}

/// Why a single raw record was rejected. Never fatal for the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
    #[error("content is empty after cleaning")]
    EmptyContent,
}

/// Fallible pipeline stages named in error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Repair,
    Persist,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Repair => "repair",
            Self::Persist => "persist",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stage={}", self.as_str())
    }
}
