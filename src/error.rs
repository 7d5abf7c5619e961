use std::path::PathBuf;

/// Run-level failures. Per-line parse misses never show up here; they are
/// counted inside the aggregation loop and only surface as `BudgetExceeded`.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("Failed to read log directory '{}': {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open log file '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read line {line_number} of the log: {source}")]
    Read {
        line_number: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("Line {line_number} is not valid UTF-8: {line}")]
    Decode { line_number: u64, line: String },

    #[error("{not_parsed} of {processed} lines were not parsed, above the {limit}% limit")]
    BudgetExceeded {
        not_parsed: u64,
        processed: u64,
        limit: f64,
    },

    #[error("No line of the log could be parsed")]
    NothingParsed,

    #[error("Failed to render report '{}': {reason}", path.display())]
    Render { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
