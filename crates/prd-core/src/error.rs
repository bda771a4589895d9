use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrdError {
    #[error("no state found: run 'prd init'")]
    StateNotFound,

    #[error("state file {path} is corrupt: {reason}")]
    CorruptState { path: PathBuf, reason: String },

    #[error("state file is unreadable; back it up with 'prd reset' instead of repairing it")]
    UnrepairableState,

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("document not found: {0}")]
    DocumentNotFound(PathBuf),

    #[error("chunk not found: {0}")]
    UnknownChunk(u32),

    #[error(
        "invariant violation: chunk {chunk_id} spans lines {start_line}-{end_line} \
         but the document has {total_lines} lines"
    )]
    InvariantViolation {
        chunk_id: u32,
        start_line: usize,
        end_line: usize,
        total_lines: usize,
    },

    #[error("chunk map does not cover the document: {0}")]
    Coverage(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PrdError>;
