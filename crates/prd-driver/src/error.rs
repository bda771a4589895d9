use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to start driver '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Exit(String),

    #[error("driver timed out after {0}s")]
    Timeout(u64),

    #[error("transcript command failed: {0}")]
    Transcript(String),

    #[error("driver produced an empty transcript")]
    EmptyTranscript,
}
