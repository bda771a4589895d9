use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ChunkStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStatus {
    #[default]
    Pending,
    Running,
    Done,
    Failed,
}

impl ChunkStatus {
    pub fn all() -> &'static [ChunkStatus] {
        &[
            ChunkStatus::Pending,
            ChunkStatus::Running,
            ChunkStatus::Done,
            ChunkStatus::Failed,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChunkStatus::Pending => "pending",
            ChunkStatus::Running => "running",
            ChunkStatus::Done => "done",
            ChunkStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ChunkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChunkStatus {
    type Err = crate::error::PrdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ChunkStatus::Pending),
            "running" => Ok(ChunkStatus::Running),
            "done" => Ok(ChunkStatus::Done),
            "failed" => Ok(ChunkStatus::Failed),
            _ => Err(crate::error::PrdError::InvalidConfig(format!(
                "unknown chunk status '{s}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// InvariantMode
// ---------------------------------------------------------------------------

/// What a pass does when a chunk's bounds no longer fit the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvariantMode {
    /// Abort the whole pass.
    #[default]
    Strict,
    /// Fail the offending chunk and continue with the next one.
    Lenient,
}

impl fmt::Display for InvariantMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InvariantMode::Strict => "strict",
            InvariantMode::Lenient => "lenient",
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
