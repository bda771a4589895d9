use crate::chunk_map;
use crate::engine::PassStats;
use crate::error::{PrdError, Result};
use crate::types::ChunkStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// A contiguous, 1-indexed inclusive line range of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: u32,
    pub phase_id: String,
    pub start_line: usize,
    pub end_line: usize,
    #[serde(default)]
    pub status: ChunkStatus,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<DateTime<Utc>>,
}

impl Chunk {
    pub fn fits(&self, total_lines: usize) -> bool {
        self.start_line >= 1 && self.start_line <= self.end_line && self.end_line <= total_lines
    }

    pub fn mark_running(&mut self) {
        self.status = ChunkStatus::Running;
        self.attempts += 1;
        self.last_updated_at = Some(Utc::now());
    }

    pub fn mark_done(&mut self) {
        self.status = ChunkStatus::Done;
        self.last_error = None;
        self.last_updated_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = ChunkStatus::Failed;
        self.last_error = Some(error.into());
        self.last_updated_at = Some(Utc::now());
    }

    /// Move both bounds by `delta` lines.
    pub fn shift(&mut self, delta: isize) {
        self.start_line = self.start_line.saturating_add_signed(delta);
        self.end_line = self.end_line.saturating_add_signed(delta);
    }
}

// ---------------------------------------------------------------------------
// GrowthMeta / StatusCounts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrowthMeta {
    #[serde(default)]
    pub current_pass: u32,
    #[serde(default)]
    pub total_passes_run: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_pass: Option<PassStats>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub running: usize,
    pub done: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.running + self.done + self.failed
    }

    pub fn get(&self, status: ChunkStatus) -> usize {
        match status {
            ChunkStatus::Pending => self.pending,
            ChunkStatus::Running => self.running,
            ChunkStatus::Done => self.done,
            ChunkStatus::Failed => self.failed,
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    #[serde(default = "default_version")]
    pub version: u32,
    pub document: String,
    pub total_lines: usize,
    pub chunk_size: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub growth: GrowthMeta,
    pub chunks: Vec<Chunk>,
}

fn default_version() -> u32 {
    1
}

impl State {
    /// Build a fresh state for `lines`, every chunk pending.
    pub fn build(
        document: impl Into<String>,
        lines: &[String],
        chunk_size: usize,
        pass: u32,
    ) -> Result<Self> {
        let chunks = chunk_map::build_chunks(lines, chunk_size, pass)?;
        let now = Utc::now();
        Ok(Self {
            version: 1,
            document: document.into(),
            total_lines: lines.len(),
            chunk_size,
            created_at: now,
            updated_at: now,
            growth: GrowthMeta {
                current_pass: pass,
                ..GrowthMeta::default()
            },
            chunks,
        })
    }

    /// Rebuild the chunk map over the current document, keeping growth
    /// bookkeeping and the original creation time.
    pub fn rebuild(&mut self, lines: &[String], pass: u32) -> Result<()> {
        self.chunks = chunk_map::build_chunks(lines, self.chunk_size, pass)?;
        self.total_lines = lines.len();
        self.growth.current_pass = pass;
        self.updated_at = Utc::now();
        Ok(())
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PrdError::StateNotFound);
        }
        let data = std::fs::read_to_string(path)?;
        let state: State = serde_json::from_str(&data).map_err(|e| PrdError::CorruptState {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if state.chunk_size == 0 {
            return Err(PrdError::CorruptState {
                path: path.to_path_buf(),
                reason: "chunk_size is 0".to_string(),
            });
        }
        state
            .check_coverage(state.total_lines)
            .map_err(|e| PrdError::CorruptState {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(state)
    }

    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.updated_at = Utc::now();
        let data = serde_json::to_string_pretty(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    // ---------------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------------

    /// The recorded line count no longer matches the document on disk.
    pub fn is_stale(&self, actual_lines: usize) -> bool {
        self.total_lines != actual_lines
    }

    pub fn chunk(&self, id: u32) -> Option<&Chunk> {
        self.chunks.iter().find(|c| c.id == id)
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for chunk in &self.chunks {
            match chunk.status {
                ChunkStatus::Pending => counts.pending += 1,
                ChunkStatus::Running => counts.running += 1,
                ChunkStatus::Done => counts.done += 1,
                ChunkStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    pub fn failed(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks
            .iter()
            .filter(|c| c.status == ChunkStatus::Failed)
    }

    /// Ids to process next: all pending chunks, or the failed ones when
    /// nothing is pending. Ascending by id.
    pub fn eligible_ids(&self) -> Vec<u32> {
        let with_status = |status: ChunkStatus| -> Vec<u32> {
            let mut ids: Vec<u32> = self
                .chunks
                .iter()
                .filter(|c| c.status == status)
                .map(|c| c.id)
                .collect();
            ids.sort_unstable();
            ids
        };
        let pending = with_status(ChunkStatus::Pending);
        if pending.is_empty() {
            with_status(ChunkStatus::Failed)
        } else {
            pending
        }
    }

    /// Verify that the chunks partition `[1, total_lines]` in id order.
    pub fn check_coverage(&self, total_lines: usize) -> Result<()> {
        let mut expected_start = 1usize;
        for (idx, chunk) in self.chunks.iter().enumerate() {
            let expected_id = idx as u32 + 1;
            if chunk.id != expected_id {
                return Err(PrdError::Coverage(format!(
                    "expected chunk id {expected_id}, found {}",
                    chunk.id
                )));
            }
            if chunk.start_line > chunk.end_line {
                return Err(PrdError::Coverage(format!(
                    "chunk {} has start {} after end {}",
                    chunk.id, chunk.start_line, chunk.end_line
                )));
            }
            if chunk.start_line > expected_start {
                return Err(PrdError::Coverage(format!(
                    "gap before chunk {}: lines {}-{} are unassigned",
                    chunk.id,
                    expected_start,
                    chunk.start_line - 1
                )));
            }
            if chunk.start_line < expected_start {
                return Err(PrdError::Coverage(format!(
                    "chunk {} overlaps its predecessor at line {}",
                    chunk.id, chunk.start_line
                )));
            }
            if chunk.end_line > total_lines {
                return Err(PrdError::Coverage(format!(
                    "chunk {} ends at line {} past the document end {}",
                    chunk.id, chunk.end_line, total_lines
                )));
            }
            expected_start = chunk.end_line + 1;
        }
        if expected_start != total_lines + 1 {
            return Err(PrdError::Coverage(format!(
                "lines {}-{} are not covered by any chunk",
                expected_start, total_lines
            )));
        }
        Ok(())
    }

    // ---------------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------------

    /// Return chunks left `running` by an interrupted run to `pending`.
    pub fn reset_running(&mut self) -> usize {
        let mut n = 0;
        for chunk in &mut self.chunks {
            if chunk.status == ChunkStatus::Running {
                chunk.status = ChunkStatus::Pending;
                chunk.last_updated_at = Some(Utc::now());
                n += 1;
            }
        }
        n
    }

    /// Mark the given chunks pending again with a clean slate.
    /// Fails without changing anything if any id is unknown.
    pub fn retry(&mut self, ids: &[u32]) -> Result<()> {
        if let Some(missing) = ids.iter().find(|id| self.chunk(**id).is_none()) {
            return Err(PrdError::UnknownChunk(*missing));
        }
        let now = Utc::now();
        for chunk in self.chunks.iter_mut().filter(|c| ids.contains(&c.id)) {
            chunk.status = ChunkStatus::Pending;
            chunk.last_error = None;
            chunk.attempts = 0;
            chunk.last_updated_at = Some(now);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

/// Where the pass engine persists state after every chunk mutation.
pub trait StateStore {
    fn load(&self) -> Result<State>;
    fn save(&mut self, state: &mut State) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> Result<State> {
        State::load(&self.path)
    }

    fn save(&mut self, state: &mut State) -> Result<()> {
        state.save(&self.path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn doc(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("line {i}")).collect()
    }

    #[test]
    fn build_covers_document() {
        let lines = doc(10);
        let state = State::build("prd.md", &lines, 3, 1).unwrap();
        assert_eq!(state.total_lines, 10);
        assert_eq!(state.chunks.len(), 4);
        state.check_coverage(10).unwrap();
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".prd/state.json");
        let mut state = State::build("prd.md", &doc(7), 3, 1).unwrap();
        state.chunks[1].mark_failed("ratio 0.50 < min 0.90");
        state.save(&path).unwrap();

        let loaded = State::load(&path).unwrap();
        assert_eq!(loaded.chunks, state.chunks);
        assert_eq!(loaded.total_lines, 7);
        assert_eq!(loaded.chunk_size, 3);
    }

    #[test]
    fn load_missing_is_state_not_found() {
        let dir = TempDir::new().unwrap();
        let err = State::load(&dir.path().join("state.json")).unwrap_err();
        assert!(matches!(err, PrdError::StateNotFound));
    }

    #[test]
    fn load_garbage_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = State::load(&path).unwrap_err();
        assert!(matches!(err, PrdError::CorruptState { .. }));
    }

    #[test]
    fn load_unknown_status_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let mut state = State::build("prd.md", &doc(3), 3, 1).unwrap();
        state.save(&path).unwrap();
        let data = std::fs::read_to_string(&path)
            .unwrap()
            .replace("\"pending\"", "\"exploded\"");
        std::fs::write(&path, data).unwrap();
        assert!(matches!(
            State::load(&path).unwrap_err(),
            PrdError::CorruptState { .. }
        ));
    }

    #[test]
    fn load_zero_chunk_size_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let mut state = State::build("prd.md", &doc(3), 3, 1).unwrap();
        state.chunk_size = 0;
        state.save(&path).unwrap();
        let err = State::load(&path).unwrap_err();
        assert!(err.to_string().contains("chunk_size is 0"));
    }

    #[test]
    fn load_overlapping_chunks_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let mut state = State::build("prd.md", &doc(6), 3, 1).unwrap();
        state.chunks[1].start_line = 2;
        state.chunks[1].end_line = 4;
        state.save(&path).unwrap();

        let err = State::load(&path).unwrap_err();
        assert!(matches!(err, PrdError::CorruptState { .. }));
        assert!(err.to_string().contains("overlaps"));
    }

    #[test]
    fn load_gap_in_chunks_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let mut state = State::build("prd.md", &doc(9), 3, 1).unwrap();
        state.chunks[2].start_line = 8;
        state.save(&path).unwrap();

        let err = State::load(&path).unwrap_err();
        assert!(err.to_string().contains("gap before chunk 3"));
    }

    #[test]
    fn stale_when_line_count_differs() {
        let state = State::build("prd.md", &doc(5), 2, 1).unwrap();
        assert!(!state.is_stale(5));
        assert!(state.is_stale(6));
    }

    #[test]
    fn eligible_prefers_pending_over_failed() {
        let mut state = State::build("prd.md", &doc(9), 3, 1).unwrap();
        state.chunks[0].mark_failed("boom");
        state.chunks[1].mark_done();
        assert_eq!(state.eligible_ids(), vec![3]);

        state.chunks[2].mark_done();
        assert_eq!(state.eligible_ids(), vec![1]);

        state.chunks[0].mark_done();
        assert!(state.eligible_ids().is_empty());
    }

    #[test]
    fn status_counts_sum() {
        let mut state = State::build("prd.md", &doc(12), 3, 1).unwrap();
        state.chunks[0].mark_done();
        state.chunks[1].mark_failed("x");
        state.chunks[2].mark_running();
        let counts = state.status_counts();
        assert_eq!(counts.done, 1);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.running, 1);
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn reset_running_returns_to_pending() {
        let mut state = State::build("prd.md", &doc(6), 3, 1).unwrap();
        state.chunks[1].mark_running();
        assert_eq!(state.reset_running(), 1);
        assert_eq!(state.chunks[1].status, ChunkStatus::Pending);
        assert_eq!(state.chunks[1].attempts, 1);
        assert_eq!(state.reset_running(), 0);
    }

    #[test]
    fn retry_clears_error_and_attempts() {
        let mut state = State::build("prd.md", &doc(6), 3, 1).unwrap();
        state.chunks[0].mark_running();
        state.chunks[0].mark_failed("timeout");
        state.retry(&[1]).unwrap();
        let c = state.chunk(1).unwrap();
        assert_eq!(c.status, ChunkStatus::Pending);
        assert_eq!(c.attempts, 0);
        assert!(c.last_error.is_none());
    }

    #[test]
    fn retry_unknown_id_changes_nothing() {
        let mut state = State::build("prd.md", &doc(6), 3, 1).unwrap();
        state.chunks[0].mark_failed("timeout");
        let err = state.retry(&[1, 99]).unwrap_err();
        assert!(matches!(err, PrdError::UnknownChunk(99)));
        assert_eq!(state.chunks[0].status, ChunkStatus::Failed);
    }

    #[test]
    fn coverage_detects_gap_and_overlap() {
        let mut state = State::build("prd.md", &doc(9), 3, 1).unwrap();
        state.chunks[1].start_line = 5;
        assert!(state.check_coverage(9).is_err());

        let mut state = State::build("prd.md", &doc(9), 3, 1).unwrap();
        state.chunks[1].start_line = 3;
        let err = state.check_coverage(9).unwrap_err();
        assert!(err.to_string().contains("overlaps"));
    }

    #[test]
    fn coverage_detects_short_and_long_maps() {
        let state = State::build("prd.md", &doc(9), 3, 1).unwrap();
        assert!(state.check_coverage(10).is_err());
        assert!(state.check_coverage(8).is_err());
    }

    #[test]
    fn coverage_of_empty_document() {
        let state = State::build("prd.md", &[], 3, 1).unwrap();
        assert!(state.chunks.is_empty());
        state.check_coverage(0).unwrap();
    }

    #[test]
    fn rebuild_keeps_growth_meta() {
        let mut state = State::build("prd.md", &doc(6), 3, 1).unwrap();
        state.growth.total_passes_run = 4;
        state.chunks[0].mark_done();
        state.rebuild(&doc(8), 5).unwrap();
        assert_eq!(state.growth.total_passes_run, 4);
        assert_eq!(state.growth.current_pass, 5);
        assert_eq!(state.total_lines, 8);
        assert!(state
            .chunks
            .iter()
            .all(|c| c.status == ChunkStatus::Pending));
        assert_eq!(state.chunks[0].phase_id, "P5.0001");
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStateStore::new(dir.path().join("state.json"));
        let mut state = State::build("prd.md", &doc(4), 2, 1).unwrap();
        store.save(&mut state).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.chunks.len(), 2);
    }
}
