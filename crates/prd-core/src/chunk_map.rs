use crate::error::{PrdError, Result};
use crate::state::Chunk;
use crate::types::ChunkStatus;
use regex::Regex;
use std::sync::OnceLock;

/// How far above a chunk start the builder looks for a heading.
pub const TITLE_SCAN_LINES: usize = 50;

static HEADING_RE: OnceLock<Regex> = OnceLock::new();

fn heading_re() -> &'static Regex {
    HEADING_RE.get_or_init(|| Regex::new(r"^#+\s+(.+)$").unwrap())
}

/// `P<pass>.<id>`; pass 0 is reported as pass 1.
pub fn phase_id(pass: u32, id: u32) -> String {
    format!("P{}.{:04}", pass.max(1), id)
}

/// Split `lines` into fixed windows of `chunk_size` lines (the last window may
/// be shorter). Every chunk starts out pending.
pub fn build_chunks(lines: &[String], chunk_size: usize, pass: u32) -> Result<Vec<Chunk>> {
    if chunk_size == 0 {
        return Err(PrdError::InvalidConfig(
            "chunk size must be greater than 0".to_string(),
        ));
    }

    let total = lines.len();
    let mut chunks = Vec::with_capacity(total.div_ceil(chunk_size));
    let mut start = 1usize;
    let mut id = 1u32;
    while start <= total {
        let end = (start + chunk_size - 1).min(total);
        chunks.push(Chunk {
            id,
            phase_id: phase_id(pass, id),
            start_line: start,
            end_line: end,
            status: ChunkStatus::Pending,
            attempts: 0,
            last_error: None,
            title: title_for(lines, start),
            last_updated_at: None,
        });
        start = end + 1;
        id += 1;
    }
    Ok(chunks)
}

/// Nearest heading at or above `start_line`, within `TITLE_SCAN_LINES`.
fn title_for(lines: &[String], start_line: usize) -> Option<String> {
    let start_idx = start_line - 1;
    let floor = start_idx.saturating_sub(TITLE_SCAN_LINES);
    (floor..=start_idx).rev().find_map(|i| {
        heading_re()
            .captures(lines[i].trim_end())
            .map(|caps| caps[1].trim().to_string())
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
