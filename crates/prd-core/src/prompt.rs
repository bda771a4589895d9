use crate::provider::ChunkContext;

pub const CHUNK_START: &str = "<<<IMPROVED_CHUNK_START>>>";
pub const CHUNK_END: &str = "<<<IMPROVED_CHUNK_END>>>";

const LEGACY_START: &str = "<<<IMPROVED_SECTION_START>>>";
const LEGACY_END: &str = "<<<IMPROVED_SECTION_END>>>";

const PLACEHOLDER: &str = "...rewritten chunk...";

/// Prompt sent to the assistant for one chunk. The assistant is asked to
/// answer with the rewritten chunk between `CHUNK_START` and `CHUNK_END`.
pub fn build_prompt(ctx: &ChunkContext, chunk_text: &str, project_name: &str) -> String {
    let title = ctx.title.as_deref().unwrap_or("(no heading)");
    format!(
        "You are expanding the product requirements document for {project_name}.\n\
         Phase {phase} covers lines {start}-{end} under \"{title}\".\n\
         \n\
         Rewrite the chunk below so it is more complete and more precise.\n\
         Keep every existing requirement, heading and identifier; only add or clarify.\n\
         Do not shorten the chunk.\n\
         \n\
         Reply with the full rewritten chunk between the markers, nothing else:\n\
         {CHUNK_START}\n\
         {PLACEHOLDER}\n\
         {CHUNK_END}\n\
         \n\
         --- CHUNK ---\n\
         {chunk_text}\n\
         --- END CHUNK ---\n",
        phase = ctx.phase_id,
        start = ctx.start_line,
        end = ctx.end_line,
    )
}

/// Text between the last pair of improved-chunk markers in `transcript`,
/// without the blank lines around it. Indentation of the first line is kept.
/// Falls back to the older section markers.
pub fn extract_improved(transcript: &str) -> Option<String> {
    between(transcript, CHUNK_START, CHUNK_END)
        .or_else(|| between(transcript, LEGACY_START, LEGACY_END))
}

// The prompt itself contains a marker pair, and transcripts often echo the
// prompt, so the answer is the last complete pair.
fn between(text: &str, start: &str, end: &str) -> Option<String> {
    let end_idx = text.rfind(end)?;
    let start_idx = text[..end_idx].rfind(start)?;
    let body = text[start_idx + start.len()..end_idx].trim_end();
    let first = body.find(|c: char| !c.is_whitespace())?;
    let body = match body[..first].rfind('\n') {
        Some(nl) => &body[nl + 1..],
        None => body.trim_start(),
    };
    if body.trim() == PLACEHOLDER {
        None
    } else {
        Some(body.to_string())
    }
}
