use serde::Serialize;
use thiserror::Error;

/// What a provider knows about the chunk it is rewriting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkContext {
    pub chunk_id: u32,
    pub phase_id: String,
    pub start_line: usize,
    pub end_line: usize,
    pub title: Option<String>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider timed out after {0}s")]
    Timeout(u64),

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("driver failed: {0}")]
    Driver(String),
}

/// Produces the replacement text for one chunk.
pub trait EnhancementProvider {
    fn provide_replacement(
        &mut self,
        original: &str,
        ctx: &ChunkContext,
    ) -> Result<String, ProviderError>;

    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// StubProvider
// ---------------------------------------------------------------------------

/// Offline provider: returns the chunk unchanged under a one-line note, so
/// growth is deterministic without an assistant.
#[derive(Debug, Default, Clone)]
pub struct StubProvider {
    calls: usize,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl EnhancementProvider for StubProvider {
    fn provide_replacement(
        &mut self,
        original: &str,
        ctx: &ChunkContext,
    ) -> Result<String, ProviderError> {
        self.calls += 1;
        let title = ctx.title.as_deref().unwrap_or("untitled");
        Ok(format!(
            "> [LOCAL-STUB] Phase {} (lines {}-{}, {title})\n{original}",
            ctx.phase_id, ctx.start_line, ctx.end_line
        ))
    }

    fn name(&self) -> &str {
        "stub"
    }
}
