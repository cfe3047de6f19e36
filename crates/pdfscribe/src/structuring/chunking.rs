//! Splitting long documents into prompt-sized pieces.
//!
//! Free models have small context windows, so long PDFs are structured in
//! several requests. Splits prefer paragraph boundaries, then line
//! boundaries, and only cut inside a line when a single line is too long.

use text_splitter::{ChunkCapacity, ChunkConfig, TextSplitter};

/// Separator used when chunks are joined back together.
pub const CHUNK_SEPARATOR: &str = "\n\n";

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Whitespace-only input yields no chunks. Chunks are trimmed.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let splitter = TextSplitter::new(ChunkConfig::new(ChunkCapacity::new(max_chars.max(1))));
    splitter.chunks(text).map(str::to_string).collect()
}
