//! Sliding-window text chunker.
//!
//! Splits a file's text into overlapping fixed-size character windows and
//! annotates each window with the 1-based inclusive line range it covers.
//!
//! # Algorithm
//!
//! 1. Join the file's lines with `\n`.
//! 2. Emit the window `[start, min(len, start + chunk_size))`.
//! 3. Stop as soon as a window reaches the end of the text.
//! 4. Otherwise advance `start` to `end - chunk_overlap` and repeat.
//!
//! Windows are measured in Unicode scalar values, so a chunk never splits a
//! multi-byte character. Line numbers are derived from the number of
//! newlines preceding the window's start and end offsets.
//!
//! # Example
//!
//! ```rust
//! use repodoc_core::chunk::{chunk_file, ChunkParams};
//!
//! let lines = vec!["fn main() {}".to_string()];
//! let chunks = chunk_file("src/main.rs", &lines, &ChunkParams::default());
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].id, "src/main.rs:1-1:0");
//! ```

use crate::models::{Chunk, FileEntry};

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1200;
/// Default overlap between consecutive windows in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Window geometry for the chunker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    pub chunk_size: usize,
    /// Must be smaller than `chunk_size`.
    pub chunk_overlap: usize,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Split one file into overlapping chunks.
///
/// # Guarantees
///
/// - Empty text yields no chunks.
/// - Every chunk holds at most `chunk_size` characters.
/// - Consecutive chunks share exactly `chunk_overlap` characters.
/// - Output is deterministic for identical input.
pub fn chunk_file(file_path: &str, lines: &[String], params: &ChunkParams) -> Vec<Chunk> {
    let joined = lines.join("\n");

    // Byte offset of every char boundary, including the end of the text.
    let offsets: Vec<usize> = joined
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(joined.len()))
        .collect();
    let len = offsets.len() - 1;

    // newlines_before[i] = count of '\n' among the first i chars.
    let mut newlines_before = Vec::with_capacity(len + 1);
    let mut seen = 0usize;
    newlines_before.push(0);
    for c in joined.chars() {
        if c == '\n' {
            seen += 1;
        }
        newlines_before.push(seen);
    }

    let size = params.chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut ordinal = 0usize;

    while start < len {
        let end = len.min(start + size);
        let start_line = newlines_before[start] + 1;
        let end_line = newlines_before[end] + 1;

        chunks.push(Chunk {
            id: format!("{}:{}-{}:{}", file_path, start_line, end_line, ordinal),
            file_path: file_path.to_string(),
            start_line,
            end_line,
            text: joined[offsets[start]..offsets[end]].to_string(),
        });
        ordinal += 1;

        if end >= len {
            break;
        }
        // Always make forward progress, even with a degenerate overlap.
        start = end.saturating_sub(params.chunk_overlap).max(start + 1);
    }

    chunks
}

/// Chunk every file, concatenating results in file order then chunk order.
pub fn chunk_all(files: &[FileEntry], params: &ChunkParams) -> Vec<Chunk> {
    files
        .iter()
        .flat_map(|f| chunk_file(&f.path, &f.lines, params))
        .collect()
}
