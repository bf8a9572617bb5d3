//! Fixed-size word chunking.

use ragcheck_core::{AppError, AppResult};

/// Split text into passages of `chunk_size` words.
///
/// Whitespace runs collapse to single spaces and cuts happen only between
/// words, so joining the chunks with a space reproduces the normalized
/// text. Chunks do not overlap; only the last may be shorter.
pub fn split(text: &str, chunk_size: usize) -> AppResult<Vec<String>> {
    if chunk_size == 0 {
        return Err(AppError::InvalidArgument(
            "chunk_size must be greater than zero".to_string(),
        ));
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let chunks: Vec<String> = words.chunks(chunk_size).map(|run| run.join(" ")).collect();

    tracing::debug!(
        "Chunked {} words into {} chunks (size: {})",
        words.len(),
        chunks.len(),
        chunk_size
    );

    Ok(chunks)
}

/// Collapse whitespace runs into single spaces.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
