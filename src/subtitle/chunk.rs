// Size-bounded chunking along caption block boundaries
use super::split_keep_separators;
use tracing::debug;

/// Default chunk budget, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Split a document into chunks of at most `max_chars` characters.
///
/// Splitting only happens at blank-line separators, so a caption block is never
/// cut in two. A block that is larger than the budget on its own becomes an
/// oversized chunk. Concatenating the returned chunks reproduces `text`.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for piece in split_keep_separators(text) {
        let piece_len = piece.chars().count();

        if current_len + piece_len > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        current.push_str(piece);
        current_len += piece_len;
    }
    chunks.push(current);

    debug!(
        "Split {} characters into {} chunks (budget {})",
        text.chars().count(),
        chunks.len(),
        max_chars
    );

    chunks
}
