//! SRT document handling: reading, chunking, structural checks and reassembly.

pub mod chunk;
pub mod reassemble;
pub mod validate;

pub use chunk::{split_into_chunks, DEFAULT_CHUNK_SIZE};
pub use reassemble::{merge, replace};
pub use validate::{index_lines, is_valid};

use crate::error::{Result, SubtransError};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::warn;

/// A blank line between caption blocks, including any whitespace-only lines.
fn separator_regex() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"\n\s*\n").expect("Invalid regex"))
}

/// Split `text` on blank-line separators, keeping each separator as its own
/// piece so that concatenating the pieces gives back `text` exactly.
///
/// Pieces alternate between block text and separators, starting and ending
/// with block text (which may be empty).
pub fn split_keep_separators(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut last = 0;

    for m in separator_regex().find_iter(text) {
        pieces.push(&text[last..m.start()]);
        pieces.push(m.as_str());
        last = m.end();
    }
    pieces.push(&text[last..]);

    pieces
}

/// Whether `path` has the `.srt` extension (case-insensitive).
pub fn is_srt(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("srt"))
        .unwrap_or(false)
}

/// Read an SRT document as normalised text.
///
/// Strips a UTF-8 byte order mark and converts CRLF line endings to LF.
/// Bytes that are not valid UTF-8 are replaced rather than rejected.
pub fn read_document(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(SubtransError::FileNotFound(path.display().to_string()));
    }
    if !is_srt(path) {
        return Err(SubtransError::UnsupportedFormat(path.display().to_string()));
    }

    let bytes = std::fs::read(path)?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            warn!(
                "{} is not valid UTF-8, replacing undecodable bytes",
                path.display()
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };

    Ok(normalize(&text))
}

/// Strip a leading BOM and convert CRLF line endings to `\n`. Lone `\r`
/// characters are left alone.
pub fn normalize(text: &str) -> String {
    text.trim_start_matches('\u{feff}').replace("\r\n", "\n")
}
