//! Rebuilds caption documents from an original and its translation.
//!
//! Both documents are split into caption blocks and paired by position. The
//! index and timecode lines always come from the original, so timing survives
//! whatever the model did to those lines.

use super::split_keep_separators;
use tracing::warn;

/// Split a document into caption blocks, each a list of lines.
///
/// Surrounding whitespace is trimmed first and whitespace-only pieces
/// (the separators themselves) are dropped.
pub fn split_blocks(text: &str) -> Vec<Vec<&str>> {
    split_keep_separators(text.trim())
        .into_iter()
        .filter(|piece| !piece.trim().is_empty())
        .map(|piece| piece.split('\n').collect())
        .collect()
}

/// Pair blocks positionally, stopping at the shorter document.
fn paired_blocks<'a>(
    original: &'a str,
    translated: &'a str,
) -> Vec<(Vec<&'a str>, Vec<&'a str>)> {
    let original_blocks = split_blocks(original);
    let translated_blocks = split_blocks(translated);

    if original_blocks.len() != translated_blocks.len() {
        warn!(
            "Block count mismatch: original has {}, translation has {}; keeping the first {}",
            original_blocks.len(),
            translated_blocks.len(),
            original_blocks.len().min(translated_blocks.len())
        );
    }

    original_blocks.into_iter().zip(translated_blocks).collect()
}

fn render(blocks: Vec<Vec<&str>>) -> String {
    let mut lines = Vec::new();
    for block in blocks {
        lines.extend(block);
        lines.push("");
    }
    lines.join("\n").trim().to_string()
}

/// Translation-only document: original index and timecode, translated text.
pub fn replace(original: &str, translated: &str) -> String {
    let blocks = paired_blocks(original, translated)
        .into_iter()
        .map(|(orig, trans)| {
            let mut lines: Vec<&str> = orig.iter().take(2).copied().collect();
            lines.extend(trans.iter().skip(2));
            lines
        })
        .collect();

    render(blocks)
}

/// Bilingual document: original index and timecode, original text, then
/// translated text.
pub fn merge(original: &str, translated: &str) -> String {
    let blocks = paired_blocks(original, translated)
        .into_iter()
        .map(|(orig, trans)| {
            let mut lines = orig;
            lines.extend(trans.iter().skip(2));
            lines
        })
        .collect();

    render(blocks)
}
