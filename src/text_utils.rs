//! Text cleanup helpers shared by the segmenter and the chunker.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static RE_INLINE_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+").unwrap());
static RE_BLANK_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[^\S\n]*\n").unwrap());
static RE_EXCESS_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Split text into trimmed paragraphs separated by blank lines.
///
/// A blank line is a line break followed by optional whitespace and another
/// line break. Empty paragraphs are dropped.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let unified = text.replace("\r\n", "\n");
    let mut paragraphs = Vec::new();
    let mut rest = unified.as_str();
    loop {
        let Some(found) = RE_BLANK_LINE.find(rest) else {
            push_paragraph(&mut paragraphs, rest);
            break;
        };
        push_paragraph(&mut paragraphs, &rest[..found.start()]);
        // The closing newline may open the next blank line.
        rest = &rest[found.end() - 1..];
    }
    paragraphs
}

fn push_paragraph(paragraphs: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        paragraphs.push(trimmed.to_string());
    }
}

/// Normalize rendered text: NFC, collapsed inline whitespace, trimmed lines,
/// and at most one blank line between paragraphs.
pub fn normalize_rendered_text(text: &str) -> String {
    let composed: String = text.nfc().collect::<String>().replace('\u{a0}', " ");
    let collapsed = RE_INLINE_SPACE.replace_all(&composed, " ");
    let lines = collapsed
        .split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    RE_EXCESS_BREAKS
        .replace_all(&lines, "\n\n")
        .trim()
        .to_string()
}

/// Keep at most `max_chars` characters, cutting on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Length in characters; the unit every size bound in the crate is measured in.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
