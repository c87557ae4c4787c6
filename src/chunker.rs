//! Greedy paragraph packing into speakable chunks.
//!
//! Paragraphs (or page segments) are appended to the current chunk until the
//! next one would push it past the target size; the chunk then closes and the
//! next one starts with that paragraph. The target is soft: a paragraph longer
//! than the target still becomes a chunk of its own and is never split.

use crate::text_utils::{char_len, split_paragraphs};

/// Default soft bound on chunk length, in characters.
pub const DEFAULT_TARGET_CHARS: usize = 800;

const PARAGRAPH_SEPARATOR: &str = "\n\n";
const SEPARATOR_LEN: usize = 2;

/// Opaque reference to an element of the page tree (its document-order ordinal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

/// One block of text taken from the page, with the element it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub element: Option<ElementId>,
    pub text: String,
}

/// An ordered unit of speakable text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub source_elements: Vec<ElementId>,
}

impl Chunk {
    pub fn plain(text: impl Into<String>) -> Self {
        Chunk {
            text: text.into(),
            source_elements: Vec::new(),
        }
    }
}

/// Chunk raw text (e.g. a selection). The result carries no source elements.
pub fn chunk_text(text: &str, target_chars: usize) -> Vec<Chunk> {
    let segments = split_paragraphs(text)
        .into_iter()
        .map(|text| Segment {
            element: None,
            text,
        })
        .collect();
    chunk_segments(segments, target_chars)
}

/// Pack segments into chunks, keeping each chunk's source elements in order.
pub fn chunk_segments(segments: Vec<Segment>, target_chars: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    let mut elements = Vec::new();

    for segment in segments {
        let text = segment.text.trim();
        if text.is_empty() {
            continue;
        }
        let text_len = char_len(text);

        if !current.is_empty() && current_len + text_len + SEPARATOR_LEN > target_chars {
            chunks.push(Chunk {
                text: std::mem::take(&mut current),
                source_elements: std::mem::take(&mut elements),
            });
            current_len = 0;
        }

        if current.is_empty() {
            current.push_str(text);
            current_len = text_len;
        } else {
            current.push_str(PARAGRAPH_SEPARATOR);
            current.push_str(text);
            current_len += SEPARATOR_LEN + text_len;
        }
        if let Some(element) = segment.element {
            elements.push(element);
        }
    }

    if !current.is_empty() {
        chunks.push(Chunk {
            text: current,
            source_elements: elements,
        });
    }

    chunks
}
