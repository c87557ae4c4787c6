//! Page text extraction.
//!
//! An active selection wins and is chunked as plain text. Otherwise the
//! content root (`article` if present, else `body`) is scanned for block
//! elements in document order; each yields its rendered text with per-site
//! strip selectors removed. Blocks nested inside another block are read once,
//! through the outer block. When no block has text, the root's whole rendered
//! text is chunked instead.

use crate::chunker::{Chunk, Segment, chunk_segments, chunk_text};
use crate::config::{AppConfig, SiteRule};
use crate::controller::ChunkSource;
use crate::page::Page;
use crate::text_utils::normalize_rendered_text;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};
use std::rc::Rc;
use tracing::{debug, info, warn};

pub const BLOCK_SELECTOR_SOURCE: &str =
    "p, h1, h2, h3, h4, h5, h6, li, blockquote, figcaption, pre, td, th, dt, dd";

static BLOCK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(BLOCK_SELECTOR_SOURCE).unwrap());
static ARTICLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("article").unwrap());
static BODY_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());

/// Elements whose content is never rendered as text.
const NON_RENDERED_TAGS: &[&str] = &[
    "head", "script", "style", "noscript", "template", "svg", "canvas", "iframe", "object",
];

/// Elements rendered as their own paragraph.
const PARAGRAPH_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "figure", "table", "ul", "ol",
    "dl", "hr",
];

/// Elements that start on a new line.
const LINE_TAGS: &[&str] = &[
    "div", "section", "article", "main", "header", "footer", "nav", "aside", "li", "tr", "td",
    "th", "dt", "dd", "figcaption", "caption", "address", "details", "summary", "form",
];

#[derive(Debug, Clone)]
pub struct Segmenter {
    target_chars: usize,
    site_rules: Vec<SiteRule>,
}

impl Segmenter {
    pub fn new(target_chars: usize, site_rules: Vec<SiteRule>) -> Self {
        Self {
            target_chars: target_chars.max(1),
            site_rules,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.chunk_target_chars, config.site_rules.clone())
    }

    /// Chunks for the page as it is right now. Empty means nothing to read.
    pub fn build_chunks(&self, page: &Page) -> Vec<Chunk> {
        if let Some(selection) = page.selection() {
            let chunks = chunk_text(selection, self.target_chars);
            info!(chunks = chunks.len(), "Chunked active selection");
            return chunks;
        }

        let strip = self.strip_selectors(page);
        let segments = collect_segments(page, &strip);
        if !segments.is_empty() {
            let chunks = chunk_segments(segments, self.target_chars);
            info!(chunks = chunks.len(), "Chunked page blocks");
            return chunks;
        }

        let root = content_root(page.document());
        let text = rendered_text(root, &strip);
        if text.is_empty() {
            warn!(url = page.url(), "No readable text on page");
            return Vec::new();
        }
        debug!("No block elements with text; using whole content root");
        chunk_text(&text, self.target_chars)
    }

    fn strip_selectors(&self, page: &Page) -> Vec<Selector> {
        page.strip_selectors(&self.site_rules)
            .iter()
            .filter_map(|source| match Selector::parse(source) {
                Ok(selector) => Some(selector),
                Err(err) => {
                    warn!(selector = %source, "Skipping invalid strip selector: {err}");
                    None
                }
            })
            .collect()
    }
}

/// Segments a shared page on demand, so every start sees the page as it is.
pub struct PageChunks {
    page: Rc<Page>,
    segmenter: Segmenter,
}

impl PageChunks {
    pub fn new(page: Rc<Page>, segmenter: Segmenter) -> Self {
        Self { page, segmenter }
    }
}

impl ChunkSource for PageChunks {
    fn build_chunks(&self) -> Vec<Chunk> {
        self.segmenter.build_chunks(&self.page)
    }
}

fn content_root(document: &Html) -> ElementRef<'_> {
    document
        .select(&ARTICLE_SELECTOR)
        .next()
        .or_else(|| document.select(&BODY_SELECTOR).next())
        .unwrap_or_else(|| document.root_element())
}

fn collect_segments(page: &Page, strip: &[Selector]) -> Vec<Segment> {
    let root = content_root(page.document());
    let mut segments = Vec::new();
    for (id, element) in page.elements() {
        if !BLOCK_SELECTOR.matches(&element) {
            continue;
        }
        let Some(path) = path_to_root(element, root) else {
            continue;
        };
        if path.iter().any(|ancestor| BLOCK_SELECTOR.matches(ancestor)) {
            continue;
        }
        if path
            .iter()
            .chain(std::iter::once(&element))
            .any(|el| is_hidden(*el) || is_stripped(*el, strip))
        {
            continue;
        }
        let text = rendered_text(element, strip);
        if !text.is_empty() {
            segments.push(Segment {
                element: Some(id),
                text,
            });
        }
    }
    segments
}

/// Ancestors of `element` strictly below `root`, or `None` when outside it.
fn path_to_root<'a>(element: ElementRef<'a>, root: ElementRef<'a>) -> Option<Vec<ElementRef<'a>>> {
    if element.id() == root.id() {
        return Some(Vec::new());
    }
    let mut path = Vec::new();
    for node in element.ancestors() {
        if node.id() == root.id() {
            return Some(path);
        }
        if let Some(ancestor) = ElementRef::wrap(node) {
            path.push(ancestor);
        }
    }
    None
}

fn is_hidden(element: ElementRef<'_>) -> bool {
    let value = element.value();
    if NON_RENDERED_TAGS.contains(&value.name()) {
        return true;
    }
    if value.attr("hidden").is_some() {
        return true;
    }
    if value
        .attr("aria-hidden")
        .is_some_and(|flag| flag.trim().eq_ignore_ascii_case("true"))
    {
        return true;
    }
    value.attr("style").is_some_and(|style| {
        let compact: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        compact.contains("display:none") || compact.contains("visibility:hidden")
    })
}

fn is_stripped(element: ElementRef<'_>, strip: &[Selector]) -> bool {
    strip.iter().any(|selector| selector.matches(&element))
}

/// Rendered text of an element, approximating what a browser lays out.
fn rendered_text(element: ElementRef<'_>, strip: &[Selector]) -> String {
    let mut renderer = TextRenderer {
        strip,
        out: String::new(),
        pending_breaks: 0,
    };
    renderer.element(element, false);
    normalize_rendered_text(&renderer.out)
}

/// Walks visible nodes; line breaks requested by adjacent blocks collapse to
/// the largest one, and are only written once more text follows.
struct TextRenderer<'s> {
    strip: &'s [Selector],
    out: String,
    pending_breaks: usize,
}

impl TextRenderer<'_> {
    fn element(&mut self, element: ElementRef<'_>, in_pre: bool) {
        if is_hidden(element) || is_stripped(element, self.strip) {
            return;
        }
        let name = element.value().name();
        if name == "br" {
            self.flush_breaks();
            self.out.push('\n');
            return;
        }
        let breaks = if PARAGRAPH_TAGS.contains(&name) {
            2
        } else if LINE_TAGS.contains(&name) {
            1
        } else {
            0
        };
        let in_pre = in_pre || name == "pre";

        self.request_breaks(breaks);
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.text(text, in_pre),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.element(child, in_pre);
                    }
                }
                _ => {}
            }
        }
        self.request_breaks(breaks);
    }

    fn text(&mut self, text: &str, in_pre: bool) {
        if in_pre {
            self.flush_breaks();
            self.out.push_str(text);
            return;
        }
        if text.trim().is_empty() {
            if self.pending_breaks == 0 && !self.out.is_empty() {
                self.out.push(' ');
            }
            return;
        }
        self.flush_breaks();
        self.out
            .extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }));
    }

    fn request_breaks(&mut self, breaks: usize) {
        self.pending_breaks = self.pending_breaks.max(breaks);
    }

    fn flush_breaks(&mut self) {
        if !self.out.is_empty() {
            for _ in 0..self.pending_breaks {
                self.out.push('\n');
            }
        }
        self.pending_breaks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::ElementId;

    fn segmenter() -> Segmenter {
        Segmenter::from_config(&AppConfig::default())
    }

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|chunk| chunk.text.as_str()).collect()
    }

    fn tag_of(page: &Page, id: ElementId) -> String {
        page.element(id)
            .map(|element| element.value().name().to_string())
            .unwrap_or_default()
    }

    #[test]
    fn article_is_preferred_over_body() {
        let page = Page::parse(
            "https://blog.test/post",
            "<body><nav><li>Home</li></nav><article><h1>Title</h1><p>Body text.</p></article>\
             <footer><p>Copyright</p></footer></body>",
        );
        let chunks = segmenter().build_chunks(&page);
        assert_eq!(texts(&chunks), vec!["Title\n\nBody text."]);
        let tags: Vec<String> = chunks[0]
            .source_elements
            .iter()
            .map(|id| tag_of(&page, *id))
            .collect();
        assert_eq!(tags, vec!["h1", "p"]);
    }

    #[test]
    fn body_is_used_without_article() {
        let page = Page::parse(
            "https://blog.test/post",
            "<body><h2>Intro</h2><ul><li>First  item</li><li>Second\nitem</li></ul>\
             <table><tr><th>Key</th><td>Value</td></tr></table></body>",
        );
        let chunks = segmenter().build_chunks(&page);
        assert_eq!(
            texts(&chunks),
            vec!["Intro\n\nFirst item\n\nSecond item\n\nKey\n\nValue"]
        );
        assert_eq!(chunks[0].source_elements.len(), 5);
    }

    #[test]
    fn hidden_content_is_not_read() {
        let page = Page::parse(
            "https://blog.test/post",
            "<body><p>Shown<script>var x = 1;</script></p>\
             <p hidden>Hidden attribute</p>\
             <p style=\"display: none\">Hidden style</p>\
             <div aria-hidden=\"true\"><p>Hidden subtree</p></div>\
             <p>Also <span style=\"visibility:hidden\">not </span>shown</p></body>",
        );
        let chunks = segmenter().build_chunks(&page);
        assert_eq!(texts(&chunks), vec!["Shown\n\nAlso shown"]);
    }

    #[test]
    fn site_strip_rules_remove_footnote_anchors() {
        let html = "<article><p>Claim<a class=\"footnote-anchor\" href=\"#fn1\">1</a> made.</p>\
                    <p>Next<sup data-component-name=\"FootnoteAnchorToDOM\">2</sup>.</p></article>";
        let substack = Page::parse("https://writer.substack.com/p/post", html);
        assert_eq!(
            texts(&segmenter().build_chunks(&substack)),
            vec!["Claim made.\n\nNext."]
        );
        let elsewhere = Page::parse("https://example.org/post", html);
        assert_eq!(
            texts(&segmenter().build_chunks(&elsewhere)),
            vec!["Claim1 made.\n\nNext2."]
        );
    }

    #[test]
    fn nested_blocks_are_read_once() {
        let page = Page::parse(
            "https://blog.test/post",
            "<body><blockquote><p>Quoted one.</p><p>Quoted two.</p></blockquote><p>After.</p></body>",
        );
        let chunks = segmenter().build_chunks(&page);
        assert_eq!(
            texts(&chunks),
            vec!["Quoted one.\n\nQuoted two.\n\nAfter."]
        );
        assert_eq!(chunks[0].source_elements.len(), 2);
    }

    #[test]
    fn markup_without_blocks_falls_back_to_root_text() {
        let page = Page::parse(
            "https://blog.test/post",
            "<body><div>First line<br>second line</div><div><span>Another</span> part</div></body>",
        );
        let chunks = segmenter().build_chunks(&page);
        assert_eq!(
            texts(&chunks),
            vec!["First line\nsecond line\nAnother part"]
        );
        assert!(chunks[0].source_elements.is_empty());
    }

    #[test]
    fn empty_page_has_nothing_to_read() {
        let page = Page::parse(
            "https://blog.test/post",
            "<body><script>track()</script><p>   </p></body>",
        );
        assert!(segmenter().build_chunks(&page).is_empty());
    }

    #[test]
    fn selection_bypasses_the_document() {
        let page = Page::parse("https://blog.test/post", "<body><p>Whole page.</p></body>")
            .with_selection(Some("Picked one.\n\nPicked two.".to_string()));
        let chunks = segmenter().build_chunks(&page);
        assert_eq!(texts(&chunks), vec!["Picked one.\n\nPicked two."]);
        assert!(chunks[0].source_elements.is_empty());
    }

    #[test]
    fn preformatted_blocks_keep_line_breaks() {
        let page = Page::parse(
            "https://blog.test/post",
            "<body><pre>fn main() {\n    run();\n}</pre></body>",
        );
        let chunks = segmenter().build_chunks(&page);
        assert_eq!(texts(&chunks), vec!["fn main() {\nrun();\n}"]);
    }

    #[test]
    fn large_pages_split_at_block_boundaries() {
        let paragraphs: String = (0..12)
            .map(|i| format!("<p>{} {i}</p>", "word ".repeat(30)))
            .collect();
        let page = Page::parse("https://blog.test/post", &format!("<body>{paragraphs}</body>"));
        let chunks = Segmenter::new(400, Vec::new()).build_chunks(&page);
        assert!(chunks.len() > 1);
        let total: usize = chunks.iter().map(|chunk| chunk.source_elements.len()).sum();
        assert_eq!(total, 12);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 400);
        }
    }
}
