//! A loaded web page: its address, parsed document and optional selection.

use crate::chunker::ElementId;
use crate::config::{HostRule, SiteRule};
use scraper::{ElementRef, Html};

pub struct Page {
    url: String,
    document: Html,
    selection: Option<String>,
}

impl Page {
    pub fn parse(url: &str, html: &str) -> Self {
        Self {
            url: url.to_string(),
            document: Html::parse_document(html),
            selection: None,
        }
    }

    /// Attach the text the user currently has selected.
    pub fn with_selection(mut self, selection: Option<String>) -> Self {
        self.selection = selection;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn host(&self) -> Option<String> {
        page_host(&self.url)
    }

    pub fn document(&self) -> &Html {
        &self.document
    }

    /// Non-blank selection text, trimmed.
    pub fn selection(&self) -> Option<&str> {
        self.selection
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    /// Elements in document order, numbered the way `ElementId` refers to them.
    pub fn elements(&self) -> impl Iterator<Item = (ElementId, ElementRef<'_>)> {
        self.document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .enumerate()
            .map(|(idx, element)| (ElementId(idx), element))
    }

    pub fn element(&self, id: ElementId) -> Option<ElementRef<'_>> {
        self.elements()
            .find(|(candidate, _)| *candidate == id)
            .map(|(_, element)| element)
    }

    /// Strip selectors that apply to this page's host.
    pub fn strip_selectors(&self, rules: &[SiteRule]) -> Vec<String> {
        let Some(host) = self.host() else {
            return Vec::new();
        };
        rules
            .iter()
            .filter(|rule| rule.matches(&host))
            .flat_map(|rule| rule.strip_selectors.iter().cloned())
            .collect()
    }
}

pub fn normalize_page_url(url: &str) -> String {
    match url.split_once('#') {
        Some((base, _)) => base.to_string(),
        None => url.to_string(),
    }
}

/// Lowercased host name of an absolute URL, without credentials or port.
pub fn page_host(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("://")?;
    let authority = rest
        .split(|c| matches!(c, '/' | '?' | '#'))
        .next()
        .unwrap_or_default();
    let host_port = authority.rsplit('@').next().unwrap_or_default();
    let host = if let Some(bracketed) = host_port.strip_prefix('[') {
        bracketed.split(']').next().unwrap_or_default()
    } else {
        host_port.split(':').next().unwrap_or_default()
    };
    if host.is_empty() {
        None
    } else {
        Some(host.to_ascii_lowercase())
    }
}

/// Whether the overlay starts visible on a page with this URL.
pub fn overlay_visible_by_default(url: &str, sites: &[HostRule], always_visible: bool) -> bool {
    if always_visible {
        return true;
    }
    page_host(url).is_some_and(|host| sites.iter().any(|rule| rule.matches(&host)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_is_dropped_from_position_key() {
        assert_eq!(
            normalize_page_url("https://a.test/post?id=2#section-3"),
            "https://a.test/post?id=2"
        );
        assert_eq!(normalize_page_url("https://a.test/"), "https://a.test/");
    }

    #[test]
    fn host_parsing_handles_ports_and_credentials() {
        assert_eq!(
            page_host("https://user:pw@Blog.Medium.com:8443/p/1").as_deref(),
            Some("blog.medium.com")
        );
        assert_eq!(page_host("http://[::1]:8080/").as_deref(), Some("::1"));
        assert_eq!(page_host("file:///tmp/page.html"), None);
        assert_eq!(page_host("not a url"), None);
    }

    #[test]
    fn overlay_shows_on_supported_sites_only() {
        let sites = crate::config::AppConfig::default().supported_sites;
        assert!(overlay_visible_by_default("https://medium.com/x", &sites, false));
        assert!(overlay_visible_by_default("https://news.substack.com/p/y", &sites, false));
        assert!(overlay_visible_by_default("https://twitter.com/z", &sites, false));
        assert!(!overlay_visible_by_default("https://mobile.x.com/z", &sites, false));
        assert!(!overlay_visible_by_default("https://example.org/", &sites, false));
        assert!(overlay_visible_by_default("https://example.org/", &sites, true));
    }

    #[test]
    fn strip_selectors_follow_host() {
        let rules = crate::config::AppConfig::default().site_rules;
        let substack = Page::parse("https://news.substack.com/p/a", "<p>x</p>");
        assert_eq!(substack.strip_selectors(&rules).len(), 2);
        let other = Page::parse("https://example.org/a", "<p>x</p>");
        assert!(other.strip_selectors(&rules).is_empty());
    }

    #[test]
    fn element_ids_follow_document_order() {
        let page = Page::parse("https://a.test/", "<html><body><p>one</p><p>two</p></body></html>");
        let tags: Vec<String> = page
            .elements()
            .map(|(_, element)| element.value().name().to_string())
            .collect();
        assert_eq!(tags, vec!["html", "head", "body", "p", "p"]);
        let second = page.element(ElementId(4)).expect("second paragraph");
        assert_eq!(second.text().collect::<String>(), "two");
        assert!(page.element(ElementId(99)).is_none());
    }

    #[test]
    fn blank_selection_is_ignored() {
        let page = Page::parse("https://a.test/", "<p>x</p>").with_selection(Some(" \n ".into()));
        assert!(page.selection().is_none());
        let page = page.with_selection(Some("  chosen  ".into()));
        assert_eq!(page.selection(), Some("chosen"));
    }
}
