//! Structural extraction from raw HTML.
//!
//! html5ever repairs whatever it is given, so malformed markup never fails
//! here; missing elements simply produce empty fields.

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

/// Elements whose text is never rendered.
const INVISIBLE: &[&str] = &["script", "style", "noscript", "template"];

/// Structured fields derived from one page's markup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedPage {
    /// The document re-serialised by the parser.
    pub full_markup: String,
    /// Each top-level `<ul>`, serialised, in document order.
    pub list_blocks: Vec<String>,
    /// Text of every `<li>`, whitespace-collapsed.
    pub list_items: Vec<String>,
    /// All visible text, whitespace-collapsed.
    pub clean_text: String,
    pub title: String,
    pub meta_description: String,
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn collapse_whitespace<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract every structured field from raw markup.
pub fn extract(markup: &str) -> ExtractedPage {
    let document = Html::parse_document(markup);

    ExtractedPage {
        full_markup: document.html(),
        list_blocks: list_blocks(&document),
        list_items: list_items(&document),
        clean_text: clean_text(&document),
        title: title(&document),
        meta_description: meta_description(&document),
    }
}

fn list_blocks(document: &Html) -> Vec<String> {
    let Some(sel) = selector("ul") else {
        return Vec::new();
    };
    document
        .select(&sel)
        .filter(|ul| {
            !ul.ancestors()
                .filter_map(ElementRef::wrap)
                .any(|ancestor| ancestor.value().name() == "ul")
        })
        .map(|ul| ul.html())
        .collect()
}

fn list_items(document: &Html) -> Vec<String> {
    let Some(sel) = selector("li") else {
        return Vec::new();
    };
    document
        .select(&sel)
        .map(|li| collapse_whitespace(li.text()))
        .collect()
}

fn clean_text(document: &Html) -> String {
    let visible = document.root_element().descendants().filter_map(|node| {
        let Node::Text(text) = node.value() else {
            return None;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| INVISIBLE.contains(&el.name()))
        });
        (!hidden).then_some(&**text)
    });
    collapse_whitespace(visible)
}

fn title(document: &Html) -> String {
    selector("title")
        .and_then(|sel| {
            document
                .select(&sel)
                .next()
                .map(|t| collapse_whitespace(t.text()))
        })
        .unwrap_or_default()
}

fn meta_description(document: &Html) -> String {
    let Some(sel) = selector("meta[name][content]") else {
        return String::new();
    };
    document
        .select(&sel)
        .find(|meta| {
            meta.value()
                .attr("name")
                .is_some_and(|name| name.eq_ignore_ascii_case("description"))
        })
        .and_then(|meta| meta.value().attr("content"))
        .map(|content| content.trim().to_string())
        .unwrap_or_default()
}

/// Absolute targets of every `<a href>`, resolved against `page_url`, in
/// document order. Unresolvable hrefs are dropped.
pub fn link_targets(markup: &str, page_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(markup);
    let Some(sel) = selector("a[href]") else {
        return Vec::new();
    };
    document
        .select(&sel)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| page_url.join(href.trim()).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>  Don Bosco
     Home </title>
  <meta name="Description" content="  Schools and parishes  ">
  <style>body { color: red; }</style>
  <script>var hidden = "do not index";</script>
</head>
<body>
  <h1>Welcome</h1>
  <ul id="nav">
    <li>Home</li>
    <li>About
      <ul><li>History</li></ul>
    </li>
  </ul>
  <p>Our   mission
     is education.</p>
  <ul id="footer"><li></li></ul>
</body>
</html>"#;

    #[test]
    fn test_extract_fields() {
        let page = extract(PAGE);

        assert_eq!(page.title, "Don Bosco Home");
        assert_eq!(page.meta_description, "Schools and parishes");

        assert_eq!(page.list_blocks.len(), 2, "nested <ul> is not top-level");
        assert!(page.list_blocks[0].contains(r#"id="nav""#));
        assert!(page.list_blocks[0].contains("History"));
        assert!(page.list_blocks[1].contains(r#"id="footer""#));

        assert_eq!(page.list_items, ["Home", "About History", "History", ""]);

        assert!(page.clean_text.contains("Welcome Home About History Our mission is education."));
        assert!(!page.clean_text.contains("do not index"));
        assert!(!page.clean_text.contains("color: red"));
        assert!(page.full_markup.contains("<h1>Welcome</h1>"));
    }

    #[test]
    fn test_missing_elements_degrade_to_empty() {
        let page = extract("<p>just text");
        assert_eq!(page.title, "");
        assert_eq!(page.meta_description, "");
        assert!(page.list_blocks.is_empty());
        assert!(page.list_items.is_empty());
        assert_eq!(page.clean_text, "just text");
    }

    #[test]
    fn test_garbage_input() {
        let page = extract("<<<>>> </div></html><li>stray");
        assert_eq!(page.list_items, ["stray"]);
        assert_eq!(page.title, "");
    }

    #[test]
    fn test_link_targets_resolved() {
        let base = Url::parse("https://example.com/news/").unwrap();
        let html = r##"
            <a href="/about">About</a>
            <a href="item-1#comments">Item</a>
            <a href="https://other.org/x">Elsewhere</a>
            <a href="mailto:info@example.com">Mail</a>
            <a>No href</a>
        "##;

        let links: Vec<String> = link_targets(html, &base)
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(
            links,
            [
                "https://example.com/about",
                "https://example.com/news/item-1#comments",
                "https://other.org/x",
                "mailto:info@example.com",
            ]
        );
    }
}
