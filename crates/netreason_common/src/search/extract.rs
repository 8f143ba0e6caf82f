//! HTML text extraction.
//!
//! Two extractors:
//! - `extract_generic`: first `<h1>` as title, every non-empty `<p>` as body
//! - `paragraph_text_nodes`: only the direct text children of `<p>`, used by
//!   the structured static-page crawl

use super::ParsedPage;
use crate::error::FetchError;
use scraper::{Html, Selector};

fn selector(css: &str) -> Result<Selector, FetchError> {
    Selector::parse(css).map_err(|e| FetchError::Parse(format!("selector {}: {:?}", css, e)))
}

/// Generic extractor for raw markup
pub fn extract_generic(markup: &str) -> Result<ParsedPage, FetchError> {
    let document = Html::parse_document(markup);
    let h1 = selector("h1")?;
    let p = selector("p")?;

    let title = document
        .select(&h1)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let body_text = document
        .select(&p)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    Ok(ParsedPage { title, body_text })
}

/// Paragraph-level text nodes only (text directly inside `<p>`, not inside
/// nested inline elements), trimmed, non-empty, newline-joined
pub fn paragraph_text_nodes(markup: &str) -> Result<String, FetchError> {
    let document = Html::parse_document(markup);
    let p = selector("p")?;

    let mut nodes = Vec::new();
    for paragraph in document.select(&p) {
        for child in paragraph.children() {
            if let Some(text) = child.value().as_text() {
                let text = text.trim();
                if !text.is_empty() {
                    nodes.push(text.to_string());
                }
            }
        }
    }

    Ok(nodes.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = r#"<html><head><title>Tab title</title></head><body>
        <h1> Rust 2.0 Released </h1>
        <h1>Second heading</h1>
        <p>The Rust team announced a <a href="/x">new edition</a> today.</p>
        <p>   </p>
        <div><p>Nested paragraph.</p></div>
        </body></html>"#;

    #[test]
    fn test_generic_uses_first_h1() {
        let page = extract_generic(ARTICLE).unwrap();
        assert_eq!(page.title, "Rust 2.0 Released");
    }

    #[test]
    fn test_generic_joins_non_empty_paragraphs() {
        let page = extract_generic(ARTICLE).unwrap();
        assert_eq!(
            page.body_text,
            "The Rust team announced a new edition today.\nNested paragraph."
        );
    }

    #[test]
    fn test_generic_without_h1_has_empty_title() {
        let page = extract_generic("<p>only text</p>").unwrap();
        assert_eq!(page.title, "");
        assert_eq!(page.body_text, "only text");
    }

    #[test]
    fn test_text_nodes_skip_inline_children() {
        let text = paragraph_text_nodes(ARTICLE).unwrap();
        assert_eq!(text, "The Rust team announced a\ntoday.\nNested paragraph.");
    }

    #[test]
    fn test_plain_text_has_no_paragraphs() {
        let page = extract_generic("just some words").unwrap();
        assert!(page.body_text.is_empty());
        assert!(paragraph_text_nodes("just some words").unwrap().is_empty());
    }
}
