//! HTML to plain text conversion for body excerpts.

use scraper::{ElementRef, Html, Node};

use crate::utils::normalize_whitespace;

/// Elements whose text never reaches the excerpt
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Converts an HTML body into single-line plain text.
///
/// Drops `<script>`/`<style>` content and all markup, decodes entities and
/// collapses whitespace. Block boundaries become spaces so words from adjacent
/// cells or paragraphs do not run together.
pub fn html_to_text(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let document = Html::parse_document(html);
    let mut text = String::with_capacity(html.len() / 2);
    for node in document.root_element().descendants() {
        let Node::Text(fragment) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ElementRef::wrap(ancestor)
                .is_some_and(|element| HIDDEN_ELEMENTS.contains(&element.value().name()))
        });
        if !hidden {
            text.push_str(fragment);
            text.push(' ');
        }
    }
    normalize_whitespace(&text)
}
