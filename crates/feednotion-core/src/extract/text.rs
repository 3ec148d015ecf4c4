use scraper::{ElementRef, Html, Selector};

use crate::{Error, Result};

/// Candidate article containers, most specific first
const CONTAINER_SELECTORS: &[&str] = &[
    "article",
    "main",
    ".post-content",
    ".entry-content",
    ".td-post-content",
    "div[class*=\"article-content\"]",
    "div[class*=\"story-body\"]",
];

const IGNORED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| Error::Extraction(format!("Invalid selector {}: {:?}", css, e)))
}

/// Text nodes under `element`, minus script/style content
fn visible_text_nodes<'a>(element: ElementRef<'a>) -> Vec<&'a str> {
    element
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .map(|e| IGNORED_ELEMENTS.contains(&e.name()))
                    .unwrap_or(false)
            });
            if hidden {
                None
            } else {
                Some(&**text)
            }
        })
        .collect()
}

fn collapse_whitespace(parts: &[&str]) -> String {
    parts
        .iter()
        .flat_map(|part| part.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Locate the element most likely to hold the article body
fn find_container<'a>(document: &'a Html) -> Result<Option<ElementRef<'a>>> {
    for css in CONTAINER_SELECTORS {
        if let Some(found) = document.select(&selector(css)?).next() {
            tracing::debug!("Found article container with selector: {}", css);
            return Ok(Some(found));
        }
    }

    tracing::debug!("No article container found, falling back to body");
    Ok(document.select(&selector("body")?).next())
}

/// Extract the readable text of an HTML page
///
/// Paragraphs of the best container are joined by newlines. A container without
/// `<p>` elements contributes each of its text nodes as one line. The result may
/// be empty.
pub fn extract_text(html: &str) -> Result<String> {
    let document = Html::parse_document(html);

    let Some(container) = find_container(&document)? else {
        return Ok(String::new());
    };

    let paragraph = selector("p")?;
    let paragraphs: Vec<String> = container
        .select(&paragraph)
        .map(|p| collapse_whitespace(&visible_text_nodes(p)))
        .filter(|text| !text.is_empty())
        .collect();

    let text = if container.select(&paragraph).next().is_some() {
        paragraphs.join("\n")
    } else {
        visible_text_nodes(container)
            .into_iter()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    };

    Ok(text.trim().to_string())
}
