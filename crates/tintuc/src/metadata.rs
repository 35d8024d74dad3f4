// ABOUTME: Meta tag and JSON-LD extraction helpers for article metadata.
// ABOUTME: Tag candidates are tried in order; each JSON-LD key is searched independently.

//! Metadata extraction.
//!
//! Two sources are consulted:
//! - attribute lookups on plain tags, mostly `<meta property="og:..." content="...">`
//! - `<script type="application/ld+json">` structured-data blocks
//!
//! Key behaviors:
//! - Candidates are tried tag by tag, pair by pair; the first element that
//!   matches decides the result, even when it lacks the requested attribute.
//! - Malformed JSON-LD blocks are skipped.
//! - Nothing found is `None`, never an error.

use scraper::{Html, Selector};
use serde_json::Value;

/// Builds the selector for `tag[name="value"]`.
fn attr_selector(tag: &str, name: &str, value: &str) -> Option<Selector> {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    Selector::parse(&format!("{}[{}=\"{}\"]", tag, name, escaped)).ok()
}

/// Returns the `attr` value of the first element matching one of the candidates.
///
/// For each tag in `tags`, each `(attribute-name, attribute-value)` pair in
/// `pairs` is tried in order. The first element found decides the result:
/// its `attr` value, or `None` if it has no such attribute.
pub fn extract_tag(
    doc: &Html,
    tags: &[&str],
    pairs: &[(&str, &str)],
    attr: &str,
) -> Option<String> {
    for &tag in tags {
        for &(name, value) in pairs {
            let Some(sel) = attr_selector(tag, name, value) else {
                continue;
            };
            if let Some(el) = doc.select(&sel).next() {
                return el.value().attr(attr).map(str::to_string);
            }
        }
    }
    None
}

/// Returns the `content` attribute of the first `<meta>` matching one of `pairs`.
pub fn extract_meta(doc: &Html, pairs: &[(&str, &str)]) -> Option<String> {
    extract_tag(doc, &["meta"], pairs, "content")
}

/// Language candidates, most specific first. Falls back to [`DEFAULT_LANGUAGE`].
pub const LANGUAGE_CANDIDATES: &[(&str, &str)] = &[
    ("property", "og:locale"),
    ("name", "language"),
    ("itemprop", "inLanguage"),
];

pub const DEFAULT_LANGUAGE: &str = "vi";

/// Extracts the page language, defaulting to Vietnamese.
pub fn extract_language(doc: &Html) -> String {
    extract_meta(doc, LANGUAGE_CANDIDATES).unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
}

/// Parses every JSON-LD block of the document, in document order.
///
/// Blocks that are not valid JSON are skipped.
pub fn structured_blocks(doc: &Html) -> Vec<Value> {
    let Ok(selector) = Selector::parse(r#"script[type="application/ld+json"]"#) else {
        return Vec::new();
    };

    doc.select(&selector)
        .filter_map(|script| {
            let text = script.text().collect::<String>();
            match serde_json::from_str::<Value>(&text) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping malformed JSON-LD block");
                    None
                }
            }
        })
        .collect()
}

/// Looks up each key in the JSON-LD blocks of the document.
///
/// Returns one entry per key, in the same order as `keys`.
pub fn extract_structured(doc: &Html, keys: &[&str]) -> Vec<Option<Value>> {
    let blocks = structured_blocks(doc);
    keys.iter().map(|key| find_structured(&blocks, key)).collect()
}

/// Finds `key` in the first block (or first item of a list block) that has it.
///
/// The search stops at the first item containing the key even when its value
/// turns out to be unusable.
pub fn find_structured(blocks: &[Value], key: &str) -> Option<Value> {
    for block in blocks {
        let items: &[Value] = match block {
            Value::Array(items) => items,
            other => std::slice::from_ref(other),
        };
        for item in items {
            let Some(value) = item.as_object().and_then(|map| map.get(key)) else {
                continue;
            };
            let found = if key == "author" {
                author_name(value)
            } else {
                Some(value.clone())
            };
            return found.filter(|v| !v.is_null());
        }
    }
    None
}

/// Resolves an `author` value: an object's `name`, or the first list entry's `name`.
fn author_name(value: &Value) -> Option<Value> {
    match value {
        Value::Object(map) => map.get("name").cloned(),
        Value::Array(items) => items
            .first()
            .and_then(Value::as_object)
            .and_then(|map| map.get("name"))
            .cloned(),
        _ => None,
    }
}

/// Renders a JSON-LD value as record text: strings as-is, other scalars in JSON form.
pub fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Author and dates pulled from JSON-LD.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredFields {
    pub author: Option<String>,
    pub date_published: Option<String>,
    pub date_modified: Option<String>,
}

/// Extracts author, datePublished and dateModified from JSON-LD.
pub fn extract_structured_fields(doc: &Html) -> StructuredFields {
    let mut values = extract_structured(doc, &["author", "datePublished", "dateModified"])
        .into_iter()
        .map(|v| v.and_then(value_to_text));

    StructuredFields {
        author: values.next().flatten(),
        date_published: values.next().flatten(),
        date_modified: values.next().flatten(),
    }
}
