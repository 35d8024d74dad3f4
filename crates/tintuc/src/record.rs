// ABOUTME: ArticleRecord struct holding the data extracted from one article page.
// ABOUTME: Field order is the serialized key order; absent fields serialize as null.

use serde::{Deserialize, Serialize};

/// Placeholder written into every record's `label` field.
pub const LABEL_PLACEHOLDER: &str = "...";

/// Content-type tag for pages of a registered site.
pub const TYPE_ARTICLE: &str = "article";

/// Content-type tag for pages of any other site.
pub const TYPE_UNKNOWN: &str = "unknown";

/// The data extracted from one article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub author: Option<String>,
    pub copyright: Option<String>,
    pub date_published: Option<String>,
    pub date_modified: Option<String>,
    pub language: Option<String>,
    /// Id of the site profile the page was matched against.
    pub source: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Body text selected under the extractor's policy.
    #[serde(rename = "paragraphs")]
    pub body: Option<String>,
    /// Canonical URL as announced by the page.
    pub url: Option<String>,
    pub image: Option<String>,
    pub label: String,
    #[serde(rename = "type")]
    pub content_type: String,
}

impl ArticleRecord {
    /// An empty record for `source` with the given content-type tag.
    pub fn new(source: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            author: None,
            copyright: None,
            date_published: None,
            date_modified: None,
            language: None,
            source: source.into(),
            title: None,
            description: None,
            body: None,
            url: None,
            image: None,
            label: LABEL_PLACEHOLDER.to_string(),
            content_type: content_type.into(),
        }
    }

    /// Number of whitespace-separated words in the body.
    pub fn word_count(&self) -> usize {
        self.body.as_deref().map_or(0, |b| b.split_whitespace().count())
    }
}
