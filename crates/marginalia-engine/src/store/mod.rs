/*!
The document store collaborator: saved articles plus their highlights,
annotations and notes.

The engine never talks to a backend directly; everything goes through
[`ArticleStore`], which an embedding supplies. [`MemoryStore`] is the
reference implementation used by tests and the terminal frontend.
Records are scoped to the authenticated owner, and the store itself
reports authorization failures; the engine only surfaces them.
*/

mod memory;

pub use memory::MemoryStore;

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Owner identity as reported by the host's authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(subject: impl Into<String>) -> Self {
        Self(subject.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for a saved article.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize,
)]
pub struct ArticleId(Uuid);

impl ArticleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ArticleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for a highlight or annotation.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize,
)]
pub struct SpanId(Uuid);

impl SpanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SpanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A saved article. `content` is the markdown source that every offset
/// in the system points into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub created_at_ms: u64,
}

impl Article {
    /// Hostname of the source link for compact display next to the
    /// title.
    pub fn source_host(&self) -> Option<String> {
        self.url.as_deref().map(display_host)
    }
}

/// Hostname of a link with a leading `www.` stripped. Input that does
/// not parse as an absolute URL is returned unchanged.
pub fn display_host(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => match url.host_str() {
            Some(host) => host.strip_prefix("www.").unwrap_or(host).to_string(),
            None => raw.to_string(),
        },
        Err(_) => raw.to_string(),
    }
}

/// A saved highlight over an article's plain-text projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub id: SpanId,
    pub article_id: ArticleId,
    /// Substring captured at creation time, kept for display only; it is
    /// never re-validated against the live document.
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
}

impl Highlight {
    pub fn range(&self) -> Range<usize> {
        self.start_offset..self.end_offset
    }
}

/// A margin annotation: a highlighted range plus a comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: SpanId,
    pub article_id: ArticleId,
    /// Substring captured at creation time, kept for display only.
    pub text: String,
    pub comment: String,
    pub start_offset: usize,
    pub end_offset: usize,
}

impl Annotation {
    pub fn range(&self) -> Range<usize> {
        self.start_offset..self.end_offset
    }
}

/// Free-form notes attached to an article, one per reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub article_id: ArticleId,
    pub content: String,
}

/// Input for [`ArticleStore::create_article`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub title: String,
    pub url: Option<String>,
    pub description: Option<String>,
    pub authors: Vec<String>,
    pub content: String,
}

/// Input for [`ArticleStore::create_highlight`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewHighlight {
    pub article_id: ArticleId,
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
}

/// Input for [`ArticleStore::create_annotation`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnnotation {
    pub article_id: ArticleId,
    pub text: String,
    pub comment: String,
    pub start_offset: usize,
    pub end_offset: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Unauthenticated")]
    Unauthenticated,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0} not found")]
    NotFound(&'static str),
}

/// Store operations the reading session depends on.
///
/// Every call is implicitly scoped to the authenticated caller: reads
/// against no identity come back empty the way a signed-out listing
/// would, mutations fail with [`StoreError::Unauthenticated`], and
/// touching another owner's record fails with
/// [`StoreError::Unauthorized`].
pub trait ArticleStore {
    /// Saved articles for the current identity, newest first.
    fn list_articles(&self) -> Result<Vec<Article>, StoreError>;

    /// A single article; `None` when it does not exist or belongs to
    /// someone else.
    fn article(&self, id: ArticleId) -> Result<Option<Article>, StoreError>;

    fn create_article(&mut self, article: NewArticle) -> Result<Article, StoreError>;

    /// Full-document replace. There is no patch operation; block edits
    /// reassemble the whole source before saving.
    fn update_article_content(&mut self, id: ArticleId, content: &str) -> Result<(), StoreError>;

    fn highlights(&self, article: ArticleId) -> Result<Vec<Highlight>, StoreError>;

    fn create_highlight(&mut self, highlight: NewHighlight) -> Result<Highlight, StoreError>;

    fn remove_highlight(&mut self, id: SpanId) -> Result<(), StoreError>;

    fn annotations(&self, article: ArticleId) -> Result<Vec<Annotation>, StoreError>;

    fn create_annotation(&mut self, annotation: NewAnnotation) -> Result<Annotation, StoreError>;

    /// Replace an annotation's comment.
    fn update_annotation(&mut self, id: SpanId, comment: &str) -> Result<(), StoreError>;

    fn remove_annotation(&mut self, id: SpanId) -> Result<(), StoreError>;

    fn note(&self, article: ArticleId) -> Result<Option<Note>, StoreError>;

    fn upsert_note(&mut self, article: ArticleId, content: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    // ============ display_host tests ============

    #[rstest]
    #[case("https://example.com/a/b?c=1", "example.com")]
    #[case("https://www.example.com/x", "example.com")]
    #[case("https://docs.www2.example.com", "docs.www2.example.com")]
    #[case("not a url", "not a url")]
    fn test_display_host(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(display_host(input), expected);
    }

    #[test]
    fn test_source_host_comes_from_article_url() {
        let article = Article {
            id: ArticleId::new(),
            title: "t".to_string(),
            url: Some("https://www.example.org/read".to_string()),
            description: None,
            authors: Vec::new(),
            content: String::new(),
            created_at_ms: 0,
        };
        assert_eq!(article.source_host(), Some("example.org".to_string()));

        let bare = Article { url: None, ..article };
        assert_eq!(bare.source_host(), None);
    }

    // ============ model tests ============

    #[test]
    fn test_span_ranges_are_half_open() {
        let h = Highlight {
            id: SpanId::new(),
            article_id: ArticleId::new(),
            text: "world".to_string(),
            start_offset: 6,
            end_offset: 11,
        };
        assert_eq!(h.range(), 6..11);
    }

    #[test]
    fn test_store_error_messages_match_store_vocabulary() {
        assert_eq!(StoreError::Unauthenticated.to_string(), "Unauthenticated");
        assert_eq!(StoreError::Unauthorized.to_string(), "Unauthorized");
        assert_eq!(
            StoreError::NotFound("Highlight").to_string(),
            "Highlight not found"
        );
    }
}
