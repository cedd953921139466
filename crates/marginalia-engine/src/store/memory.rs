use std::collections::BTreeMap;

use super::{
    Annotation, Article, ArticleId, ArticleStore, Highlight, NewAnnotation, NewArticle,
    NewHighlight, Note, SpanId, StoreError, UserId,
};

/// In-memory [`ArticleStore`] backing tests and the terminal frontend.
///
/// One identity is active at a time; [`MemoryStore::sign_in`] and
/// [`MemoryStore::sign_out`] switch it. Timestamps come from an internal
/// counter that advances on every insert, so creation order is always
/// recoverable without a wall clock.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    identity: Option<UserId>,
    articles: BTreeMap<ArticleId, Owned<Article>>,
    highlights: BTreeMap<SpanId, Owned<Highlight>>,
    annotations: BTreeMap<SpanId, Owned<Annotation>>,
    notes: BTreeMap<(UserId, ArticleId), String>,
    clock_ms: u64,
}

#[derive(Debug, Clone)]
struct Owned<T> {
    owner: UserId,
    record: T,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&mut self, user: UserId) {
        self.identity = Some(user);
    }

    pub fn sign_out(&mut self) {
        self.identity = None;
    }

    pub fn identity(&self) -> Option<&UserId> {
        self.identity.as_ref()
    }

    /// Advance the fake wall clock feeding `created_at_ms`.
    pub fn advance_clock(&mut self, ms: u64) {
        self.clock_ms += ms;
    }

    fn require_identity(&self) -> Result<UserId, StoreError> {
        self.identity.clone().ok_or(StoreError::Unauthenticated)
    }

    fn tick(&mut self) -> u64 {
        let now = self.clock_ms;
        self.clock_ms += 1;
        now
    }
}

impl ArticleStore for MemoryStore {
    fn list_articles(&self) -> Result<Vec<Article>, StoreError> {
        let Some(user) = &self.identity else {
            return Ok(Vec::new());
        };
        let mut articles: Vec<Article> = self
            .articles
            .values()
            .filter(|owned| &owned.owner == user)
            .map(|owned| owned.record.clone())
            .collect();
        articles.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));
        Ok(articles)
    }

    fn article(&self, id: ArticleId) -> Result<Option<Article>, StoreError> {
        let Some(user) = &self.identity else {
            return Ok(None);
        };
        Ok(self
            .articles
            .get(&id)
            .filter(|owned| &owned.owner == user)
            .map(|owned| owned.record.clone()))
    }

    fn create_article(&mut self, article: NewArticle) -> Result<Article, StoreError> {
        let user = self.require_identity()?;
        let created_at_ms = self.tick();
        let record = Article {
            id: ArticleId::new(),
            title: article.title,
            url: article.url,
            description: article.description,
            authors: article.authors,
            content: article.content,
            created_at_ms,
        };
        self.articles.insert(
            record.id,
            Owned { owner: user, record: record.clone() },
        );
        Ok(record)
    }

    fn update_article_content(&mut self, id: ArticleId, content: &str) -> Result<(), StoreError> {
        let user = self.require_identity()?;
        let owned = self
            .articles
            .get_mut(&id)
            .ok_or(StoreError::NotFound("Article"))?;
        if owned.owner != user {
            return Err(StoreError::Unauthorized);
        }
        owned.record.content = content.to_string();
        Ok(())
    }

    fn highlights(&self, article: ArticleId) -> Result<Vec<Highlight>, StoreError> {
        let Some(user) = &self.identity else {
            return Ok(Vec::new());
        };
        Ok(self
            .highlights
            .values()
            .filter(|owned| &owned.owner == user && owned.record.article_id == article)
            .map(|owned| owned.record.clone())
            .collect())
    }

    fn create_highlight(&mut self, highlight: NewHighlight) -> Result<Highlight, StoreError> {
        let user = self.require_identity()?;
        let record = Highlight {
            id: SpanId::new(),
            article_id: highlight.article_id,
            text: highlight.text,
            start_offset: highlight.start_offset,
            end_offset: highlight.end_offset,
        };
        self.highlights.insert(
            record.id,
            Owned { owner: user, record: record.clone() },
        );
        Ok(record)
    }

    fn remove_highlight(&mut self, id: SpanId) -> Result<(), StoreError> {
        let user = self.require_identity()?;
        let owned = self
            .highlights
            .get(&id)
            .ok_or(StoreError::NotFound("Highlight"))?;
        if owned.owner != user {
            return Err(StoreError::Unauthorized);
        }
        self.highlights.remove(&id);
        Ok(())
    }

    fn annotations(&self, article: ArticleId) -> Result<Vec<Annotation>, StoreError> {
        let Some(user) = &self.identity else {
            return Ok(Vec::new());
        };
        Ok(self
            .annotations
            .values()
            .filter(|owned| &owned.owner == user && owned.record.article_id == article)
            .map(|owned| owned.record.clone())
            .collect())
    }

    fn create_annotation(&mut self, annotation: NewAnnotation) -> Result<Annotation, StoreError> {
        let user = self.require_identity()?;
        let record = Annotation {
            id: SpanId::new(),
            article_id: annotation.article_id,
            text: annotation.text,
            comment: annotation.comment,
            start_offset: annotation.start_offset,
            end_offset: annotation.end_offset,
        };
        self.annotations.insert(
            record.id,
            Owned { owner: user, record: record.clone() },
        );
        Ok(record)
    }

    fn update_annotation(&mut self, id: SpanId, comment: &str) -> Result<(), StoreError> {
        let user = self.require_identity()?;
        let owned = self
            .annotations
            .get_mut(&id)
            .ok_or(StoreError::NotFound("Annotation"))?;
        if owned.owner != user {
            return Err(StoreError::Unauthorized);
        }
        owned.record.comment = comment.to_string();
        Ok(())
    }

    fn remove_annotation(&mut self, id: SpanId) -> Result<(), StoreError> {
        let user = self.require_identity()?;
        let owned = self
            .annotations
            .get(&id)
            .ok_or(StoreError::NotFound("Annotation"))?;
        if owned.owner != user {
            return Err(StoreError::Unauthorized);
        }
        self.annotations.remove(&id);
        Ok(())
    }

    fn note(&self, article: ArticleId) -> Result<Option<Note>, StoreError> {
        let Some(user) = &self.identity else {
            return Ok(None);
        };
        Ok(self
            .notes
            .get(&(user.clone(), article))
            .map(|content| Note { article_id: article, content: content.clone() }))
    }

    fn upsert_note(&mut self, article: ArticleId, content: &str) -> Result<(), StoreError> {
        let user = self.require_identity()?;
        self.notes.insert((user, article), content.to_string());
        Ok(())
    }
}
