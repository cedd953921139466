/*!
Interactive reading session over one open article.

A [`ReadingSession`] owns the rendered tree plus the highlight and
annotation state layered on top of it. Span mutations are optimistic:
the marker paints (or disappears) immediately, the store write follows,
and a rejected write rolls the local state back to what the store still
holds. Card layout runs through a debounce window so that a burst of
annotation churn costs one pass.
*/

use std::collections::HashMap;
use std::ops::Range;
use std::time::Instant;

use crate::annotate::{
    self, OverlayReport, PaintSpan, SelectionRange, SpanKind, apply_overlay, resolve_offsets,
};
use crate::layout::{self, CardAnchor, DEFAULT_CARD_HEIGHT, MIN_GAP};
use crate::render::{self, NodeId, RenderTree};
use crate::schedule::{Debouncer, LAYOUT_DEBOUNCE};
use crate::store::{
    Annotation, Article, ArticleId, ArticleStore, Highlight, NewAnnotation, NewHighlight, SpanId,
    StoreError,
};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Article not found: {0}")]
    ArticleNotFound(ArticleId),
    #[error("Nothing is selected")]
    NoSelection,
    #[error("No annotation is being composed")]
    NoPendingAnnotation,
    #[error("Annotation comment is empty")]
    EmptyComment,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A resolved text selection over the current render tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub range: Range<usize>,
    /// Selected substring of the plain-text projection, captured here so
    /// span records keep their display text even after the document
    /// changes underneath them.
    pub text: String,
}

/// An annotation being composed: painted like a saved one, but not in
/// the store until [`ReadingSession::commit_annotation`].
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAnnotation {
    pub id: SpanId,
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    /// Marker position captured when composition started, used until the
    /// first layout pass places the card properly.
    pub initial_top: Option<f32>,
}

/// Geometry a frontend reports for one annotation card during layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardMetrics {
    /// Top of the span's first marker, in content coordinates.
    pub anchor_top: f32,
    /// Measured card height; `None` falls back to
    /// [`DEFAULT_CARD_HEIGHT`].
    pub card_height: Option<f32>,
}

/// One open article with live highlight and annotation state.
///
/// The session holds no store reference; every operation that persists
/// something takes the store as an argument, so the same session works
/// against any [`ArticleStore`] implementation.
#[derive(Debug)]
pub struct ReadingSession {
    article: Article,
    tree: RenderTree,
    highlights: Vec<Highlight>,
    annotations: Vec<Annotation>,
    selection: Option<Selection>,
    pending: Option<PendingAnnotation>,
    active_annotation: Option<SpanId>,
    positions: HashMap<SpanId, f32>,
    layout_timer: Debouncer,
    last_overlay: OverlayReport,
}

impl ReadingSession {
    /// Load an article and its spans, render the tree, and paint the
    /// initial overlay.
    pub fn open(store: &dyn ArticleStore, id: ArticleId) -> Result<Self, SessionError> {
        let article = store.article(id)?.ok_or(SessionError::ArticleNotFound(id))?;
        let highlights = store.highlights(id)?;
        let annotations = store.annotations(id)?;
        let mut session = Self {
            tree: render::render_markdown(&article.content),
            article,
            highlights,
            annotations,
            selection: None,
            pending: None,
            active_annotation: None,
            positions: HashMap::new(),
            layout_timer: Debouncer::new(LAYOUT_DEBOUNCE),
            last_overlay: OverlayReport::default(),
        };
        session.repaint();
        session.layout_timer.arm(Instant::now());
        Ok(session)
    }

    pub fn article(&self) -> &Article {
        &self.article
    }

    pub fn tree(&self) -> &RenderTree {
        &self.tree
    }

    pub fn highlights(&self) -> &[Highlight] {
        &self.highlights
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn pending(&self) -> Option<&PendingAnnotation> {
        self.pending.as_ref()
    }

    pub fn active_annotation(&self) -> Option<SpanId> {
        self.active_annotation
    }

    /// Outcome of the most recent overlay pass.
    pub fn overlay(&self) -> &OverlayReport {
        &self.last_overlay
    }

    // ============ selection ============

    /// Resolve a selection's node anchors to offsets and remember it for
    /// a follow-up highlight or annotation action.
    ///
    /// Returns `None` (and clears any prior selection) when either
    /// anchor cannot be mapped or the resolved range is empty; failed
    /// selections are a non-event for the reader.
    pub fn select(&mut self, range: &SelectionRange) -> Option<&Selection> {
        self.selection = None;
        let range = resolve_offsets(&self.tree, range)?;
        if range.is_empty() {
            return None;
        }
        let projection = self.tree.plain_text();
        let Some(text) = projection.get(range.clone()) else {
            log::debug!("selection {range:?} does not fall on character boundaries");
            return None;
        };
        self.selection = Some(Selection { range: range.clone(), text: text.to_string() });
        self.selection.as_ref()
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    // ============ highlights ============

    /// Save the current selection as a highlight. The marker paints
    /// immediately; a rejected store write rolls it back.
    pub fn add_highlight(&mut self, store: &mut dyn ArticleStore) -> Result<SpanId, SessionError> {
        let selection = self.selection.take().ok_or(SessionError::NoSelection)?;
        let provisional = Highlight {
            id: SpanId::new(),
            article_id: self.article.id,
            text: selection.text.clone(),
            start_offset: selection.range.start,
            end_offset: selection.range.end,
        };
        let provisional_id = provisional.id;
        self.highlights.push(provisional);
        self.repaint();

        match store.create_highlight(NewHighlight {
            article_id: self.article.id,
            text: selection.text,
            start_offset: selection.range.start,
            end_offset: selection.range.end,
        }) {
            Ok(saved) => {
                let id = saved.id;
                if let Some(slot) = self.highlights.iter_mut().find(|h| h.id == provisional_id) {
                    *slot = saved;
                }
                self.repaint();
                Ok(id)
            }
            Err(err) => {
                log::warn!("highlight save failed, rolling back: {err}");
                self.highlights.retain(|h| h.id != provisional_id);
                self.repaint();
                Err(err.into())
            }
        }
    }

    /// Remove a highlight, restoring it if the store refuses.
    pub fn remove_highlight(
        &mut self,
        store: &mut dyn ArticleStore,
        id: SpanId,
    ) -> Result<(), SessionError> {
        let index = self
            .highlights
            .iter()
            .position(|h| h.id == id)
            .ok_or(StoreError::NotFound("Highlight"))?;
        let removed = self.highlights.remove(index);
        self.repaint();

        if let Err(err) = store.remove_highlight(id) {
            log::warn!("highlight removal failed, restoring: {err}");
            self.highlights.insert(index, removed);
            self.repaint();
            return Err(err.into());
        }
        Ok(())
    }

    // ============ annotations ============

    /// Begin composing an annotation over the current selection.
    ///
    /// The range paints right away so the reader sees what the comment
    /// will attach to. `anchor_top` seeds the card position until the
    /// first layout pass runs.
    pub fn start_annotation(&mut self, anchor_top: Option<f32>) -> Result<SpanId, SessionError> {
        let selection = self.selection.take().ok_or(SessionError::NoSelection)?;
        let pending = PendingAnnotation {
            id: SpanId::new(),
            text: selection.text,
            start_offset: selection.range.start,
            end_offset: selection.range.end,
            initial_top: anchor_top,
        };
        let id = pending.id;
        self.pending = Some(pending);
        self.active_annotation = Some(id);
        self.repaint();
        self.layout_timer.arm(Instant::now());
        Ok(id)
    }

    /// Drop the annotation being composed without saving it.
    pub fn cancel_annotation(&mut self) {
        if let Some(pending) = self.pending.take() {
            if self.active_annotation == Some(pending.id) {
                self.active_annotation = None;
            }
            self.repaint();
            self.layout_timer.arm(Instant::now());
        }
    }

    /// Save the annotation being composed with the given comment.
    ///
    /// Empty (or whitespace-only) comments are rejected and the pending
    /// annotation stays open. A rejected store write also restores it.
    pub fn commit_annotation(
        &mut self,
        store: &mut dyn ArticleStore,
        comment: &str,
    ) -> Result<SpanId, SessionError> {
        let comment = comment.trim();
        let pending = match self.pending.take() {
            None => return Err(SessionError::NoPendingAnnotation),
            Some(pending) if comment.is_empty() => {
                self.pending = Some(pending);
                return Err(SessionError::EmptyComment);
            }
            Some(pending) => pending,
        };

        let provisional = Annotation {
            id: pending.id,
            article_id: self.article.id,
            text: pending.text.clone(),
            comment: comment.to_string(),
            start_offset: pending.start_offset,
            end_offset: pending.end_offset,
        };
        self.annotations.push(provisional);
        self.repaint();
        self.layout_timer.arm(Instant::now());

        match store.create_annotation(NewAnnotation {
            article_id: self.article.id,
            text: pending.text.clone(),
            comment: comment.to_string(),
            start_offset: pending.start_offset,
            end_offset: pending.end_offset,
        }) {
            Ok(saved) => {
                let id = saved.id;
                if let Some(slot) = self.annotations.iter_mut().find(|a| a.id == pending.id) {
                    *slot = saved;
                }
                if self.active_annotation == Some(pending.id) {
                    self.active_annotation = Some(id);
                }
                self.repaint();
                Ok(id)
            }
            Err(err) => {
                log::warn!("annotation save failed, rolling back: {err}");
                self.annotations.retain(|a| a.id != pending.id);
                self.pending = Some(pending);
                self.repaint();
                Err(err.into())
            }
        }
    }

    /// Replace a saved annotation's comment, restoring the old text if
    /// the store refuses.
    pub fn edit_annotation(
        &mut self,
        store: &mut dyn ArticleStore,
        id: SpanId,
        comment: &str,
    ) -> Result<(), SessionError> {
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(SessionError::EmptyComment);
        }
        let slot = self
            .annotations
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(StoreError::NotFound("Annotation"))?;
        let previous = std::mem::replace(&mut slot.comment, comment.to_string());
        // Comment length changes the card height.
        self.layout_timer.arm(Instant::now());

        if let Err(err) = store.update_annotation(id, comment) {
            log::warn!("annotation edit failed, restoring: {err}");
            if let Some(slot) = self.annotations.iter_mut().find(|a| a.id == id) {
                slot.comment = previous;
            }
            return Err(err.into());
        }
        Ok(())
    }

    /// Delete a saved annotation, restoring it if the store refuses.
    pub fn delete_annotation(
        &mut self,
        store: &mut dyn ArticleStore,
        id: SpanId,
    ) -> Result<(), SessionError> {
        let index = self
            .annotations
            .iter()
            .position(|a| a.id == id)
            .ok_or(StoreError::NotFound("Annotation"))?;
        let removed = self.annotations.remove(index);
        if self.active_annotation == Some(id) {
            self.active_annotation = None;
        }
        self.repaint();
        self.layout_timer.arm(Instant::now());

        if let Err(err) = store.remove_annotation(id) {
            log::warn!("annotation removal failed, restoring: {err}");
            self.annotations.insert(index, removed);
            self.repaint();
            return Err(err.into());
        }
        Ok(())
    }

    pub fn set_active_annotation(&mut self, span: Option<SpanId>) {
        self.active_annotation = span;
    }

    // ============ marker interaction ============

    /// Resolve a click on a painted marker. Annotation markers activate
    /// their margin card; highlight markers are answered so the frontend
    /// can offer removal.
    pub fn handle_marker_click(&mut self, node: NodeId) -> Option<(SpanId, SpanKind)> {
        let (span, kind) = annotate::marker_at(&self.tree, node)?;
        if kind == SpanKind::Annotation {
            self.active_annotation = Some(span);
        }
        Some((span, kind))
    }

    /// First marker node carrying the given span, in document order.
    pub fn marker_node(&self, span: SpanId) -> Option<NodeId> {
        annotate::marker_node_for_span(&self.tree, span)
    }

    // ============ content ============

    /// Persist edited markdown and re-render.
    ///
    /// The store write happens first; the tree is only replaced once the
    /// save succeeds, so a rejected write leaves the reader showing what
    /// the store still holds. Span offsets are left untouched and simply
    /// repaint against the new text.
    pub fn save_content(
        &mut self,
        store: &mut dyn ArticleStore,
        content: &str,
    ) -> Result<(), SessionError> {
        store.update_article_content(self.article.id, content)?;
        self.article.content = content.to_string();
        self.tree = render::render_markdown(content);
        self.selection = None;
        self.repaint();
        self.layout_timer.arm(Instant::now());
        Ok(())
    }

    // ============ card layout ============

    /// Ask for a relayout; requests inside the debounce window collapse
    /// into one pass.
    pub fn schedule_layout(&mut self, now: Instant) {
        self.layout_timer.arm(now);
    }

    pub fn layout_pending(&self) -> bool {
        self.layout_timer.is_armed()
    }

    /// Run the layout pass if the debounce window has elapsed. Returns
    /// whether a pass ran.
    pub fn tick<F>(&mut self, now: Instant, measure: F) -> bool
    where
        F: FnMut(SpanId) -> Option<CardMetrics>,
    {
        if !self.layout_timer.fire_ready(now) {
            return false;
        }
        self.run_layout(measure);
        true
    }

    /// Immediate relayout. Viewport resizes skip the debounce because a
    /// stale frame after a resize is visibly wrong.
    pub fn handle_resize<F>(&mut self, measure: F)
    where
        F: FnMut(SpanId) -> Option<CardMetrics>,
    {
        self.layout_timer.cancel();
        self.run_layout(measure);
    }

    /// Current top for an annotation card: the last layout result,
    /// falling back to the position captured when composition started.
    pub fn card_top(&self, span: SpanId) -> Option<f32> {
        if let Some(top) = self.positions.get(&span) {
            return Some(*top);
        }
        match &self.pending {
            Some(pending) if pending.id == span => pending.initial_top,
            _ => None,
        }
    }

    fn run_layout<F>(&mut self, mut measure: F)
    where
        F: FnMut(SpanId) -> Option<CardMetrics>,
    {
        let mut cards: Vec<(usize, SpanId)> = self
            .annotations
            .iter()
            .map(|a| (a.start_offset, a.id))
            .chain(self.pending.iter().map(|p| (p.start_offset, p.id)))
            .collect();
        cards.sort_by_key(|(start, _)| *start);

        let mut anchors = Vec::with_capacity(cards.len());
        for (_, span) in cards {
            let Some(metrics) = measure(span) else {
                log::debug!("no measurable marker for annotation {span}, leaving its card unplaced");
                continue;
            };
            anchors.push(CardAnchor {
                id: span,
                ideal_top: metrics.anchor_top,
                height: metrics.card_height.unwrap_or(DEFAULT_CARD_HEIGHT),
            });
        }
        self.positions = layout::layout_cards(&anchors, MIN_GAP);
    }

    fn repaint(&mut self) {
        let annotations: Vec<PaintSpan> = self
            .annotations
            .iter()
            .map(|a| PaintSpan { id: a.id, kind: SpanKind::Annotation, range: a.range() })
            .chain(self.pending.iter().map(|p| PaintSpan {
                id: p.id,
                kind: SpanKind::Annotation,
                range: p.start_offset..p.end_offset,
            }))
            .collect();
        let highlights: Vec<PaintSpan> = self
            .highlights
            .iter()
            .map(|h| PaintSpan { id: h.id, kind: SpanKind::Highlight, range: h.range() })
            .collect();
        self.last_overlay = apply_overlay(&mut self.tree, &annotations, &highlights);
    }
}
