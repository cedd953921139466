/*!
Per-article reader notes with debounced autosave.

Notes are a single free-form text blob per reader per article, separate
from annotations. The panel owns the draft and schedules writes through
a [`Debouncer`] so a typing burst costs one store round trip.
*/

use std::time::Instant;

use crate::schedule::{Debouncer, NOTE_SAVE_DEBOUNCE};
use crate::store::{ArticleId, ArticleStore, StoreError};

/// Notes editor state for one open article.
///
/// Autosave only arms once the stored note has been loaded, so an empty
/// draft can never clobber content that simply had not arrived yet.
pub struct NotesPanel {
    article_id: ArticleId,
    draft: String,
    loaded: bool,
    save_timer: Debouncer,
}

impl NotesPanel {
    pub fn new(article_id: ArticleId) -> Self {
        Self {
            article_id,
            draft: String::new(),
            loaded: false,
            save_timer: Debouncer::new(NOTE_SAVE_DEBOUNCE),
        }
    }

    pub fn article_id(&self) -> ArticleId {
        self.article_id
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn save_pending(&self) -> bool {
        self.save_timer.is_armed()
    }

    /// Seed the draft from the store. Only the first load takes effect;
    /// repeated calls never overwrite local typing. An article with no
    /// stored note still counts as loaded, with an empty draft.
    pub fn load(&mut self, store: &dyn ArticleStore) -> Result<(), StoreError> {
        if self.loaded {
            return Ok(());
        }
        if let Some(note) = store.note(self.article_id)? {
            self.draft = note.content;
        }
        self.loaded = true;
        Ok(())
    }

    /// Replace the draft and arm the autosave timer. Edits before the
    /// first load are kept locally but not scheduled.
    pub fn set_draft(&mut self, text: impl Into<String>, now: Instant) {
        self.draft = text.into();
        if self.loaded {
            self.save_timer.arm(now);
        }
    }

    /// Run the autosave if its window has elapsed. Returns whether a
    /// write happened. A failed write leaves the timer armed so the
    /// draft is retried instead of dropped.
    pub fn tick(
        &mut self,
        store: &mut dyn ArticleStore,
        now: Instant,
    ) -> Result<bool, StoreError> {
        if !self.save_timer.fire_ready(now) {
            return Ok(false);
        }
        if let Err(err) = store.upsert_note(self.article_id, &self.draft) {
            log::warn!("note autosave failed, will retry: {err}");
            self.save_timer.arm(now);
            return Err(err);
        }
        Ok(true)
    }

    /// Save any unsaved draft immediately. Closing the panel calls this
    /// so the debounce window cannot swallow the last edit.
    pub fn flush(&mut self, store: &mut dyn ArticleStore) -> Result<(), StoreError> {
        if !self.save_timer.is_armed() {
            return Ok(());
        }
        store.upsert_note(self.article_id, &self.draft)?;
        self.save_timer.cancel();
        Ok(())
    }
}
