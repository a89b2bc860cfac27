//! Slide document model
//!
//! An ordered sequence of slide markup blocks plus the "current slide"
//! cursor. Pure data: no I/O, no locking. The runtime shares one
//! [`Presentation`] between the tool dispatcher (sole writer) and the HTTP
//! surface (readers, plus renderer navigation).

mod theme;

#[cfg(test)]
mod proptests;

pub use theme::Theme;

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors from index-based document operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeckError {
    #[error("Invalid slide index: {0}")]
    InvalidIndex(usize),
    /// Index supplied by the model was negative (never valid)
    #[error("Invalid slide index: {0}")]
    NegativeIndex(i64),
    #[error("Cannot delete the last remaining slide")]
    LastSlide,
}

/// Ordered slide contents and the cursor into them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SlideDeck {
    slides: Vec<String>,
    current_index: usize,
}

impl SlideDeck {
    #[cfg(test)]
    pub fn from_slides(slides: Vec<String>) -> Self {
        Self {
            slides,
            current_index: 0,
        }
    }

    /// Insert at `position` when it lies in `[0, len]`, otherwise append.
    ///
    /// Returns the final index of the inserted slide. The cursor is not
    /// moved here; callers navigate explicitly.
    pub fn add_slide(&mut self, content: impl Into<String>, position: Option<usize>) -> usize {
        match position {
            Some(pos) if pos <= self.slides.len() => {
                self.slides.insert(pos, content.into());
                pos
            }
            _ => {
                self.slides.push(content.into());
                self.slides.len() - 1
            }
        }
    }

    /// Replace the content of an existing slide in place
    pub fn update_slide(
        &mut self,
        index: usize,
        content: impl Into<String>,
    ) -> Result<(), DeckError> {
        let slot = self
            .slides
            .get_mut(index)
            .ok_or(DeckError::InvalidIndex(index))?;
        *slot = content.into();
        Ok(())
    }

    /// Remove a slide. The document never drops to zero slides this way.
    ///
    /// When the removed slide was at or before the cursor, the cursor steps
    /// back one slide (clamped to 0) so it keeps naming a live slide.
    pub fn delete_slide(&mut self, index: usize) -> Result<(), DeckError> {
        if index >= self.slides.len() {
            return Err(DeckError::InvalidIndex(index));
        }
        if self.slides.len() == 1 {
            return Err(DeckError::LastSlide);
        }

        self.slides.remove(index);
        if index <= self.current_index {
            self.current_index = self.current_index.saturating_sub(1);
        }
        self.clamp_cursor();
        Ok(())
    }

    /// Move the slide at `from` so it ends up at `to`.
    ///
    /// `to` is interpreted against the sequence with `from` already removed;
    /// a `to` at or past the shortened length means "move to end". The
    /// cursor follows the moved slide. Returns the slide's final index.
    pub fn reorder_slide(&mut self, from: usize, to: usize) -> Result<usize, DeckError> {
        let len = self.slides.len();
        if from >= len {
            return Err(DeckError::InvalidIndex(from));
        }
        if to >= len {
            return Err(DeckError::InvalidIndex(to));
        }

        let slide = self.slides.remove(from);
        let target = to.min(self.slides.len());
        self.slides.insert(target, slide);
        self.current_index = target;
        Ok(target)
    }

    #[cfg(test)]
    pub fn slide_content(&self, index: usize) -> Option<&str> {
        self.slides.get(index).map(String::as_str)
    }

    pub fn slides(&self) -> &[String] {
        &self.slides
    }

    pub fn total_slides(&self) -> usize {
        self.slides.len()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// Move the cursor, clamping silently into range. An index equal to
    /// the length (append race with the renderer) lands on the last slide.
    pub fn navigate_to_slide(&mut self, index: usize) -> usize {
        self.current_index = index;
        self.clamp_cursor();
        self.current_index
    }

    /// Wholesale swap. Zero slides is a legal result here.
    pub fn replace_all_slides(&mut self, slides: Vec<String>) {
        self.slides = slides;
        self.current_index = 0;
    }

    pub fn clear_all_slides(&mut self) {
        self.replace_all_slides(Vec::new());
    }

    fn clamp_cursor(&mut self) {
        self.current_index = self.current_index.min(self.slides.len().saturating_sub(1));
    }
}

/// The document plus presentation-wide settings that live outside it
#[derive(Debug, Clone, Default, Serialize)]
pub struct Presentation {
    pub deck: SlideDeck,
    pub theme: Theme,
}

/// Snapshot sent to the renderer when it must re-derive its view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeckSnapshot {
    pub slides: Vec<String>,
    pub current_index: usize,
    pub total_slides: usize,
    pub theme: Theme,
}

impl Presentation {
    pub fn snapshot(&self) -> DeckSnapshot {
        DeckSnapshot {
            slides: self.deck.slides().to_vec(),
            current_index: self.deck.current_index(),
            total_slides: self.deck.total_slides(),
            theme: self.theme,
        }
    }
}

/// Presentation shared between the dispatcher and readers
pub type SharedPresentation = Arc<RwLock<Presentation>>;

/// Notification interface towards the renderer
pub trait DeckObserver: Send + Sync {
    /// Slides or theme changed; the renderer must re-sync from the snapshot
    fn slides_changed(&self, snapshot: DeckSnapshot);

    /// Cursor moved programmatically
    fn navigated(&self, index: usize);
}
