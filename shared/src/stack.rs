//! Card stack controller: the only code that mutates the card collection and
//! the active cursor.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::StackConfig;
use crate::cyclic::{CyclicCardIndex, IndexError};
use crate::gesture::{DragState, GestureRelease, GestureTracker};
use crate::layout::{CardTransform, StackLayoutEngine};
use crate::model::{Card, CardId, ImageAsset, ViewConfig, WeatherSnapshot};
use crate::{AppError, ErrorKind};

/// Offsets considered for rendering, in priority order. When the collection
/// is smaller than the window, the first offset to claim a card wins.
const WINDOW_OFFSETS: [i32; 7] = [0, 1, 2, 3, 4, -1, -2];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    #[error("the card collection is empty")]
    EmptyCollection,
    #[error("stack gestures are disabled")]
    GesturesDisabled,
    #[error("a drag is in progress")]
    DragInProgress,
    #[error("no visible card at offset {0}")]
    NotVisible(i32),
    #[error("card not found: {0}")]
    UnknownCard(CardId),
}

impl StackError {
    /// Input errors are dropped without telling the user.
    #[must_use]
    pub const fn is_silent(&self) -> bool {
        !matches!(self, Self::UnknownCard(_))
    }
}

impl From<IndexError> for StackError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::EmptyCollection => Self::EmptyCollection,
        }
    }
}

impl From<StackError> for AppError {
    fn from(e: StackError) -> Self {
        let kind = match &e {
            StackError::UnknownCard(_) => ErrorKind::NotFound,
            StackError::EmptyCollection
            | StackError::GesturesDisabled
            | StackError::DragInProgress
            | StackError::NotVisible(_) => ErrorKind::InvalidState,
        };
        AppError::new(kind, e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSlot {
    pub relative_offset: i32,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemovedCard {
    pub card: Card,
    pub became_empty: bool,
}

#[derive(Debug)]
pub struct CardStack {
    cards: Vec<Card>,
    cursor: CyclicCardIndex,
    gesture: GestureTracker,
    max_stacked_behind: usize,
    mode_allows_gestures: bool,
}

impl Default for CardStack {
    fn default() -> Self {
        Self::new(&StackConfig::default())
    }
}

impl CardStack {
    #[must_use]
    pub fn new(config: &StackConfig) -> Self {
        let mut stack = Self {
            cards: Vec::new(),
            cursor: CyclicCardIndex::default(),
            gesture: GestureTracker::new(config),
            max_stacked_behind: config.max_stacked_behind,
            mode_allows_gestures: true,
        };
        stack.sync_gesture_gate();
        stack
    }

    pub fn apply_config(&mut self, config: &StackConfig) {
        self.gesture.apply_config(config);
        self.max_stacked_behind = config.max_stacked_behind;
    }

    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    #[must_use]
    pub const fn cursor(&self) -> i64 {
        self.cursor.raw()
    }

    #[must_use]
    pub fn active_position(&self) -> Option<usize> {
        self.cursor.position(self.cards.len()).ok()
    }

    #[must_use]
    pub fn active_card(&self) -> Option<&Card> {
        self.active_position().and_then(|p| self.cards.get(p))
    }

    #[must_use]
    pub fn card(&self, id: &CardId) -> Option<&Card> {
        self.cards.iter().find(|c| &c.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &CardId) -> bool {
        self.card(id).is_some()
    }

    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        self.gesture.is_dragging()
    }

    #[must_use]
    pub fn drag_state(&self) -> DragState {
        self.gesture.drag_state()
    }

    #[must_use]
    pub const fn gestures_enabled(&self) -> bool {
        self.gesture.is_enabled()
    }

    /// Called by the view-mode coordinator side: gestures only run in Stack mode.
    pub fn set_mode_allows_gestures(&mut self, allowed: bool) {
        self.mode_allows_gestures = allowed;
        self.sync_gesture_gate();
    }

    fn sync_gesture_gate(&mut self) {
        let enabled = self.mode_allows_gestures && !self.cards.is_empty();
        self.gesture.set_enabled(enabled);
    }

    fn guard_gesture(&self) -> Result<(), StackError> {
        if self.cards.is_empty() {
            return Err(StackError::EmptyCollection);
        }
        if !self.gesture.is_enabled() {
            return Err(StackError::GesturesDisabled);
        }
        Ok(())
    }

    pub fn begin_drag(&mut self, x: f64) -> Result<(), StackError> {
        self.guard_gesture()?;
        self.gesture.on_pointer_down(x);
        Ok(())
    }

    pub fn update_drag(&mut self, x: f64) -> Result<Option<f64>, StackError> {
        self.guard_gesture()?;
        Ok(self.gesture.on_pointer_move(x))
    }

    /// Ends the gesture; a committed swipe moves the cursor by exactly one.
    pub fn end_drag(&mut self) -> Result<Option<GestureRelease>, StackError> {
        self.guard_gesture()?;
        let release = self.gesture.on_pointer_up();
        if let Some(direction) = release.and_then(|r| r.committed) {
            self.cursor.advance(direction.step());
            debug!(cursor = self.cursor.raw(), ?direction, "swipe committed");
        }
        Ok(release)
    }

    pub fn cancel_drag(&mut self) {
        self.gesture.reset();
    }

    /// The card to expand. Refused while dragging and for the click that
    /// trails a drag release.
    pub fn select_active(&self) -> Result<CardId, StackError> {
        self.guard_gesture()?;
        if self.gesture.is_dragging() || self.gesture.released_from_drag() {
            return Err(StackError::DragInProgress);
        }
        self.active_card()
            .map(|c| c.id.clone())
            .ok_or(StackError::EmptyCollection)
    }

    /// Brings a visible non-active card to the front by moving the cursor by
    /// its offset.
    pub fn jump_to(&mut self, relative_offset: i32) -> Result<(), StackError> {
        self.guard_gesture()?;
        if self.gesture.is_dragging() || self.gesture.released_from_drag() {
            return Err(StackError::DragInProgress);
        }
        if !self
            .visible_window()
            .iter()
            .any(|s| s.relative_offset == relative_offset)
        {
            return Err(StackError::NotVisible(relative_offset));
        }
        self.cursor.advance(i64::from(relative_offset));
        Ok(())
    }

    pub fn navigate(&mut self, delta: i64) -> Result<(), StackError> {
        self.guard_gesture()?;
        if self.gesture.is_dragging() {
            return Err(StackError::DragInProgress);
        }
        self.cursor.advance(delta);
        Ok(())
    }

    /// Appends a saved card and makes it active.
    pub fn push_and_activate(&mut self, card: Card) -> usize {
        let position = self.cards.len();
        self.cards.push(card);
        self.cursor.set(i64::try_from(position).unwrap_or(i64::MAX));
        self.sync_gesture_gate();
        position
    }

    /// Removes a card. The cursor keeps its raw value, so the active position
    /// is preserved and the logical active card may shift.
    pub fn remove_card(&mut self, id: &CardId) -> Result<RemovedCard, StackError> {
        let index = self
            .cards
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| StackError::UnknownCard(id.clone()))?;
        let card = self.cards.remove(index);
        let became_empty = self.cards.is_empty();
        if became_empty {
            self.cursor.reset();
        }
        self.gesture.reset();
        self.sync_gesture_gate();
        Ok(RemovedCard { card, became_empty })
    }

    fn card_mut(&mut self, id: &CardId) -> Result<&mut Card, StackError> {
        self.cards
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| StackError::UnknownCard(id.clone()))
    }

    pub fn apply_refresh(
        &mut self,
        id: &CardId,
        weather: WeatherSnapshot,
        image: ImageAsset,
    ) -> Result<(), StackError> {
        self.card_mut(id)?.apply_refresh(weather, image);
        Ok(())
    }

    pub fn apply_image_edit(&mut self, id: &CardId, image: ImageAsset) -> Result<(), StackError> {
        self.card_mut(id)?.apply_image_edit(image);
        Ok(())
    }

    pub fn set_view_config(&mut self, id: &CardId, config: ViewConfig) -> Result<(), StackError> {
        self.card_mut(id)?.set_view_config(config);
        Ok(())
    }

    /// Offsets to render around the active card. Positive offsets stop at
    /// `min(len, max_stacked_behind)`, and no physical card appears twice.
    #[must_use]
    pub fn visible_window(&self) -> Vec<WindowSlot> {
        let len = self.cards.len();
        let positive_limit = i32::try_from(len.min(self.max_stacked_behind)).unwrap_or(i32::MAX);
        let mut slots: Vec<WindowSlot> = Vec::with_capacity(WINDOW_OFFSETS.len());

        for offset in WINDOW_OFFSETS {
            if len == 1 && offset != 0 {
                continue;
            }
            if offset > 0 && offset >= positive_limit {
                continue;
            }
            let Ok(position) = self.cursor.position_at(i64::from(offset), len) else {
                return Vec::new();
            };
            if slots.iter().any(|s| s.position == position) {
                continue;
            }
            slots.push(WindowSlot {
                relative_offset: offset,
                position,
            });
        }

        slots.sort_by_key(|s| s.relative_offset);
        slots
    }

    /// Visible cards with their transforms for the current drag.
    #[must_use]
    pub fn layout(&self, engine: &StackLayoutEngine, drag_normalized: f64) -> Vec<(WindowSlot, &Card, CardTransform)> {
        let dragging = self.gesture.is_dragging();
        self.visible_window()
            .into_iter()
            .filter_map(|slot| {
                let card = self.cards.get(slot.position)?;
                let transform = engine.compute_transform(slot.relative_offset, drag_normalized, dragging);
                Some((slot, card, transform))
            })
            .collect()
    }
}
