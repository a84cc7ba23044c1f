//! Which surface owns the screen: the stack, one expanded card, or an unsaved
//! preview. At most one overlay is active at a time.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::StackConfig;
use crate::model::{Card, CardId};
use crate::{AppError, ErrorKind};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ViewMode {
    #[default]
    Stack,
    Expanded {
        card_id: CardId,
    },
    Preview {
        card: Box<Card>,
    },
}

impl ViewMode {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Stack => "stack",
            Self::Expanded { .. } => "expanded",
            Self::Preview { .. } => "preview",
        }
    }
}

/// Animation the shell plays for the overlay that just closed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExitAnimation {
    Collapse,
    /// Dismissed by dragging down: the overlay leaves by a full viewport height.
    SlideDown { distance: f64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModeError {
    #[error("cannot enter {requested} while {current} is open")]
    Occupied {
        requested: &'static str,
        current: &'static str,
    },
    #[error("no {expected} view is open")]
    NotOpen { expected: &'static str },
    #[error("drag-to-dismiss needs the content scrolled to the top")]
    NotAtTop,
}

impl From<ModeError> for AppError {
    fn from(e: ModeError) -> Self {
        AppError::new(ErrorKind::InvalidState, e.to_string())
    }
}

/// Where a newly created preview went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewPlacement {
    Presented,
    /// Held until the expanded card is closed.
    Queued,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DismissDrag {
    start_y: f64,
    current_y: f64,
}

impl DismissDrag {
    fn distance(self) -> f64 {
        (self.current_y - self.start_y).max(0.0)
    }
}

#[derive(Debug)]
pub struct ViewModeCoordinator {
    mode: ViewMode,
    entering: bool,
    exit: Option<ExitAnimation>,
    scroll_offset: f64,
    dismiss: Option<DismissDrag>,
    queued_preview: Option<Box<Card>>,
    dismiss_threshold_px: f64,
}

impl Default for ViewModeCoordinator {
    fn default() -> Self {
        Self::new(&StackConfig::default())
    }
}

impl ViewModeCoordinator {
    #[must_use]
    pub fn new(config: &StackConfig) -> Self {
        Self {
            mode: ViewMode::Stack,
            entering: false,
            exit: None,
            scroll_offset: 0.0,
            dismiss: None,
            queued_preview: None,
            dismiss_threshold_px: config.dismiss_threshold_px,
        }
    }

    pub fn apply_config(&mut self, config: &StackConfig) {
        self.dismiss_threshold_px = config.dismiss_threshold_px;
    }

    #[must_use]
    pub const fn mode(&self) -> &ViewMode {
        &self.mode
    }

    #[must_use]
    pub const fn is_stack(&self) -> bool {
        matches!(self.mode, ViewMode::Stack)
    }

    #[must_use]
    pub fn expanded_card_id(&self) -> Option<&CardId> {
        match &self.mode {
            ViewMode::Expanded { card_id } => Some(card_id),
            _ => None,
        }
    }

    #[must_use]
    pub fn preview_card(&self) -> Option<&Card> {
        match &self.mode {
            ViewMode::Preview { card } => Some(card),
            _ => None,
        }
    }

    #[must_use]
    pub fn has_queued_preview(&self) -> bool {
        self.queued_preview.is_some()
    }

    #[must_use]
    pub const fn is_entering(&self) -> bool {
        self.entering
    }

    #[must_use]
    pub const fn exit_animation(&self) -> Option<ExitAnimation> {
        self.exit
    }

    #[must_use]
    pub const fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    /// Vertical offset of the overlay while it is being dragged down.
    #[must_use]
    pub fn dismiss_offset(&self) -> f64 {
        self.dismiss.map_or(0.0, DismissDrag::distance)
    }

    fn occupied(&self, requested: &'static str) -> ModeError {
        ModeError::Occupied {
            requested,
            current: self.mode.name(),
        }
    }

    fn open(&mut self, mode: ViewMode) {
        debug!(from = self.mode.name(), to = mode.name(), "view mode change");
        self.mode = mode;
        self.entering = true;
        self.scroll_offset = 0.0;
        self.dismiss = None;
    }

    pub fn enter_expanded(&mut self, card_id: CardId) -> Result<(), ModeError> {
        if !self.is_stack() {
            return Err(self.occupied("expanded"));
        }
        self.open(ViewMode::Expanded { card_id });
        Ok(())
    }

    /// Shows a freshly created card. While a card is expanded the preview is
    /// held back; an open preview rejects a second one.
    pub fn offer_preview(&mut self, card: Card) -> Result<PreviewPlacement, ModeError> {
        match self.mode {
            ViewMode::Stack => {
                self.open(ViewMode::Preview {
                    card: Box::new(card),
                });
                Ok(PreviewPlacement::Presented)
            }
            ViewMode::Expanded { .. } => {
                self.queued_preview = Some(Box::new(card));
                Ok(PreviewPlacement::Queued)
            }
            ViewMode::Preview { .. } => Err(self.occupied("preview")),
        }
    }

    /// Leaves the current overlay and returns the mode that was closed.
    /// A held preview is presented right away once the stack is back.
    fn close_with(&mut self, exit: ExitAnimation) -> ViewMode {
        let closed = std::mem::take(&mut self.mode);
        debug!(closed = closed.name(), ?exit, "overlay closed");
        self.entering = false;
        self.exit = Some(exit);
        self.scroll_offset = 0.0;
        self.dismiss = None;
        if let Some(card) = self.queued_preview.take() {
            self.open(ViewMode::Preview { card });
        }
        closed
    }

    /// Explicit close. For a preview this is a discard.
    pub fn close(&mut self) -> Result<ViewMode, ModeError> {
        if self.is_stack() {
            return Err(ModeError::NotOpen { expected: "overlay" });
        }
        Ok(self.close_with(ExitAnimation::Collapse))
    }

    fn take_preview(&mut self) -> Result<Card, ModeError> {
        if self.preview_card().is_none() {
            return Err(ModeError::NotOpen { expected: "preview" });
        }
        match self.close_with(ExitAnimation::Collapse) {
            ViewMode::Preview { card } => Ok(*card),
            _ => Err(ModeError::NotOpen { expected: "preview" }),
        }
    }

    /// Takes the preview card out so it can be appended to the collection.
    pub fn save_preview(&mut self) -> Result<Card, ModeError> {
        self.take_preview()
    }

    /// Drops the preview; nothing reaches the collection.
    pub fn discard_preview(&mut self) -> Result<Card, ModeError> {
        self.take_preview()
    }

    /// Forces the stack back, e.g. when the expanded card was removed.
    pub fn return_to_stack(&mut self) {
        if !self.is_stack() {
            self.close_with(ExitAnimation::Collapse);
        }
    }

    pub fn set_scroll_offset(&mut self, offset: f64) -> Result<(), ModeError> {
        if !matches!(self.mode, ViewMode::Expanded { .. }) {
            return Err(ModeError::NotOpen { expected: "expanded" });
        }
        if offset.is_finite() {
            self.scroll_offset = offset.max(0.0);
        }
        Ok(())
    }

    pub fn begin_dismiss(&mut self, y: f64) -> Result<(), ModeError> {
        if self.is_stack() {
            return Err(ModeError::NotOpen { expected: "overlay" });
        }
        if self.scroll_offset > 0.0 {
            return Err(ModeError::NotAtTop);
        }
        if y.is_finite() {
            self.dismiss = Some(DismissDrag {
                start_y: y,
                current_y: y,
            });
        }
        Ok(())
    }

    pub fn update_dismiss(&mut self, y: f64) -> Option<f64> {
        let drag = self.dismiss.as_mut()?;
        if y.is_finite() {
            drag.current_y = y;
        }
        Some(drag.distance())
    }

    /// Past the threshold the overlay closes exactly like an explicit close,
    /// but slides out by `viewport_height`.
    pub fn end_dismiss(&mut self, viewport_height: f64) -> Option<ViewMode> {
        let drag = self.dismiss.take()?;
        if drag.distance() > self.dismiss_threshold_px && !self.is_stack() {
            Some(self.close_with(ExitAnimation::SlideDown {
                distance: viewport_height,
            }))
        } else {
            None
        }
    }

    pub fn cancel_dismiss(&mut self) {
        self.dismiss = None;
    }

    pub fn transition_ended(&mut self) {
        self.entering = false;
        self.exit = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::card;

    fn coordinator() -> ViewModeCoordinator {
        ViewModeCoordinator::default()
    }

    mod exclusion_tests {
        use super::*;

        #[test]
        fn test_expanded_rejected_while_preview_open() {
            let mut c = coordinator();
            c.offer_preview(card("P")).unwrap();
            let err = c.enter_expanded(CardId::new("A")).unwrap_err();
            assert_eq!(
                err,
                ModeError::Occupied {
                    requested: "expanded",
                    current: "preview"
                }
            );
            assert_eq!(c.preview_card().map(|p| p.id.as_str()), Some("P"));
        }

        #[test]
        fn test_second_preview_rejected() {
            let mut c = coordinator();
            c.offer_preview(card("P")).unwrap();
            assert!(c.offer_preview(card("Q")).is_err());
            assert_eq!(c.preview_card().map(|p| p.id.as_str()), Some("P"));
        }

        #[test]
        fn test_preview_during_expanded_is_queued() {
            let mut c = coordinator();
            c.enter_expanded(CardId::new("A")).unwrap();
            assert_eq!(c.offer_preview(card("P")), Ok(PreviewPlacement::Queued));
            assert_eq!(c.expanded_card_id(), Some(&CardId::new("A")));

            let closed = c.close().unwrap();
            assert_eq!(closed.name(), "expanded");
            assert_eq!(c.preview_card().map(|p| p.id.as_str()), Some("P"));
            assert!(!c.has_queued_preview());
        }
    }

    mod lifecycle_tests {
        use super::*;

        #[test]
        fn test_enter_and_close_expanded() {
            let mut c = coordinator();
            c.enter_expanded(CardId::new("A")).unwrap();
            assert!(c.is_entering());
            c.transition_ended();
            assert!(!c.is_entering());

            c.set_scroll_offset(120.0).unwrap();
            c.close().unwrap();
            assert!(c.is_stack());
            assert_eq!(c.scroll_offset(), 0.0);
            assert_eq!(c.exit_animation(), Some(ExitAnimation::Collapse));
            c.transition_ended();
            assert_eq!(c.exit_animation(), None);
        }

        #[test]
        fn test_save_and_discard_leave_stack() {
            let mut c = coordinator();
            c.offer_preview(card("P")).unwrap();
            let saved = c.save_preview().unwrap();
            assert_eq!(saved.id.as_str(), "P");
            assert!(c.is_stack());

            c.offer_preview(card("Q")).unwrap();
            let dropped = c.discard_preview().unwrap();
            assert_eq!(dropped.id.as_str(), "Q");
            assert!(c.is_stack());
        }

        #[test]
        fn test_save_without_preview_fails() {
            let mut c = coordinator();
            assert!(c.save_preview().is_err());
            c.enter_expanded(CardId::new("A")).unwrap();
            assert!(c.save_preview().is_err());
            assert_eq!(c.expanded_card_id(), Some(&CardId::new("A")));
        }

        #[test]
        fn test_close_in_stack_is_error() {
            let mut c = coordinator();
            assert_eq!(c.close(), Err(ModeError::NotOpen { expected: "overlay" }));
        }

        #[test]
        fn test_scroll_only_in_expanded() {
            let mut c = coordinator();
            assert!(c.set_scroll_offset(10.0).is_err());
            c.offer_preview(card("P")).unwrap();
            assert!(c.set_scroll_offset(10.0).is_err());
        }
    }

    mod dismiss_tests {
        use super::*;

        #[test]
        fn test_drag_past_threshold_slides_down() {
            let mut c = coordinator();
            c.enter_expanded(CardId::new("A")).unwrap();
            c.begin_dismiss(100.0).unwrap();
            assert_eq!(c.update_dismiss(300.0), Some(200.0));
            let closed = c.end_dismiss(844.0).unwrap();
            assert_eq!(closed.name(), "expanded");
            assert_eq!(
                c.exit_animation(),
                Some(ExitAnimation::SlideDown { distance: 844.0 })
            );
        }

        #[test]
        fn test_short_drag_snaps_back() {
            let mut c = coordinator();
            c.offer_preview(card("P")).unwrap();
            c.begin_dismiss(0.0).unwrap();
            c.update_dismiss(crate::DISMISS_THRESHOLD_PX);
            assert_eq!(c.end_dismiss(844.0), None);
            assert!(c.preview_card().is_some());
            assert_eq!(c.dismiss_offset(), 0.0);
        }

        #[test]
        fn test_upward_drag_is_clamped() {
            let mut c = coordinator();
            c.enter_expanded(CardId::new("A")).unwrap();
            c.begin_dismiss(300.0).unwrap();
            assert_eq!(c.update_dismiss(100.0), Some(0.0));
        }

        #[test]
        fn test_dismiss_requires_scroll_top() {
            let mut c = coordinator();
            c.enter_expanded(CardId::new("A")).unwrap();
            c.set_scroll_offset(40.0).unwrap();
            assert_eq!(c.begin_dismiss(0.0), Err(ModeError::NotAtTop));
            assert_eq!(c.update_dismiss(500.0), None);
        }
    }
}
