//! Horizontal drag recognition for the card stack.
//!
//! idle -> armed (pointer down) -> dragging (moved past the drag threshold)
//! -> idle (released: committed or cancelled).

use serde::{Deserialize, Serialize};

use crate::config::StackConfig;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum GesturePhase {
    #[default]
    Idle,
    Armed {
        start_x: f64,
    },
    Dragging {
        start_x: f64,
        current_x: f64,
    },
}

/// Flat snapshot of the gesture for rendering and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct DragState {
    pub start_pointer_x: f64,
    pub current_offset_x: f64,
    pub is_dragging: bool,
    pub is_committed_drag: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipeDirection {
    /// Finger moved left: bring the next card forward.
    Next,
    /// Finger moved right: bring the previous card back.
    Previous,
}

impl SwipeDirection {
    #[must_use]
    pub fn from_delta(delta: f64) -> Self {
        if delta < 0.0 {
            Self::Next
        } else {
            Self::Previous
        }
    }

    #[must_use]
    pub const fn step(self) -> i64 {
        match self {
            Self::Next => 1,
            Self::Previous => -1,
        }
    }
}

/// Result of lifting the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureRelease {
    pub delta: f64,
    pub was_drag: bool,
    pub committed: Option<SwipeDirection>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureTracker {
    phase: GesturePhase,
    drag_threshold_px: f64,
    swipe_threshold_px: f64,
    enabled: bool,
    released_from_drag: bool,
}

impl Default for GestureTracker {
    fn default() -> Self {
        Self::new(&StackConfig::default())
    }
}

impl GestureTracker {
    #[must_use]
    pub fn new(config: &StackConfig) -> Self {
        Self {
            phase: GesturePhase::Idle,
            drag_threshold_px: config.drag_threshold_px,
            swipe_threshold_px: config.swipe_threshold_px,
            enabled: true,
            released_from_drag: false,
        }
    }

    pub fn apply_config(&mut self, config: &StackConfig) {
        self.drag_threshold_px = config.drag_threshold_px;
        self.swipe_threshold_px = config.swipe_threshold_px;
    }

    /// Disabling drops any gesture in progress.
    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.reset();
        }
        self.enabled = enabled;
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub const fn phase(&self) -> GesturePhase {
        self.phase
    }

    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        matches!(self.phase, GesturePhase::Dragging { .. })
    }

    /// True between the release of a real drag and the next pointer down, so
    /// the click synthesized by the release can be ignored.
    #[must_use]
    pub const fn released_from_drag(&self) -> bool {
        self.released_from_drag
    }

    /// Current reported delta; zero until the drag threshold is crossed.
    #[must_use]
    pub fn delta(&self) -> f64 {
        match self.phase {
            GesturePhase::Dragging { start_x, current_x } => current_x - start_x,
            _ => 0.0,
        }
    }

    #[must_use]
    pub fn drag_state(&self) -> DragState {
        match self.phase {
            GesturePhase::Idle => DragState::default(),
            GesturePhase::Armed { start_x } => DragState {
                start_pointer_x: start_x,
                ..DragState::default()
            },
            GesturePhase::Dragging { start_x, current_x } => {
                let delta = current_x - start_x;
                DragState {
                    start_pointer_x: start_x,
                    current_offset_x: delta,
                    is_dragging: true,
                    is_committed_drag: delta.abs() > self.swipe_threshold_px,
                }
            }
        }
    }

    /// Returns false when input is ignored.
    pub fn on_pointer_down(&mut self, x: f64) -> bool {
        if !self.enabled || !x.is_finite() {
            return false;
        }
        self.phase = GesturePhase::Armed { start_x: x };
        self.released_from_drag = false;
        true
    }

    /// Returns the delta to report, if any. Once dragging, every move is
    /// reported even when it falls back under the threshold.
    pub fn on_pointer_move(&mut self, x: f64) -> Option<f64> {
        if !self.enabled || !x.is_finite() {
            return None;
        }
        match self.phase {
            GesturePhase::Idle => None,
            GesturePhase::Armed { start_x } => {
                let delta = x - start_x;
                if delta.abs() > self.drag_threshold_px {
                    self.phase = GesturePhase::Dragging {
                        start_x,
                        current_x: x,
                    };
                    Some(delta)
                } else {
                    None
                }
            }
            GesturePhase::Dragging { start_x, .. } => {
                self.phase = GesturePhase::Dragging {
                    start_x,
                    current_x: x,
                };
                Some(x - start_x)
            }
        }
    }

    pub fn on_pointer_up(&mut self) -> Option<GestureRelease> {
        if !self.enabled {
            return None;
        }
        let release = match self.phase {
            GesturePhase::Idle => return None,
            GesturePhase::Armed { .. } => GestureRelease {
                delta: 0.0,
                was_drag: false,
                committed: None,
            },
            GesturePhase::Dragging { start_x, current_x } => {
                let delta = current_x - start_x;
                GestureRelease {
                    delta,
                    was_drag: true,
                    committed: (delta.abs() > self.swipe_threshold_px)
                        .then(|| SwipeDirection::from_delta(delta)),
                }
            }
        };
        self.phase = GesturePhase::Idle;
        self.released_from_drag = release.was_drag;
        Some(release)
    }

    pub fn reset(&mut self) {
        self.phase = GesturePhase::Idle;
        self.released_from_drag = false;
    }
}
