//! Per-card visual transforms for the asymmetric stack.
//!
//! Cards behind the active one sit in a tight fan (`stack_step_px` per depth).
//! Passed cards slide out to a parked position off the left edge, staying on
//! top while they leave.

use serde::{Deserialize, Serialize};

use crate::config::{LayoutMetrics, StackConfig};
use crate::{
    DISCARD_FADE_END, DISCARD_FADE_START, DISCARD_MIN_SCALE, STACK_FADE_END, STACK_FADE_START,
    STACK_MIN_SCALE, STACK_SCALE_STEP,
};

const STACK_Z_BASE: i32 = 100;
const DISCARD_Z_BASE: i32 = 1_000;
const Z_STEPS_PER_CARD: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CardTransform {
    pub translate_x: f64,
    pub scale: f64,
    pub z_index: i32,
    pub opacity: f64,
    /// False while a finger is down so the card tracks it 1:1.
    pub animated: bool,
}

#[allow(clippy::cast_possible_truncation)]
fn z_steps(progress: f64) -> i32 {
    (progress * Z_STEPS_PER_CARD).round() as i32
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackLayoutEngine {
    metrics: LayoutMetrics,
    config: StackConfig,
}

impl StackLayoutEngine {
    #[must_use]
    pub const fn new(metrics: LayoutMetrics, config: StackConfig) -> Self {
        Self { metrics, config }
    }

    #[must_use]
    pub fn compute_transform(
        &self,
        relative_offset: i32,
        drag_delta_normalized: f64,
        is_dragging: bool,
    ) -> CardTransform {
        let drag = if drag_delta_normalized.is_finite() {
            drag_delta_normalized
        } else {
            0.0
        };
        let progress = f64::from(relative_offset) + drag;
        let animated = !is_dragging;

        if progress < 0.0 {
            self.discard_side(progress, animated)
        } else {
            self.stack_side(progress, animated)
        }
    }

    fn discard_side(&self, progress: f64, animated: bool) -> CardTransform {
        let distance = progress.abs();
        let travel = distance.min(1.0);
        let parked_x = self.metrics.parked_x(self.config.peek_px);

        let opacity = if distance <= DISCARD_FADE_START {
            1.0
        } else {
            1.0 - (distance - DISCARD_FADE_START) / (DISCARD_FADE_END - DISCARD_FADE_START)
        };

        CardTransform {
            translate_x: parked_x * travel,
            scale: 1.0 - (1.0 - DISCARD_MIN_SCALE) * travel,
            z_index: DISCARD_Z_BASE + z_steps(distance),
            opacity: opacity.clamp(0.0, 1.0),
            animated,
        }
    }

    fn stack_side(&self, progress: f64, animated: bool) -> CardTransform {
        let opacity = if progress <= STACK_FADE_START {
            1.0
        } else {
            1.0 - (progress - STACK_FADE_START) / (STACK_FADE_END - STACK_FADE_START)
        };

        CardTransform {
            translate_x: progress * self.config.stack_step_px,
            scale: (1.0 - STACK_SCALE_STEP * progress).max(STACK_MIN_SCALE),
            z_index: STACK_Z_BASE - z_steps(progress),
            opacity: opacity.clamp(0.0, 1.0),
            animated,
        }
    }
}

impl Default for StackLayoutEngine {
    fn default() -> Self {
        Self::new(LayoutMetrics::default(), StackConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPSILON: f64 = 1e-6;

    fn engine() -> StackLayoutEngine {
        StackLayoutEngine::default()
    }

    #[test]
    fn test_active_card_is_identity() {
        let t = engine().compute_transform(0, 0.0, false);
        assert_eq!(t.translate_x, 0.0);
        assert_eq!(t.scale, 1.0);
        assert_eq!(t.opacity, 1.0);
        assert!(t.animated);
    }

    #[test]
    fn test_continuity_at_zero() {
        let e = engine();
        let left = e.compute_transform(0, -1e-9, true);
        let right = e.compute_transform(0, 1e-9, true);
        assert!((left.translate_x - right.translate_x).abs() < EPSILON);
        assert!((left.scale - right.scale).abs() < EPSILON);
        assert!((left.opacity - right.opacity).abs() < EPSILON);
    }

    #[test]
    fn test_stack_side_uses_fixed_step() {
        let t = engine().compute_transform(2, 0.0, false);
        assert!((t.translate_x - 2.0 * crate::STACK_STEP_PX).abs() < EPSILON);
        assert!((t.scale - 0.9).abs() < EPSILON);
        assert_eq!(t.opacity, 1.0);
    }

    #[test]
    fn test_stack_fades_between_three_and_four() {
        let e = engine();
        assert_eq!(e.compute_transform(3, 0.0, false).opacity, 1.0);
        assert!((e.compute_transform(3, 0.5, false).opacity - 0.5).abs() < EPSILON);
        assert_eq!(e.compute_transform(4, 0.0, false).opacity, 0.0);
    }

    #[test]
    fn test_stack_scale_floor() {
        let t = engine().compute_transform(40, 0.0, false);
        assert_eq!(t.scale, STACK_MIN_SCALE);
    }

    #[test]
    fn test_z_index_decreases_with_depth() {
        let e = engine();
        let z: Vec<i32> = (0..4).map(|o| e.compute_transform(o, 0.0, false).z_index).collect();
        assert!(z.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_discarded_card_parks_off_screen() {
        let e = engine();
        let metrics = LayoutMetrics::default();
        let t = e.compute_transform(-1, 0.0, false);
        assert!((t.translate_x - metrics.parked_x(crate::DISCARD_PEEK_PX)).abs() < EPSILON);
        assert!((t.scale - DISCARD_MIN_SCALE).abs() < EPSILON);
        assert_eq!(t.opacity, 0.0);

        let further = e.compute_transform(-2, 0.0, false);
        assert_eq!(further.translate_x, t.translate_x);
        assert_eq!(further.scale, t.scale);
    }

    #[test]
    fn test_discard_fade_starts_late() {
        let e = engine();
        assert_eq!(e.compute_transform(0, -0.2, true).opacity, 1.0);
        assert!(e.compute_transform(0, -0.3, true).opacity < 1.0);
        assert!(e.compute_transform(0, -0.867, true).opacity < 0.001);
    }

    #[test]
    fn test_discarding_card_stays_on_top() {
        let e = engine();
        let leaving = e.compute_transform(0, -0.4, true);
        let front_of_stack = e.compute_transform(1, -0.4, true);
        assert!(leaving.z_index > front_of_stack.z_index);
        let further = e.compute_transform(0, -0.8, true);
        assert!(further.z_index > leaving.z_index);
    }

    #[test]
    fn test_animation_disabled_while_dragging() {
        let e = engine();
        assert!(!e.compute_transform(1, -0.1, true).animated);
        assert!(e.compute_transform(1, 0.0, false).animated);
    }

    #[test]
    fn test_non_finite_drag_is_ignored() {
        let e = engine();
        assert_eq!(
            e.compute_transform(1, f64::NAN, false),
            e.compute_transform(1, 0.0, false)
        );
    }

    proptest! {
        #[test]
        fn transform_values_are_bounded(offset in -2i32..=4, drag in -1.5f64..1.5, dragging in any::<bool>()) {
            let t = engine().compute_transform(offset, drag, dragging);
            prop_assert!((0.0..=1.0).contains(&t.opacity));
            prop_assert!(t.scale >= STACK_MIN_SCALE && t.scale <= 1.0);
            prop_assert!(t.translate_x.is_finite());
            prop_assert_eq!(t.animated, !dragging);
        }

        #[test]
        fn transform_depends_only_on_progress(offset in -2i32..=3, drag in -0.9f64..0.9) {
            let e = engine();
            let a = e.compute_transform(offset, drag, true);
            let b = e.compute_transform(offset + 1, drag - 1.0, true);
            prop_assert!((a.translate_x - b.translate_x).abs() < 1e-6);
            prop_assert!((a.scale - b.scale).abs() < 1e-6);
            prop_assert!((a.opacity - b.opacity).abs() < 1e-6);
        }
    }
}
