//! Tuning knobs for the card stack, replaceable by the shell at runtime.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    AppError, ErrorKind, DEFAULT_CARD_WIDTH, DEFAULT_VIEWPORT_HEIGHT, DEFAULT_VIEWPORT_WIDTH,
    DISCARD_PEEK_PX, DISMISS_THRESHOLD_PX, DRAG_THRESHOLD_PX, MAX_STACKED_BEHIND, STACK_STEP_PX,
    SWIPE_THRESHOLD_PX,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be a positive finite number, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("swipe threshold ({swipe}) must exceed drag threshold ({drag})")]
    SwipeBelowDrag { swipe: f64, drag: f64 },
    #[error("card width ({card}) cannot exceed viewport width ({viewport})")]
    CardWiderThanViewport { card: f64, viewport: f64 },
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

fn positive(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

/// Gesture thresholds and stack geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StackConfig {
    pub drag_threshold_px: f64,
    pub swipe_threshold_px: f64,
    pub stack_step_px: f64,
    pub peek_px: f64,
    pub dismiss_threshold_px: f64,
    pub max_stacked_behind: usize,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            drag_threshold_px: DRAG_THRESHOLD_PX,
            swipe_threshold_px: SWIPE_THRESHOLD_PX,
            stack_step_px: STACK_STEP_PX,
            peek_px: DISCARD_PEEK_PX,
            dismiss_threshold_px: DISMISS_THRESHOLD_PX,
            max_stacked_behind: MAX_STACKED_BEHIND,
        }
    }
}

impl StackConfig {
    pub fn validate(self) -> Result<Self, ConfigError> {
        let drag = positive("drag_threshold_px", self.drag_threshold_px)?;
        let swipe = positive("swipe_threshold_px", self.swipe_threshold_px)?;
        positive("stack_step_px", self.stack_step_px)?;
        positive("dismiss_threshold_px", self.dismiss_threshold_px)?;
        if !self.peek_px.is_finite() || self.peek_px < 0.0 {
            return Err(ConfigError::NotPositive {
                field: "peek_px",
                value: self.peek_px,
            });
        }
        if swipe <= drag {
            return Err(ConfigError::SwipeBelowDrag { swipe, drag });
        }
        Ok(self)
    }
}

/// Pixel sizes the layout engine needs from the shell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutMetrics {
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub card_width: f64,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            card_width: DEFAULT_CARD_WIDTH,
        }
    }
}

impl LayoutMetrics {
    pub fn new(
        viewport_width: f64,
        viewport_height: f64,
        card_width: f64,
    ) -> Result<Self, ConfigError> {
        let viewport_width = positive("viewport_width", viewport_width)?;
        let viewport_height = positive("viewport_height", viewport_height)?;
        let card_width = positive("card_width", card_width)?;
        if card_width > viewport_width {
            return Err(ConfigError::CardWiderThanViewport {
                card: card_width,
                viewport: viewport_width,
            });
        }
        Ok(Self {
            viewport_width,
            viewport_height,
            card_width,
        })
    }

    /// Horizontal resting position of a discarded card: fully off to the left
    /// except for a `peek` sliver.
    #[must_use]
    pub fn parked_x(&self, peek_px: f64) -> f64 {
        -(self.viewport_width / 2.0) - (self.card_width / 2.0) + peek_px
    }

    /// Converts a pointer delta into viewport-relative drag progress.
    #[must_use]
    pub fn normalize_drag(&self, delta_px: f64) -> f64 {
        delta_px / self.viewport_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(StackConfig::default().validate().is_ok());
    }

    #[test]
    fn test_swipe_threshold_must_exceed_drag_threshold() {
        let config = StackConfig {
            swipe_threshold_px: 4.0,
            ..StackConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SwipeBelowDrag { .. })
        ));
    }

    #[test]
    fn test_rejects_non_positive_threshold() {
        let config = StackConfig {
            drag_threshold_px: 0.0,
            ..StackConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive { field: "drag_threshold_px", .. })
        ));
    }

    #[test]
    fn test_metrics_validation() {
        assert!(LayoutMetrics::new(390.0, 844.0, 320.0).is_ok());
        assert!(LayoutMetrics::new(f64::NAN, 844.0, 320.0).is_err());
        assert!(matches!(
            LayoutMetrics::new(300.0, 844.0, 320.0),
            Err(ConfigError::CardWiderThanViewport { .. })
        ));
    }

    #[test]
    fn test_parked_x_leaves_peek_visible() {
        let metrics = LayoutMetrics::new(400.0, 800.0, 300.0).unwrap();
        assert_eq!(metrics.parked_x(40.0), -200.0 - 150.0 + 40.0);
        assert_eq!(metrics.normalize_drag(-100.0), -0.25);
    }
}
