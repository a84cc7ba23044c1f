// lib.rs - SkyDeck shared core

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod capabilities;
pub mod config;
pub mod cyclic;
pub mod event;
pub mod flight;
pub mod gesture;
pub mod layout;
pub mod model;
pub mod search;
pub mod stack;
pub mod view;
pub mod view_mode;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use crux_core::{render::Render, App as CruxApp};
pub use event::Event;
pub use model::Model;
pub use view::ViewModel;

pub const DRAG_THRESHOLD_PX: f64 = 5.0;
pub const SWIPE_THRESHOLD_PX: f64 = 100.0;
pub const STACK_STEP_PX: f64 = 20.0;
pub const STACK_SCALE_STEP: f64 = 0.05;
pub const STACK_MIN_SCALE: f64 = 0.5;
pub const DISCARD_MIN_SCALE: f64 = 0.95;
pub const DISCARD_PEEK_PX: f64 = 40.0;
pub const DISCARD_FADE_START: f64 = 0.2;
pub const DISCARD_FADE_END: f64 = 0.867;
pub const STACK_FADE_START: f64 = 3.0;
pub const STACK_FADE_END: f64 = 4.0;
pub const MAX_STACKED_BEHIND: usize = 3;
pub const DISMISS_THRESHOLD_PX: f64 = 150.0;

pub const DEFAULT_VIEWPORT_WIDTH: f64 = 390.0;
pub const DEFAULT_VIEWPORT_HEIGHT: f64 = 844.0;
pub const DEFAULT_CARD_WIDTH: f64 = 320.0;

pub const SEARCH_DEBOUNCE_MS: u64 = 400;
pub const SEARCH_MIN_CHARS: usize = 3;
pub const SEARCH_MAX_RESULTS: usize = 5;
pub const GEOCODING_BASE_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";

pub const BACKGROUND_CACHE_VERSION: u32 = 2;
pub const BACKGROUND_PROMPT: &str =
    "A soft, painterly panorama of an open sky at golden hour, minimal, no text, no people";

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const MIN_VIEW_SCALE: f64 = 1.0;
pub const MAX_VIEW_SCALE: f64 = 5.0;
pub const PLACEHOLDER_IMAGE_BASE_URL: &str = "https://placehold.co/1024x1536/1e293b/e2e8f0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Timeout,
    IncompleteData,
    LocationNotFound,
    Generation,
    ImageTooLarge,
    ImageFormatUnsupported,
    Validation,
    NotFound,
    Storage,
    Serialization,
    InvalidState,
    Internal,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::IncompleteData => "INCOMPLETE_DATA",
            Self::LocationNotFound => "LOCATION_NOT_FOUND",
            Self::Generation => "GENERATION_ERROR",
            Self::ImageTooLarge => "IMAGE_TOO_LARGE",
            Self::ImageFormatUnsupported => "IMAGE_FORMAT_UNSUPPORTED",
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Storage => "STORAGE_ERROR",
            Self::Serialization => "SERIALIZATION_ERROR",
            Self::InvalidState => "INVALID_STATE",
            Self::Internal => "INTERNAL_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Network | Self::Timeout | Self::Generation | Self::Storage => {
                ErrorSeverity::Transient
            }

            Self::Serialization | Self::Internal | Self::InvalidState => ErrorSeverity::Fatal,

            Self::IncompleteData
            | Self::LocationNotFound
            | Self::ImageTooLarge
            | Self::ImageFormatUnsupported
            | Self::Validation
            | Self::NotFound
            | Self::Unknown => ErrorSeverity::Permanent,
        }
    }

    /// Whether the error panel should offer a retry action. Retries are always
    /// user-initiated; the core never retries on its own.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::IncompleteData | Self::Generation | Self::Storage
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable() && !matches!(self.severity, ErrorSeverity::Fatal)
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Network => {
                "Unable to reach the weather service. Check your connection and try again.".into()
            }
            ErrorKind::Timeout => "The request timed out. Please try again.".into(),
            ErrorKind::IncompleteData => {
                "The weather service returned incomplete data for this place.".into()
            }
            ErrorKind::LocationNotFound => "We couldn't find that place.".into(),
            ErrorKind::Generation => {
                "The scene could not be generated. Please try again.".into()
            }
            ErrorKind::ImageTooLarge => format!(
                "The generated image is too large (limit {} MB).",
                MAX_IMAGE_BYTES / 1_000_000
            ),
            ErrorKind::ImageFormatUnsupported => {
                "The generated image is in an unsupported format.".into()
            }
            ErrorKind::Validation => self.message.clone(),
            ErrorKind::NotFound => "That card no longer exists.".into(),
            ErrorKind::Storage => "Unable to read or write the local cache.".into(),
            ErrorKind::Serialization => {
                "A data error occurred. Please restart the app if this persists.".into()
            }
            ErrorKind::InvalidState => "The app is in an unexpected state.".into(),
            ErrorKind::Internal | ErrorKind::Unknown => {
                "An unexpected error occurred. Please try again.".into()
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

#[must_use]
pub fn format_temperature(celsius: f64) -> String {
    if !celsius.is_finite() {
        return "--".to_string();
    }
    let rounded = celsius.round();
    // avoid "-0°"
    if rounded == 0.0 {
        "0°".to_string()
    } else {
        format!("{rounded:.0}°")
    }
}
