use serde::{Deserialize, Serialize};

use crate::capabilities::{HttpError, KvError, SceneResult, WeatherResult};
use crate::config::StackConfig;
use crate::flight::RetryAction;
use crate::model::{CardId, WeatherSnapshot};
use crate::search::LocationCandidate;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum Event {
    AppStarted,
    ViewportResized {
        width: f64,
        height: f64,
        card_width: f64,
    },
    Configure(StackConfig),
    TimerTick {
        now_ms: u64,
    },

    // Stack gestures
    PointerDown {
        x: f64,
    },
    PointerMove {
        x: f64,
    },
    PointerUp,
    PointerCancel,
    CardClicked {
        relative_offset: i32,
    },
    NavigateBy {
        delta: i64,
    },
    RemoveCard {
        card_id: CardId,
    },

    // Expanded / Preview
    CloseRequested,
    DismissDragStarted {
        y: f64,
    },
    DismissDragMoved {
        y: f64,
    },
    DismissDragEnded,
    DismissDragCancelled,
    ExpandedScrolled {
        offset: f64,
    },
    ViewTransitionEnded,
    SavePreview,
    DiscardPreview,

    // Card actions
    RefreshCard {
        card_id: CardId,
    },
    EditCardImage {
        card_id: CardId,
        instruction: String,
    },
    CardViewConfigChanged {
        card_id: CardId,
        scale: f64,
        offset_x: f64,
        offset_y: f64,
    },

    // Creation
    SearchTextChanged {
        text: String,
    },
    SuggestionSelected {
        index: usize,
    },
    CreateFantasy {
        city: String,
        era: Option<String>,
        brief: Option<String>,
    },

    RetryRequested,
    DismissError,
    DismissToast,

    // Capability responses
    #[serde(skip)]
    SearchResponse {
        generation: u64,
        result: Result<Vec<LocationCandidate>, HttpError>,
    },
    #[serde(skip)]
    WeatherFetched {
        flow_id: u64,
        result: Box<WeatherResult>,
    },
    #[serde(skip)]
    SceneGenerated {
        flow_id: u64,
        result: Box<SceneResult>,
    },
    #[serde(skip)]
    CardWeatherRefreshed {
        card_id: CardId,
        result: Box<WeatherResult>,
    },
    #[serde(skip)]
    CardSceneRefreshed {
        card_id: CardId,
        weather: Option<Box<WeatherSnapshot>>,
        result: Box<SceneResult>,
    },
    #[serde(skip)]
    CardImageEdited {
        card_id: CardId,
        retry: RetryAction,
        result: Box<SceneResult>,
    },
    #[serde(skip)]
    BackgroundLoaded {
        result: Result<Option<Vec<u8>>, KvError>,
    },
    #[serde(skip)]
    BackgroundGenerated {
        result: Box<SceneResult>,
    },
    #[serde(skip)]
    BackgroundStored {
        result: Result<(), KvError>,
    },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AppStarted => "app_started",
            Self::ViewportResized { .. } => "viewport_resized",
            Self::Configure(_) => "configure",
            Self::TimerTick { .. } => "timer_tick",
            Self::PointerDown { .. } => "pointer_down",
            Self::PointerMove { .. } => "pointer_move",
            Self::PointerUp => "pointer_up",
            Self::PointerCancel => "pointer_cancel",
            Self::CardClicked { .. } => "card_clicked",
            Self::NavigateBy { .. } => "navigate_by",
            Self::RemoveCard { .. } => "remove_card",
            Self::CloseRequested => "close_requested",
            Self::DismissDragStarted { .. } => "dismiss_drag_started",
            Self::DismissDragMoved { .. } => "dismiss_drag_moved",
            Self::DismissDragEnded => "dismiss_drag_ended",
            Self::DismissDragCancelled => "dismiss_drag_cancelled",
            Self::ExpandedScrolled { .. } => "expanded_scrolled",
            Self::ViewTransitionEnded => "view_transition_ended",
            Self::SavePreview => "save_preview",
            Self::DiscardPreview => "discard_preview",
            Self::RefreshCard { .. } => "refresh_card",
            Self::EditCardImage { .. } => "edit_card_image",
            Self::CardViewConfigChanged { .. } => "card_view_config_changed",
            Self::SearchTextChanged { .. } => "search_text_changed",
            Self::SuggestionSelected { .. } => "suggestion_selected",
            Self::CreateFantasy { .. } => "create_fantasy",
            Self::RetryRequested => "retry_requested",
            Self::DismissError => "dismiss_error",
            Self::DismissToast => "dismiss_toast",
            Self::SearchResponse { .. } => "search_response",
            Self::WeatherFetched { .. } => "weather_fetched",
            Self::SceneGenerated { .. } => "scene_generated",
            Self::CardWeatherRefreshed { .. } => "card_weather_refreshed",
            Self::CardSceneRefreshed { .. } => "card_scene_refreshed",
            Self::CardImageEdited { .. } => "card_image_edited",
            Self::BackgroundLoaded { .. } => "background_loaded",
            Self::BackgroundGenerated { .. } => "background_generated",
            Self::BackgroundStored { .. } => "background_stored",
        }
    }

    /// High-frequency pointer traffic is logged at trace level only.
    #[must_use]
    pub const fn is_high_frequency(&self) -> bool {
        matches!(
            self,
            Self::PointerMove { .. }
                | Self::DismissDragMoved { .. }
                | Self::ExpandedScrolled { .. }
                | Self::TimerTick { .. }
        )
    }

    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Self::CardClicked { .. }
                | Self::NavigateBy { .. }
                | Self::RemoveCard { .. }
                | Self::CloseRequested
                | Self::SavePreview
                | Self::DiscardPreview
                | Self::RefreshCard { .. }
                | Self::EditCardImage { .. }
                | Self::SuggestionSelected { .. }
                | Self::CreateFantasy { .. }
                | Self::RetryRequested
        )
    }
}
