use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{LayoutMetrics, StackConfig};
use crate::flight::{CreationFlow, FlightGuard, RetryAction};
use crate::search::LocationSearch;
use crate::stack::CardStack;
use crate::view_mode::ViewModeCoordinator;
use crate::{AppError, MAX_VIEW_SCALE, MIN_VIEW_SCALE};

/// Stable card identity, assigned once at creation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardId(pub String);

impl CardId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub country: Option<String>,
    pub admin_area: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Option<String>,
}

impl Location {
    #[must_use]
    pub fn display_name(&self) -> String {
        match (&self.admin_area, &self.country) {
            (Some(area), Some(country)) if area != &self.name => {
                format!("{}, {area}, {country}", self.name)
            }
            (_, Some(country)) => format!("{}, {country}", self.name),
            _ => self.name.clone(),
        }
    }

    #[must_use]
    pub fn has_valid_coordinates(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    MainlyClear,
    PartlyCloudy,
    Overcast,
    Fog,
    Drizzle,
    Rain,
    Snow,
    Thunderstorm,
    #[default]
    Unknown,
}

impl WeatherCondition {
    /// Maps a WMO weather interpretation code.
    #[must_use]
    pub const fn from_wmo_code(code: u8) -> Self {
        match code {
            0 => Self::Clear,
            1 => Self::MainlyClear,
            2 => Self::PartlyCloudy,
            3 => Self::Overcast,
            45 | 48 => Self::Fog,
            51..=57 => Self::Drizzle,
            61..=67 | 80..=82 => Self::Rain,
            71..=77 | 85 | 86 => Self::Snow,
            95..=99 => Self::Thunderstorm,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::MainlyClear => "Mainly clear",
            Self::PartlyCloudy => "Partly cloudy",
            Self::Overcast => "Overcast",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::Snow => "Snow",
            Self::Thunderstorm => "Thunderstorm",
            Self::Unknown => "Unknown",
        }
    }

    #[must_use]
    pub const fn is_precipitation(self) -> bool {
        matches!(self, Self::Drizzle | Self::Rain | Self::Snow | Self::Thunderstorm)
    }
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature_c: f64,
    pub apparent_temperature_c: f64,
    pub humidity_pct: u8,
    pub wind_speed_kmh: f64,
    pub wind_direction_deg: u16,
    pub condition: WeatherCondition,
    pub is_day: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HourlyPoint {
    pub time_ms: u64,
    pub temperature_c: f64,
    pub precipitation_probability_pct: u8,
    pub condition: WeatherCondition,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: String,
    pub temperature_max_c: f64,
    pub temperature_min_c: f64,
    pub condition: WeatherCondition,
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
}

/// Conditions captured when a card's scene was generated. Immutable until the
/// card is explicitly refreshed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location: Location,
    pub current: CurrentConditions,
    pub hourly: Vec<HourlyPoint>,
    pub daily: Vec<DailyPoint>,
    pub observed_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewConfigError {
    #[error("view transform contains a non-finite value")]
    NonFinite,
}

/// Pan/zoom state of the image viewer, persisted per card.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl ViewConfig {
    pub fn new(scale: f64, offset_x: f64, offset_y: f64) -> Result<Self, ViewConfigError> {
        if !scale.is_finite() || !offset_x.is_finite() || !offset_y.is_finite() {
            return Err(ViewConfigError::NonFinite);
        }
        Ok(Self {
            scale: scale.clamp(MIN_VIEW_SCALE, MAX_VIEW_SCALE),
            offset_x,
            offset_y,
        })
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            scale: MIN_VIEW_SCALE,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

/// A generated picture. Bytes stay in the shell; the core keeps a reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageAsset {
    pub image_ref: String,
    pub mime_type: Option<String>,
    pub size_bytes: Option<u64>,
    pub generated_at_ms: u64,
    pub view_config: Option<ViewConfig>,
    pub is_placeholder: bool,
}

impl ImageAsset {
    #[must_use]
    pub fn new(image_ref: impl Into<String>, now_ms: u64) -> Self {
        Self {
            image_ref: image_ref.into(),
            mime_type: None,
            size_bytes: None,
            generated_at_ms: now_ms,
            view_config: None,
            is_placeholder: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CardOrigin {
    RealWeather,
    Fantasy {
        era: Option<String>,
        brief: Option<String>,
    },
}

/// One saved weather scene.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub weather: WeatherSnapshot,
    pub image: ImageAsset,
    pub origin: CardOrigin,
    pub created_at_ms: u64,
}

impl Card {
    #[must_use]
    pub fn new(weather: WeatherSnapshot, image: ImageAsset, origin: CardOrigin, now_ms: u64) -> Self {
        Self {
            id: CardId::generate(),
            weather,
            image,
            origin,
            created_at_ms: now_ms,
        }
    }

    #[must_use]
    pub fn city(&self) -> &str {
        &self.weather.location.name
    }

    #[must_use]
    pub const fn is_fantasy(&self) -> bool {
        matches!(self.origin, CardOrigin::Fantasy { .. })
    }

    /// Replaces the weather and image after a successful refresh. Identity
    /// and the persisted view transform are kept.
    pub fn apply_refresh(&mut self, weather: WeatherSnapshot, mut image: ImageAsset) {
        if image.view_config.is_none() {
            image.view_config = self.image.view_config;
        }
        self.weather = weather;
        self.image = image;
    }

    pub fn apply_image_edit(&mut self, image: ImageAsset) {
        self.image = image;
    }

    pub fn set_view_config(&mut self, config: ViewConfig) {
        self.image.view_config = Some(config);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToastMessage {
    pub message: String,
    pub kind: ToastKind,
    pub created_at_ms: u64,
    pub duration_ms: u64,
}

impl ToastMessage {
    #[must_use]
    pub fn new(message: impl Into<String>, kind: ToastKind, now_ms: u64) -> Self {
        Self {
            message: message.into(),
            kind,
            created_at_ms: now_ms,
            duration_ms: kind.default_duration_ms(),
        }
    }

    #[must_use]
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.created_at_ms) > self.duration_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl ToastKind {
    #[must_use]
    pub const fn default_duration_ms(self) -> u64 {
        match self {
            Self::Info => 3000,
            Self::Success => 2000,
            Self::Warning => 4000,
            Self::Error => 5000,
        }
    }
}

/// Top-level application state. Every field is mutated only from
/// `App::update`, through the named operations of the owning component.
#[derive(Debug)]
pub struct Model {
    pub stack: CardStack,
    pub view_mode: ViewModeCoordinator,
    pub metrics: LayoutMetrics,
    pub config: StackConfig,
    pub search: LocationSearch,
    pub creation: CreationFlow,
    pub flights: FlightGuard,
    pub background: Option<ImageAsset>,
    pub active_error: Option<AppError>,
    pub retry: Option<RetryAction>,
    pub active_toast: Option<ToastMessage>,
    pub now_ms: u64,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            stack: CardStack::default(),
            view_mode: ViewModeCoordinator::default(),
            metrics: LayoutMetrics::default(),
            config: StackConfig::default(),
            search: LocationSearch::default(),
            creation: CreationFlow::default(),
            flights: FlightGuard::default(),
            background: None,
            active_error: None,
            retry: None,
            active_toast: None,
            now_ms: 0,
        }
    }
}

impl Model {
    pub fn set_error(&mut self, error: AppError, retry: Option<RetryAction>) {
        self.retry = if error.is_retryable() { retry } else { None };
        self.active_error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.active_error = None;
        self.retry = None;
    }

    pub fn show_toast(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.active_toast = Some(ToastMessage::new(message, kind, self.now_ms));
    }

    pub fn clear_toast(&mut self) {
        self.active_toast = None;
    }

    /// Stack gestures are live only in Stack mode with at least one card.
    #[must_use]
    pub fn gestures_enabled(&self) -> bool {
        self.view_mode.is_stack() && !self.stack.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_wmo_code_mapping() {
        assert_eq!(WeatherCondition::from_wmo_code(0), WeatherCondition::Clear);
        assert_eq!(WeatherCondition::from_wmo_code(48), WeatherCondition::Fog);
        assert_eq!(WeatherCondition::from_wmo_code(81), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::from_wmo_code(86), WeatherCondition::Snow);
        assert_eq!(WeatherCondition::from_wmo_code(96), WeatherCondition::Thunderstorm);
        assert_eq!(WeatherCondition::from_wmo_code(200), WeatherCondition::Unknown);
    }

    #[test]
    fn test_view_config_clamps_scale_and_rejects_nan() {
        let config = ViewConfig::new(12.0, 3.0, -4.0).unwrap();
        assert_eq!(config.scale, MAX_VIEW_SCALE);
        assert_eq!(ViewConfig::new(0.2, 0.0, 0.0).unwrap().scale, MIN_VIEW_SCALE);
        assert_eq!(ViewConfig::new(f64::NAN, 0.0, 0.0), Err(ViewConfigError::NonFinite));
        assert_eq!(
            ViewConfig::new(1.0, f64::INFINITY, 0.0),
            Err(ViewConfigError::NonFinite)
        );
    }

    #[test]
    fn test_refresh_keeps_identity_and_view_config() {
        let mut card = card("Paris");
        let id = card.id.clone();
        card.set_view_config(ViewConfig::new(2.0, 10.0, 5.0).unwrap());

        card.apply_refresh(snapshot("Paris", 25.0), ImageAsset::new("https://img/new.png", 1_700_000_100_000));

        assert_eq!(card.id, id);
        assert_eq!(card.weather.current.temperature_c, 25.0);
        assert_eq!(card.image.image_ref, "https://img/new.png");
        assert_eq!(card.image.view_config.map(|c| c.scale), Some(2.0));
    }

    #[test]
    fn test_location_display_name() {
        let mut loc = location("Lyon");
        assert_eq!(loc.display_name(), "Lyon, Testland");
        loc.admin_area = Some("Rhone".into());
        assert_eq!(loc.display_name(), "Lyon, Rhone, Testland");
        loc.country = None;
        assert_eq!(loc.display_name(), "Lyon");
    }

    #[test]
    fn test_toast_expiry() {
        let toast = ToastMessage::new("Saved", ToastKind::Success, 1_000);
        assert!(!toast.is_expired(3_000));
        assert!(toast.is_expired(3_001));
    }

    #[test]
    fn test_gestures_disabled_when_empty() {
        let model = Model::default();
        assert!(!model.gestures_enabled());
    }
}
