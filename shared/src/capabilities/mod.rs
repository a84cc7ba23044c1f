mod http;
mod kv;
mod scene;
mod weather;

pub use self::http::{geocoding_url, HttpError, ValidatedUrl};
pub use self::kv::{
    background_cache_key, decode_value, encode_value, CachedBackground, KeyNamespace, KvError,
    KvKey,
};
pub use self::scene::{
    placeholder_image, validate_image_bytes, validate_instruction, GeneratedImage, Scene,
    SceneError, SceneKind, SceneOperation, SceneOutput, SceneRequest, SceneResult,
};
pub use self::weather::{validate_snapshot, Weather, WeatherError, WeatherOperation, WeatherResult};

pub use crux_core::render::Render;
pub use crux_http::Http;
pub use crux_kv::KeyValue;

use crate::app::App;
use crate::event::Event;

#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("Storage error: {0}")]
    Kv(#[from] KvError),

    #[error("Weather error: {0}")]
    Weather(#[from] WeatherError),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}

impl From<CapabilityError> for crate::AppError {
    fn from(e: CapabilityError) -> Self {
        match e {
            CapabilityError::Http(e) => e.into(),
            CapabilityError::Kv(e) => e.into(),
            CapabilityError::Weather(e) => e.into(),
            CapabilityError::Scene(e) => e.into(),
        }
    }
}

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub render: Render<Event>,
    pub http: Http<Event>,
    pub kv: KeyValue<Event>,
    pub weather: Weather<Event>,
    pub scene: Scene<Event>,
}
