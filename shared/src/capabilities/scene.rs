use crux_core::capability::{Capability, CapabilityContext, Operation};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::model::{ImageAsset, WeatherSnapshot};
use crate::{
    format_temperature, AppError, ErrorKind, MAX_IMAGE_BYTES, PLACEHOLDER_IMAGE_BASE_URL,
};

pub const MAX_INSTRUCTION_LENGTH: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SceneKind {
    RealWeather,
    /// The generator also invents the weather for a fantasy scene.
    Fantasy { era: Option<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SceneRequest {
    pub city: String,
    pub kind: SceneKind,
    pub prompt: String,
}

impl SceneRequest {
    #[must_use]
    pub fn real_weather(weather: &WeatherSnapshot) -> Self {
        let current = &weather.current;
        let time_of_day = if current.is_day { "daytime" } else { "night" };
        let prompt = format!(
            "A vivid illustrated street scene in {place}: {condition}, {temp} with wind at {wind:.0} km/h, {time_of_day}",
            place = weather.location.display_name(),
            condition = current.condition.display_name().to_lowercase(),
            temp = format_temperature(current.temperature_c),
            wind = current.wind_speed_kmh,
        );
        Self {
            city: weather.location.name.clone(),
            kind: SceneKind::RealWeather,
            prompt,
        }
    }

    #[must_use]
    pub fn fantasy(city: &str, era: Option<&str>, brief: Option<&str>) -> Self {
        let mut prompt = format!("A fantastical illustrated vision of {}", city.trim());
        if let Some(era) = era.map(str::trim).filter(|e| !e.is_empty()) {
            prompt.push_str(&format!(" in the {era}"));
        }
        if let Some(brief) = brief.map(str::trim).filter(|b| !b.is_empty()) {
            prompt.push_str(&format!(", {brief}"));
        }
        prompt.push_str(", with weather that fits the scene");
        Self {
            city: city.trim().to_string(),
            kind: SceneKind::Fantasy {
                era: era.map(str::trim).filter(|e| !e.is_empty()).map(String::from),
            },
            prompt,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SceneOperation {
    Generate(SceneRequest),
    Edit { image_ref: String, instruction: String },
    Background { prompt: String },
}

impl Operation for SceneOperation {
    type Output = SceneResult;
}

/// Picture returned by the generator. Bytes are optional: shells that keep
/// images on disk only send a reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedImage {
    pub image_ref: String,
    #[serde(default)]
    pub bytes: Option<Vec<u8>>,
}

impl GeneratedImage {
    /// Checks the payload and keeps only the reference.
    pub fn into_asset(self, now_ms: u64) -> Result<ImageAsset, SceneError> {
        if self.image_ref.trim().is_empty() {
            return Err(SceneError::EmptyImage);
        }
        let (mime_type, size_bytes) = match self.bytes.as_deref() {
            Some(bytes) => {
                let format = validate_image_bytes(bytes)?;
                (
                    Some(format.to_mime_type().to_string()),
                    u64::try_from(bytes.len()).ok(),
                )
            }
            None => (None, None),
        };
        Ok(ImageAsset {
            mime_type,
            size_bytes,
            ..ImageAsset::new(self.image_ref, now_ms)
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SceneOutput {
    pub image: GeneratedImage,
    #[serde(default)]
    pub weather: Option<WeatherSnapshot>,
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum SceneError {
    #[error("scene generation failed: {message}")]
    Generation { message: String },

    #[error("scene service unreachable: {message}")]
    Network { message: String },

    #[error("image is empty")]
    EmptyImage,

    #[error("image too large: {size} bytes, max {max}")]
    ImageTooLarge { size: usize, max: usize },

    #[error("unsupported image format")]
    UnsupportedFormat,

    #[error("fantasy scene came back without weather")]
    MissingWeather,

    #[error("invalid edit instruction: {reason}")]
    InvalidInstruction { reason: String },
}

impl From<SceneError> for AppError {
    fn from(e: SceneError) -> Self {
        let kind = match e {
            SceneError::Generation { .. } | SceneError::MissingWeather => ErrorKind::Generation,
            SceneError::Network { .. } => ErrorKind::Network,
            SceneError::ImageTooLarge { .. } => ErrorKind::ImageTooLarge,
            SceneError::EmptyImage | SceneError::UnsupportedFormat => {
                ErrorKind::ImageFormatUnsupported
            }
            SceneError::InvalidInstruction { .. } => ErrorKind::Validation,
        };
        let message = match &e {
            SceneError::InvalidInstruction { reason } => reason.clone(),
            _ => "Scene generation failed".to_string(),
        };
        AppError::new(kind, message).with_internal(e.to_string())
    }
}

pub type SceneResult = Result<SceneOutput, SceneError>;

pub fn validate_image_bytes(bytes: &[u8]) -> Result<ImageFormat, SceneError> {
    if bytes.is_empty() {
        return Err(SceneError::EmptyImage);
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(SceneError::ImageTooLarge {
            size: bytes.len(),
            max: MAX_IMAGE_BYTES,
        });
    }
    match image::guess_format(bytes) {
        Ok(format @ (ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP)) => Ok(format),
        _ => Err(SceneError::UnsupportedFormat),
    }
}

pub fn validate_instruction(instruction: &str) -> Result<String, SceneError> {
    let trimmed = instruction.trim();
    if trimmed.is_empty() {
        return Err(SceneError::InvalidInstruction {
            reason: "Describe the change you want".to_string(),
        });
    }
    if trimmed.chars().count() > MAX_INSTRUCTION_LENGTH {
        return Err(SceneError::InvalidInstruction {
            reason: format!("Keep the instruction under {MAX_INSTRUCTION_LENGTH} characters"),
        });
    }
    Ok(trimmed.to_string())
}

/// Stand-in picture used when a real-weather scene could not be generated.
/// The same city always produces the same reference.
#[must_use]
pub fn placeholder_image(city: &str, now_ms: u64) -> ImageAsset {
    let label = format!("{} Generation Failed", city.trim());
    let image_ref = Url::parse_with_params(PLACEHOLDER_IMAGE_BASE_URL, &[("text", label.as_str())])
        .map_or_else(|_| PLACEHOLDER_IMAGE_BASE_URL.to_string(), String::from);
    ImageAsset {
        is_placeholder: true,
        ..ImageAsset::new(image_ref, now_ms)
    }
}

pub struct Scene<Ev> {
    context: CapabilityContext<SceneOperation, Ev>,
}

impl<Ev> Capability<Ev> for Scene<Ev> {
    type Operation = SceneOperation;
    type MappedSelf<MappedEv> = Scene<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Scene::new(self.context.map_event(f))
    }
}

impl<Ev> Scene<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<SceneOperation, Ev>) -> Self {
        Self { context }
    }

    fn request<F>(&self, operation: SceneOperation, make_event: F)
    where
        F: FnOnce(SceneResult) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx.request_from_shell(operation).await;
            ctx.update_app(make_event(result));
        });
    }

    pub fn generate<F>(&self, request: SceneRequest, make_event: F)
    where
        F: FnOnce(SceneResult) -> Ev + Send + 'static,
    {
        self.request(SceneOperation::Generate(request), make_event);
    }

    pub fn edit<F>(&self, image_ref: String, instruction: String, make_event: F)
    where
        F: FnOnce(SceneResult) -> Ev + Send + 'static,
    {
        self.request(
            SceneOperation::Edit {
                image_ref,
                instruction,
            },
            make_event,
        );
    }

    pub fn background<F>(&self, prompt: String, make_event: F)
    where
        F: FnOnce(SceneResult) -> Ev + Send + 'static,
    {
        self.request(SceneOperation::Background { prompt }, make_event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::snapshot;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    mod image_tests {
        use super::*;

        #[test]
        fn test_accepts_png_and_jpeg() {
            assert_eq!(validate_image_bytes(PNG_MAGIC), Ok(ImageFormat::Png));
            assert_eq!(validate_image_bytes(JPEG_MAGIC), Ok(ImageFormat::Jpeg));
        }

        #[test]
        fn test_rejects_empty_and_garbage() {
            assert_eq!(validate_image_bytes(&[]), Err(SceneError::EmptyImage));
            assert_eq!(
                validate_image_bytes(b"hello world, not an image"),
                Err(SceneError::UnsupportedFormat)
            );
        }

        #[test]
        fn test_rejects_oversized() {
            let mut bytes = PNG_MAGIC.to_vec();
            bytes.resize(MAX_IMAGE_BYTES + 1, 0);
            assert!(matches!(
                validate_image_bytes(&bytes),
                Err(SceneError::ImageTooLarge { .. })
            ));
        }

        #[test]
        fn test_into_asset_records_mime_type() {
            let generated = GeneratedImage {
                image_ref: "file:///scenes/1.png".into(),
                bytes: Some(PNG_MAGIC.to_vec()),
            };
            let asset = generated.into_asset(7).unwrap();
            assert_eq!(asset.mime_type.as_deref(), Some("image/png"));
            assert_eq!(asset.generated_at_ms, 7);
            assert!(!asset.is_placeholder);
        }

        #[test]
        fn test_into_asset_without_bytes() {
            let generated = GeneratedImage {
                image_ref: "scene-42".into(),
                bytes: None,
            };
            let asset = generated.into_asset(1).unwrap();
            assert_eq!(asset.image_ref, "scene-42");
            assert_eq!(asset.mime_type, None);
        }

        #[test]
        fn test_placeholder_is_deterministic() {
            let a = placeholder_image("New York", 1);
            let b = placeholder_image("New York", 2);
            assert_eq!(a.image_ref, b.image_ref);
            assert!(a.is_placeholder);
            assert!(a.image_ref.starts_with(PLACEHOLDER_IMAGE_BASE_URL));
            assert!(a.image_ref.contains("New+York+Generation+Failed"));
        }
    }

    mod prompt_tests {
        use super::*;

        #[test]
        fn test_real_weather_prompt_mentions_conditions() {
            let request = SceneRequest::real_weather(&snapshot("Lisbon", 21.4));
            assert_eq!(request.city, "Lisbon");
            assert_eq!(request.kind, SceneKind::RealWeather);
            assert!(request.prompt.contains("Lisbon"));
            assert!(request.prompt.contains("partly cloudy"));
            assert!(request.prompt.contains("21°"));
        }

        #[test]
        fn test_fantasy_prompt_skips_blank_parts() {
            let request = SceneRequest::fantasy(" Atlantis ", Some("  "), Some("floating markets"));
            assert_eq!(request.city, "Atlantis");
            assert_eq!(request.kind, SceneKind::Fantasy { era: None });
            assert!(request.prompt.contains("floating markets"));
            assert!(!request.prompt.contains(" in the "));
        }
    }

    #[test]
    fn test_instruction_validation() {
        assert!(validate_instruction("   ").is_err());
        assert_eq!(validate_instruction(" add snow ").unwrap(), "add snow");
        assert!(validate_instruction(&"x".repeat(MAX_INSTRUCTION_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_missing_weather_maps_to_generation_error() {
        let err: AppError = SceneError::MissingWeather.into();
        assert_eq!(err.kind, ErrorKind::Generation);
    }
}
