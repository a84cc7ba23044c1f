use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Location, WeatherSnapshot};
use crate::{AppError, ErrorKind};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum WeatherOperation {
    Fetch { location: Location },
}

impl Operation for WeatherOperation {
    type Output = WeatherResult;
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum WeatherError {
    #[error("weather service unreachable: {message}")]
    Network { message: String },

    #[error("weather data incomplete, missing {missing}")]
    IncompleteData { missing: String },

    #[error("no weather for this location")]
    NotFound,
}

impl WeatherError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::Network,
            Self::IncompleteData { .. } => ErrorKind::IncompleteData,
            Self::NotFound => ErrorKind::LocationNotFound,
        }
    }
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        let kind = e.kind();
        AppError::new(kind, "Weather fetch failed").with_internal(e.to_string())
    }
}

pub type WeatherResult = Result<WeatherSnapshot, WeatherError>;

/// Rejects snapshots missing the fields a card needs.
pub fn validate_snapshot(snapshot: WeatherSnapshot) -> WeatherResult {
    let missing = if snapshot.location.name.trim().is_empty() {
        Some("location.name")
    } else if !snapshot.location.has_valid_coordinates() {
        Some("location.coordinates")
    } else if !snapshot.current.temperature_c.is_finite() {
        Some("current.temperature")
    } else {
        None
    };
    match missing {
        Some(field) => Err(WeatherError::IncompleteData {
            missing: field.to_string(),
        }),
        None => Ok(snapshot),
    }
}

pub struct Weather<Ev> {
    context: CapabilityContext<WeatherOperation, Ev>,
}

impl<Ev> Capability<Ev> for Weather<Ev> {
    type Operation = WeatherOperation;
    type MappedSelf<MappedEv> = Weather<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Weather::new(self.context.map_event(f))
    }
}

impl<Ev> Weather<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<WeatherOperation, Ev>) -> Self {
        Self { context }
    }

    /// Asks the shell for current conditions at `location`.
    pub fn fetch<F>(&self, location: Location, make_event: F)
    where
        F: FnOnce(WeatherResult) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx
                .request_from_shell(WeatherOperation::Fetch { location })
                .await
                .and_then(validate_snapshot);
            ctx.update_app(make_event(result));
        });
    }
}
