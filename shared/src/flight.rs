//! Bookkeeping for asynchronous work: which cards have a request outstanding,
//! and where the current card creation is.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::model::{CardId, Location, WeatherSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FlightKey {
    Card(CardId),
    Background,
}

impl fmt::Display for FlightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Card(id) => write!(f, "card:{id}"),
            Self::Background => f.write_str("background"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlightError {
    #[error("a request for {0} is already in flight")]
    Busy(FlightKey),
    #[error("a card is already being created")]
    CreationBusy,
    #[error("response belongs to a superseded creation")]
    Stale,
}

/// Rejects a second request for the same key while the first is pending, so
/// a late response can never overwrite a newer one.
#[derive(Debug, Default)]
pub struct FlightGuard {
    in_flight: HashSet<FlightKey>,
}

impl FlightGuard {
    pub fn try_begin(&mut self, key: FlightKey) -> Result<(), FlightError> {
        if self.in_flight.contains(&key) {
            return Err(FlightError::Busy(key));
        }
        self.in_flight.insert(key);
        Ok(())
    }

    /// Returns whether the key was in flight.
    pub fn finish(&mut self, key: &FlightKey) -> bool {
        self.in_flight.remove(key)
    }

    #[must_use]
    pub fn is_card_busy(&self, id: &CardId) -> bool {
        self.in_flight.contains(&FlightKey::Card(id.clone()))
    }
}

/// What the user asked to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CreationRequest {
    RealWeather {
        location: Location,
    },
    Fantasy {
        city: String,
        era: Option<String>,
        brief: Option<String>,
    },
}

impl CreationRequest {
    #[must_use]
    pub fn city(&self) -> &str {
        match self {
            Self::RealWeather { location } => &location.name,
            Self::Fantasy { city, .. } => city,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CreationStage {
    #[default]
    Idle,
    FetchingWeather {
        flow_id: u64,
        request: CreationRequest,
    },
    Generating {
        flow_id: u64,
        request: CreationRequest,
        weather: Option<Box<WeatherSnapshot>>,
    },
}

/// Card creation is single-flight: one request from selection to preview.
#[derive(Debug, Default)]
pub struct CreationFlow {
    stage: CreationStage,
    next_flow_id: u64,
}

impl CreationFlow {
    #[must_use]
    pub const fn stage(&self) -> &CreationStage {
        &self.stage
    }

    #[must_use]
    pub const fn is_busy(&self) -> bool {
        !matches!(self.stage, CreationStage::Idle)
    }

    #[must_use]
    pub const fn flow_id(&self) -> Option<u64> {
        match self.stage {
            CreationStage::Idle => None,
            CreationStage::FetchingWeather { flow_id, .. }
            | CreationStage::Generating { flow_id, .. } => Some(flow_id),
        }
    }

    #[must_use]
    pub fn request(&self) -> Option<&CreationRequest> {
        match &self.stage {
            CreationStage::Idle => None,
            CreationStage::FetchingWeather { request, .. }
            | CreationStage::Generating { request, .. } => Some(request),
        }
    }

    /// Real-weather creations start by fetching weather; fantasy creations go
    /// straight to generation.
    pub fn begin(&mut self, request: CreationRequest) -> Result<u64, FlightError> {
        if self.is_busy() {
            return Err(FlightError::CreationBusy);
        }
        self.next_flow_id += 1;
        let flow_id = self.next_flow_id;
        self.stage = match request {
            CreationRequest::RealWeather { .. } => CreationStage::FetchingWeather { flow_id, request },
            CreationRequest::Fantasy { .. } => CreationStage::Generating {
                flow_id,
                request,
                weather: None,
            },
        };
        Ok(flow_id)
    }

    fn check(&self, flow_id: u64) -> Result<(), FlightError> {
        if self.flow_id() == Some(flow_id) {
            Ok(())
        } else {
            Err(FlightError::Stale)
        }
    }

    pub fn weather_ready(&mut self, flow_id: u64, weather: WeatherSnapshot) -> Result<(), FlightError> {
        self.check(flow_id)?;
        let CreationStage::FetchingWeather { request, .. } = &self.stage else {
            return Err(FlightError::Stale);
        };
        self.stage = CreationStage::Generating {
            flow_id,
            request: request.clone(),
            weather: Some(Box::new(weather)),
        };
        Ok(())
    }

    /// Ends the flow and hands back what it was working on.
    pub fn finish(
        &mut self,
        flow_id: u64,
    ) -> Result<(CreationRequest, Option<WeatherSnapshot>), FlightError> {
        self.check(flow_id)?;
        match std::mem::take(&mut self.stage) {
            CreationStage::Idle => Err(FlightError::Stale),
            CreationStage::FetchingWeather { request, .. } => Ok((request, None)),
            CreationStage::Generating {
                request, weather, ..
            } => Ok((request, weather.map(|w| *w))),
        }
    }
}

/// The single recovery action offered by the error panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RetryAction {
    Create(CreationRequest),
    Refresh { card_id: CardId },
    Edit { card_id: CardId, instruction: String },
}
