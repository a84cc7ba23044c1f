//! Search-as-you-type for locations. Keystrokes are debounced, and only the
//! response to the latest query is ever applied.

use serde::{Deserialize, Serialize};

use crate::model::Location;
use crate::{SEARCH_DEBOUNCE_MS, SEARCH_MAX_RESULTS, SEARCH_MIN_CHARS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCandidate {
    pub id: u64,
    pub location: Location,
}

/// Geocoding API payload. `results` is omitted entirely when nothing matches.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct GeocodingResponse {
    #[serde(default)]
    pub results: Vec<GeocodingResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingResult {
    pub id: u64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub admin1: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

impl From<GeocodingResult> for LocationCandidate {
    fn from(r: GeocodingResult) -> Self {
        Self {
            id: r.id,
            location: Location {
                name: r.name,
                country: r.country,
                admin_area: r.admin1,
                latitude: r.latitude,
                longitude: r.longitude,
                timezone: r.timezone,
            },
        }
    }
}

impl GeocodingResponse {
    /// Usable candidates, capped at the suggestion limit.
    #[must_use]
    pub fn into_candidates(self) -> Vec<LocationCandidate> {
        self.results
            .into_iter()
            .map(LocationCandidate::from)
            .filter(|c| c.location.has_valid_coordinates())
            .take(SEARCH_MAX_RESULTS)
            .collect()
    }
}

/// A query that is due to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub generation: u64,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct LocationSearch {
    text: String,
    pending_since_ms: Option<u64>,
    generation: u64,
    in_flight: Option<u64>,
    echo: Option<String>,
    suggestions: Vec<LocationCandidate>,
    failed: bool,
}

impl LocationSearch {
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn suggestions(&self) -> &[LocationCandidate] {
        &self.suggestions
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.pending_since_ms.is_some() || self.in_flight.is_some()
    }

    #[must_use]
    pub const fn failed(&self) -> bool {
        self.failed
    }

    fn is_searchable(text: &str) -> bool {
        text.trim().chars().count() >= SEARCH_MIN_CHARS
    }

    /// Records a keystroke. Returns false when the change is only the echo of
    /// a selected suggestion's label.
    pub fn on_text_changed(&mut self, text: String, now_ms: u64) -> bool {
        if self.echo.take().is_some_and(|echo| echo == text) {
            self.text = text;
            return false;
        }
        self.generation += 1;
        self.in_flight = None;
        self.failed = false;
        if Self::is_searchable(&text) {
            self.pending_since_ms = Some(now_ms);
        } else {
            self.pending_since_ms = None;
            self.suggestions.clear();
        }
        self.text = text;
        true
    }

    /// Fires the debounced query once the quiet period has elapsed.
    pub fn poll(&mut self, now_ms: u64) -> Option<SearchQuery> {
        let since = self.pending_since_ms?;
        if now_ms.saturating_sub(since) < SEARCH_DEBOUNCE_MS {
            return None;
        }
        self.pending_since_ms = None;
        self.in_flight = Some(self.generation);
        Some(SearchQuery {
            generation: self.generation,
            text: self.text.trim().to_string(),
        })
    }

    /// Applies results unless a newer keystroke has superseded them.
    pub fn on_results(&mut self, generation: u64, candidates: Vec<LocationCandidate>) -> bool {
        if self.in_flight != Some(generation) {
            return false;
        }
        self.in_flight = None;
        self.suggestions = candidates.into_iter().take(SEARCH_MAX_RESULTS).collect();
        true
    }

    pub fn on_failure(&mut self, generation: u64) -> bool {
        if self.in_flight != Some(generation) {
            return false;
        }
        self.in_flight = None;
        self.failed = true;
        self.suggestions.clear();
        true
    }

    /// Picks a suggestion. The shell may echo the label back as a text change;
    /// that echo alone does not start another search.
    pub fn select(&mut self, index: usize) -> Option<LocationCandidate> {
        let candidate = self.suggestions.get(index)?.clone();
        self.text = candidate.location.display_name();
        self.suggestions.clear();
        self.pending_since_ms = None;
        self.in_flight = None;
        self.generation += 1;
        self.echo = Some(self.text.clone());
        Some(candidate)
    }
}
