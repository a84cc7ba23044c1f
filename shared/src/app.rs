use tracing::{debug, error, info, trace, warn};

use crate::capabilities::{
    background_cache_key, geocoding_url, placeholder_image, validate_instruction,
    validate_snapshot, CachedBackground, Capabilities, CapabilityError, HttpError, KvError,
    SceneError, SceneRequest, SceneResult, WeatherResult,
};
use crate::config::{LayoutMetrics, StackConfig};
use crate::event::Event;
use crate::flight::{CreationRequest, FlightKey, RetryAction};
use crate::model::{Card, CardId, CardOrigin, ImageAsset, Model, ToastKind, ViewConfig, WeatherSnapshot};
use crate::search::{GeocodingResponse, SearchQuery};
use crate::stack::StackError;
use crate::view::{self, ViewModel};
use crate::view_mode::PreviewPlacement;
use crate::{AppError, AppResult, ErrorKind, BACKGROUND_PROMPT, GEOCODING_BASE_URL, SEARCH_MAX_RESULTS};

#[derive(Default)]
pub struct App;

impl App {
    fn log_stack_rejection(action: &'static str, e: &StackError) {
        if e.is_silent() {
            debug!(action, error = %e, "input ignored");
        } else {
            warn!(action, error = %e, "stack operation failed");
        }
    }

    fn handle_configure(model: &mut Model, config: StackConfig) {
        match config.validate() {
            Ok(config) => {
                model.config = config;
                model.stack.apply_config(&config);
                model.view_mode.apply_config(&config);
                info!(
                    swipe_threshold = config.swipe_threshold_px,
                    max_stacked_behind = config.max_stacked_behind,
                    "stack configuration applied"
                );
            }
            Err(e) => {
                let error = AppError::from(e);
                warn!(error = %error, "configuration rejected, keeping previous");
            }
        }
    }

    fn handle_card_clicked(model: &mut Model, relative_offset: i32) {
        if relative_offset == 0 {
            let card_id = match model.stack.select_active() {
                Ok(id) => id,
                Err(e) => return Self::log_stack_rejection("select", &e),
            };
            match model.view_mode.enter_expanded(card_id.clone()) {
                Ok(()) => info!(card_id = %card_id, "card expanded"),
                Err(e) => debug!(error = %e, "expand refused"),
            }
        } else if let Err(e) = model.stack.jump_to(relative_offset) {
            Self::log_stack_rejection("jump", &e);
        } else {
            debug!(offset = relative_offset, cursor = model.stack.cursor(), "jumped to card");
        }
    }

    fn handle_remove(model: &mut Model, card_id: &CardId) {
        match model.stack.remove_card(card_id) {
            Ok(removed) => {
                if model.view_mode.expanded_card_id() == Some(card_id) {
                    model.view_mode.return_to_stack();
                }
                info!(
                    card_id = %card_id,
                    remaining = model.stack.len(),
                    "card removed"
                );
                if removed.became_empty {
                    debug!("stack is now empty");
                }
                model.show_toast(format!("Removed {}", removed.card.city()), ToastKind::Info);
            }
            Err(e) => {
                Self::log_stack_rejection("remove", &e);
                if !e.is_silent() {
                    model.set_error(e.into(), None);
                }
            }
        }
    }

    fn handle_save_preview(model: &mut Model) {
        match model.view_mode.save_preview() {
            Ok(card) => {
                let city = card.city().to_string();
                let card_id = card.id.clone();
                let position = model.stack.push_and_activate(card);
                info!(card_id = %card_id, position, "preview saved");
                model.show_toast(format!("Saved {city}"), ToastKind::Success);
            }
            Err(e) => debug!(error = %e, "nothing to save"),
        }
    }

    fn present_preview(model: &mut Model, card: Card) {
        let card_id = card.id.clone();
        match model.view_mode.offer_preview(card) {
            Ok(PreviewPlacement::Presented) => info!(card_id = %card_id, "preview presented"),
            Ok(PreviewPlacement::Queued) => {
                info!(card_id = %card_id, "preview held until expanded card closes");
            }
            Err(e) => {
                warn!(card_id = %card_id, error = %e, "preview dropped");
                model.show_toast("Save or discard the current preview first", ToastKind::Warning);
            }
        }
    }

    // --- search ---

    fn send_search(model: &mut Model, caps: &Capabilities, query: SearchQuery) {
        let generation = query.generation;
        let url = match geocoding_url(GEOCODING_BASE_URL, &query.text, SEARCH_MAX_RESULTS) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "search query rejected");
                model.search.on_failure(generation);
                return;
            }
        };
        debug!(generation, host = url.host(), "location search sent");
        caps.http
            .get(url.as_str())
            .expect_json::<GeocodingResponse>()
            .send(move |result| Event::SearchResponse {
                generation,
                result: result.map_err(HttpError::from).map(|mut response| {
                    response
                        .take_body()
                        .unwrap_or_default()
                        .into_candidates()
                }),
            });
    }

    // --- creation ---

    fn start_creation(model: &mut Model, caps: &Capabilities, request: CreationRequest) {
        if model.view_mode.preview_card().is_some() || model.view_mode.has_queued_preview() {
            debug!(city = request.city(), "creation refused while a preview is pending");
            return;
        }
        let flow_id = match model.creation.begin(request.clone()) {
            Ok(id) => id,
            Err(e) => {
                debug!(error = %e, city = request.city(), "creation refused");
                return;
            }
        };
        model.clear_error();
        info!(flow_id, city = request.city(), "creation started");

        match request {
            CreationRequest::RealWeather { location } => {
                caps.weather.fetch(location, move |result| Event::WeatherFetched {
                    flow_id,
                    result: Box::new(result),
                });
            }
            CreationRequest::Fantasy { city, era, brief } => {
                let scene = SceneRequest::fantasy(&city, era.as_deref(), brief.as_deref());
                caps.scene.generate(scene, move |result| Event::SceneGenerated {
                    flow_id,
                    result: Box::new(result),
                });
            }
        }
    }

    fn handle_creation_weather(
        model: &mut Model,
        caps: &Capabilities,
        flow_id: u64,
        result: WeatherResult,
    ) {
        match result {
            Ok(snapshot) => {
                let scene = SceneRequest::real_weather(&snapshot);
                if let Err(e) = model.creation.weather_ready(flow_id, snapshot) {
                    debug!(flow_id, error = %e, "weather response ignored");
                    return;
                }
                caps.scene.generate(scene, move |result| Event::SceneGenerated {
                    flow_id,
                    result: Box::new(result),
                });
            }
            Err(e) => {
                let Ok((request, _)) = model.creation.finish(flow_id) else {
                    debug!(flow_id, "stale weather failure ignored");
                    return;
                };
                warn!(flow_id, city = request.city(), error = %e, "weather fetch failed");
                let error = AppError::from(e).with_context("city", request.city());
                model.set_error(error, Some(RetryAction::Create(request)));
            }
        }
    }

    fn handle_creation_scene(model: &mut Model, flow_id: u64, result: SceneResult) {
        let (request, weather) = match model.creation.finish(flow_id) {
            Ok(done) => done,
            Err(e) => {
                debug!(flow_id, error = %e, "scene response ignored");
                return;
            }
        };
        let now = model.now_ms;

        let card = match &request {
            CreationRequest::RealWeather { location } => {
                let Some(weather) = weather else {
                    error!(flow_id, "real-weather scene finished without weather");
                    model.set_error(
                        AppError::new(ErrorKind::Internal, "Missing weather for scene"),
                        None,
                    );
                    return;
                };
                let image = result
                    .and_then(|output| output.image.into_asset(now))
                    .unwrap_or_else(|e| {
                        warn!(flow_id, error = %e, "scene generation failed, using placeholder");
                        placeholder_image(&location.name, now)
                    });
                Card::new(weather, image, CardOrigin::RealWeather, now)
            }
            CreationRequest::Fantasy { era, brief, .. } => match Self::fantasy_parts(result, now) {
                Ok((weather, image)) => {
                    let origin = CardOrigin::Fantasy {
                        era: era.clone(),
                        brief: brief.clone(),
                    };
                    Card::new(weather, image, origin, now)
                }
                Err(e) => {
                    warn!(flow_id, city = request.city(), error = %e, "fantasy creation failed");
                    let error = e.with_context("city", request.city());
                    model.set_error(error, Some(RetryAction::Create(request.clone())));
                    return;
                }
            },
        };
        Self::present_preview(model, card);
    }

    fn fantasy_parts(result: SceneResult, now: u64) -> AppResult<(WeatherSnapshot, ImageAsset)> {
        let output = result?;
        let weather = output.weather.ok_or(SceneError::MissingWeather)?;
        let weather = validate_snapshot(weather)?;
        let image = output.image.into_asset(now)?;
        Ok((weather, image))
    }

    // --- card refresh and edit ---

    fn handle_refresh(model: &mut Model, caps: &Capabilities, card_id: CardId) {
        let Some(card) = model.stack.card(&card_id) else {
            warn!(card_id = %card_id, "refresh for unknown card");
            model.set_error(StackError::UnknownCard(card_id).into(), None);
            return;
        };
        let location = card.weather.location.clone();
        let fantasy = match &card.origin {
            CardOrigin::Fantasy { era, brief } => {
                Some((card.city().to_string(), era.clone(), brief.clone()))
            }
            CardOrigin::RealWeather => None,
        };
        if let Err(e) = model.flights.try_begin(FlightKey::Card(card_id.clone())) {
            debug!(error = %e, "refresh refused");
            return;
        }
        info!(card_id = %card_id, "refreshing card");

        if let Some((city, era, brief)) = fantasy {
            let scene = SceneRequest::fantasy(&city, era.as_deref(), brief.as_deref());
            caps.scene.generate(scene, move |result| Event::CardSceneRefreshed {
                card_id,
                weather: None,
                result: Box::new(result),
            });
        } else {
            caps.weather.fetch(location, move |result| Event::CardWeatherRefreshed {
                card_id,
                result: Box::new(result),
            });
        }
    }

    fn handle_refresh_weather(
        model: &mut Model,
        caps: &Capabilities,
        card_id: CardId,
        result: WeatherResult,
    ) {
        match result {
            Ok(snapshot) => {
                let scene = SceneRequest::real_weather(&snapshot);
                let weather = Some(Box::new(snapshot));
                caps.scene.generate(scene, move |result| Event::CardSceneRefreshed {
                    card_id,
                    weather,
                    result: Box::new(result),
                });
            }
            Err(e) => {
                model.flights.finish(&FlightKey::Card(card_id.clone()));
                warn!(card_id = %card_id, error = %e, "refresh weather failed");
                let error = AppError::from(e).with_context("card_id", card_id.as_str());
                model.set_error(error, Some(RetryAction::Refresh { card_id }));
            }
        }
    }

    fn refreshed_parts(
        weather: Option<WeatherSnapshot>,
        result: SceneResult,
        now: u64,
    ) -> AppResult<(WeatherSnapshot, ImageAsset)> {
        match weather {
            Some(weather) => {
                let image = result?.image.into_asset(now)?;
                Ok((weather, image))
            }
            None => Self::fantasy_parts(result, now),
        }
    }

    fn handle_refresh_scene(
        model: &mut Model,
        card_id: CardId,
        weather: Option<WeatherSnapshot>,
        result: SceneResult,
    ) {
        model.flights.finish(&FlightKey::Card(card_id.clone()));
        match Self::refreshed_parts(weather, result, model.now_ms) {
            Ok((weather, image)) => match model.stack.apply_refresh(&card_id, weather, image) {
                Ok(()) => {
                    info!(card_id = %card_id, "card refreshed");
                    model.show_toast("Refreshed", ToastKind::Success);
                }
                Err(e) => Self::log_stack_rejection("refresh", &e),
            },
            Err(e) => {
                warn!(card_id = %card_id, error = %e, "refresh failed, card unchanged");
                let error = e.with_context("card_id", card_id.as_str());
                model.set_error(error, Some(RetryAction::Refresh { card_id }));
            }
        }
    }

    fn handle_edit(model: &mut Model, caps: &Capabilities, card_id: CardId, instruction: &str) {
        let instruction = match validate_instruction(instruction) {
            Ok(i) => i,
            Err(e) => {
                model.set_error(e.into(), None);
                return;
            }
        };
        let Some(card) = model.stack.card(&card_id) else {
            warn!(card_id = %card_id, "edit for unknown card");
            model.set_error(StackError::UnknownCard(card_id).into(), None);
            return;
        };
        let image_ref = card.image.image_ref.clone();
        if let Err(e) = model.flights.try_begin(FlightKey::Card(card_id.clone())) {
            debug!(error = %e, "edit refused");
            return;
        }
        info!(card_id = %card_id, "editing card image");

        let retry = RetryAction::Edit {
            card_id: card_id.clone(),
            instruction: instruction.clone(),
        };
        caps.scene.edit(image_ref, instruction, move |result| Event::CardImageEdited {
            card_id,
            retry,
            result: Box::new(result),
        });
    }

    fn handle_edit_result(model: &mut Model, card_id: CardId, retry: RetryAction, result: SceneResult) {
        model.flights.finish(&FlightKey::Card(card_id.clone()));
        let now = model.now_ms;
        match result.and_then(|output| output.image.into_asset(now)) {
            Ok(image) => match model.stack.apply_image_edit(&card_id, image) {
                Ok(()) => info!(card_id = %card_id, "card image edited"),
                Err(e) => Self::log_stack_rejection("edit", &e),
            },
            Err(e) => {
                warn!(card_id = %card_id, error = %e, "image edit failed");
                let error = AppError::from(e).with_context("card_id", card_id.as_str());
                model.set_error(error, Some(retry));
            }
        }
    }

    fn handle_view_config(model: &mut Model, card_id: &CardId, scale: f64, offset_x: f64, offset_y: f64) {
        let config = match ViewConfig::new(scale, offset_x, offset_y) {
            Ok(config) => config,
            Err(e) => {
                debug!(card_id = %card_id, error = %e, "view transform ignored");
                return;
            }
        };
        if let Err(e) = model.stack.set_view_config(card_id, config) {
            Self::log_stack_rejection("view_config", &e);
        }
    }

    fn handle_retry(model: &mut Model, caps: &Capabilities) {
        let Some(action) = model.retry.take() else {
            debug!("retry requested with nothing to retry");
            return;
        };
        model.clear_error();
        info!(?action, "retrying");
        match action {
            RetryAction::Create(request) => Self::start_creation(model, caps, request),
            RetryAction::Refresh { card_id } => Self::handle_refresh(model, caps, card_id),
            RetryAction::Edit {
                card_id,
                instruction,
            } => Self::handle_edit(model, caps, card_id, &instruction),
        }
    }

    // --- background ---

    fn load_background(model: &mut Model, caps: &Capabilities) {
        let key = match background_cache_key(BACKGROUND_PROMPT) {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "background cache key rejected");
                return;
            }
        };
        if model.flights.try_begin(FlightKey::Background).is_err() {
            return;
        }
        caps.kv.get(key.raw(), |result| Event::BackgroundLoaded {
            result: result.map_err(KvError::from),
        });
    }

    fn generate_background(caps: &Capabilities) {
        caps.scene
            .background(BACKGROUND_PROMPT.to_string(), |result| Event::BackgroundGenerated {
                result: Box::new(result),
            });
    }

    fn handle_background_loaded(
        model: &mut Model,
        caps: &Capabilities,
        result: Result<Option<Vec<u8>>, KvError>,
    ) {
        let cached = result.and_then(|bytes| match bytes {
            Some(bytes) => CachedBackground::decode(&bytes),
            None => Ok(None),
        });
        match cached {
            Ok(Some(cached)) => {
                model.flights.finish(&FlightKey::Background);
                debug!(stored_at_ms = cached.stored_at_ms, "background loaded from cache");
                model.background = Some(cached.image);
            }
            Ok(None) => {
                debug!("background cache miss");
                Self::generate_background(caps);
            }
            Err(e) => {
                warn!(error = %e, "background cache unreadable, regenerating");
                Self::generate_background(caps);
            }
        }
    }

    fn store_background(
        model: &mut Model,
        caps: &Capabilities,
        result: SceneResult,
    ) -> Result<(), CapabilityError> {
        let image = result?.image.into_asset(model.now_ms)?;
        let key = background_cache_key(BACKGROUND_PROMPT)?;
        let bytes = CachedBackground::new(image.clone(), model.now_ms).encode()?;
        model.background = Some(image);
        caps.kv.set(key.raw(), bytes, |result| Event::BackgroundStored {
            result: result.map(|_| ()).map_err(KvError::from),
        });
        Ok(())
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    #[allow(clippy::too_many_lines)]
    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        let event_name = event.name();
        if event.is_high_frequency() {
            trace!(event = event_name, "update");
        } else {
            debug!(
                event = event_name,
                user_initiated = event.is_user_initiated(),
                "update"
            );
        }

        let mut render = true;

        match event {
            Event::AppStarted => {
                info!(cards = model.stack.len(), "app started");
                Self::load_background(model, caps);
            }

            Event::ViewportResized {
                width,
                height,
                card_width,
            } => match LayoutMetrics::new(width, height, card_width) {
                Ok(metrics) => model.metrics = metrics,
                Err(e) => warn!(error = %e, "viewport rejected, keeping previous metrics"),
            },

            Event::Configure(config) => Self::handle_configure(model, config),

            Event::TimerTick { now_ms } => {
                model.now_ms = now_ms;
                render = false;
                if let Some(query) = model.search.poll(now_ms) {
                    Self::send_search(model, caps, query);
                    render = true;
                }
                if model
                    .active_toast
                    .as_ref()
                    .is_some_and(|t| t.is_expired(now_ms))
                {
                    model.clear_toast();
                    render = true;
                }
            }

            // Stack gestures
            Event::PointerDown { x } => {
                render = false;
                if let Err(e) = model.stack.begin_drag(x) {
                    Self::log_stack_rejection("pointer_down", &e);
                }
            }

            Event::PointerMove { x } => match model.stack.update_drag(x) {
                Ok(Some(offset)) => trace!(offset, "dragging"),
                Ok(None) => render = false,
                Err(e) => {
                    render = false;
                    Self::log_stack_rejection("pointer_move", &e);
                }
            },

            Event::PointerUp => match model.stack.end_drag() {
                Ok(Some(release)) => {
                    if let Some(direction) = release.committed {
                        info!(
                            ?direction,
                            delta = release.delta,
                            cursor = model.stack.cursor(),
                            "swipe committed"
                        );
                    }
                }
                Ok(None) => render = false,
                Err(e) => {
                    render = false;
                    Self::log_stack_rejection("pointer_up", &e);
                }
            },

            Event::PointerCancel => {
                model.stack.cancel_drag();
                model.view_mode.cancel_dismiss();
            }

            Event::CardClicked { relative_offset } => {
                Self::handle_card_clicked(model, relative_offset);
            }

            Event::NavigateBy { delta } => {
                if let Err(e) = model.stack.navigate(delta) {
                    Self::log_stack_rejection("navigate", &e);
                }
            }

            Event::RemoveCard { card_id } => Self::handle_remove(model, &card_id),

            // Expanded / Preview
            Event::CloseRequested => match model.view_mode.close() {
                Ok(closed) => info!(mode = closed.name(), "overlay closed"),
                Err(e) => debug!(error = %e, "close ignored"),
            },

            Event::DismissDragStarted { y } => {
                if let Err(e) = model.view_mode.begin_dismiss(y) {
                    debug!(error = %e, "dismiss drag not armed");
                }
            }

            Event::DismissDragMoved { y } => {
                render = model.view_mode.update_dismiss(y).is_some();
            }

            Event::DismissDragEnded => {
                if let Some(closed) = model.view_mode.end_dismiss(model.metrics.viewport_height) {
                    info!(mode = closed.name(), "overlay dismissed by drag");
                }
            }

            Event::DismissDragCancelled => model.view_mode.cancel_dismiss(),

            Event::ExpandedScrolled { offset } => {
                if let Err(e) = model.view_mode.set_scroll_offset(offset) {
                    render = false;
                    debug!(error = %e, "scroll ignored");
                }
            }

            Event::ViewTransitionEnded => model.view_mode.transition_ended(),

            Event::SavePreview => Self::handle_save_preview(model),

            Event::DiscardPreview => match model.view_mode.discard_preview() {
                Ok(card) => info!(city = card.city(), "preview discarded"),
                Err(e) => debug!(error = %e, "nothing to discard"),
            },

            // Card actions
            Event::RefreshCard { card_id } => Self::handle_refresh(model, caps, card_id),

            Event::EditCardImage {
                card_id,
                instruction,
            } => Self::handle_edit(model, caps, card_id, &instruction),

            Event::CardViewConfigChanged {
                card_id,
                scale,
                offset_x,
                offset_y,
            } => Self::handle_view_config(model, &card_id, scale, offset_x, offset_y),

            // Creation
            Event::SearchTextChanged { text } => {
                if !model.search.on_text_changed(text, model.now_ms) {
                    trace!("search echo suppressed");
                }
            }

            Event::SuggestionSelected { index } => match model.search.select(index) {
                Some(candidate) => {
                    let request = CreationRequest::RealWeather {
                        location: candidate.location,
                    };
                    Self::start_creation(model, caps, request);
                }
                None => debug!(index, "no suggestion at index"),
            },

            Event::CreateFantasy { city, era, brief } => {
                let city = city.trim().to_string();
                if city.is_empty() {
                    model.set_error(
                        AppError::new(ErrorKind::Validation, "Enter a city name"),
                        None,
                    );
                } else {
                    Self::start_creation(model, caps, CreationRequest::Fantasy { city, era, brief });
                }
            }

            Event::RetryRequested => Self::handle_retry(model, caps),
            Event::DismissError => model.clear_error(),
            Event::DismissToast => model.clear_toast(),

            // Capability responses
            Event::SearchResponse { generation, result } => match result {
                Ok(candidates) => {
                    let count = candidates.len();
                    if model.search.on_results(generation, candidates) {
                        debug!(generation, count, "search results applied");
                    } else {
                        render = false;
                        debug!(generation, "stale search results dropped");
                    }
                }
                Err(e) => {
                    if model.search.on_failure(generation) {
                        warn!(generation, error = %e, "location search failed");
                    } else {
                        render = false;
                    }
                }
            },

            Event::WeatherFetched { flow_id, result } => {
                Self::handle_creation_weather(model, caps, flow_id, *result);
            }

            Event::SceneGenerated { flow_id, result } => {
                Self::handle_creation_scene(model, flow_id, *result);
            }

            Event::CardWeatherRefreshed { card_id, result } => {
                Self::handle_refresh_weather(model, caps, card_id, *result);
            }

            Event::CardSceneRefreshed {
                card_id,
                weather,
                result,
            } => Self::handle_refresh_scene(model, card_id, weather.map(|w| *w), *result),

            Event::CardImageEdited {
                card_id,
                retry,
                result,
            } => Self::handle_edit_result(model, card_id, retry, *result),

            Event::BackgroundLoaded { result } => {
                Self::handle_background_loaded(model, caps, result);
            }

            Event::BackgroundGenerated { result } => {
                model.flights.finish(&FlightKey::Background);
                if let Err(e) = Self::store_background(model, caps, *result) {
                    let error = AppError::from(e);
                    warn!(error = %error, "background unavailable");
                }
            }

            Event::BackgroundStored { result } => {
                render = false;
                match result {
                    Ok(()) => debug!("background cached"),
                    Err(e) => warn!(error = %e, "background cache write failed"),
                }
            }
        }

        model
            .stack
            .set_mode_allows_gestures(model.view_mode.is_stack());

        if render {
            caps.render.render();
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        view::build(model)
    }
}
