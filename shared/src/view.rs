use serde::{Deserialize, Serialize};

use crate::flight::CreationStage;
use crate::layout::{CardTransform, StackLayoutEngine};
use crate::model::{Card, Model, ToastKind, ToastMessage, ViewConfig};
use crate::view_mode::{ExitAnimation, ViewMode};
use crate::{format_temperature, AppError, ErrorSeverity};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserFacingError {
    pub message: String,
    pub is_transient: bool,
    pub is_retryable: bool,
    pub error_code: String,
}

impl From<&AppError> for UserFacingError {
    fn from(e: &AppError) -> Self {
        Self {
            message: e.user_facing_message(),
            is_transient: e.severity == ErrorSeverity::Transient,
            is_retryable: e.is_retryable(),
            error_code: e.code().to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToastView {
    pub message: String,
    pub kind: ToastKind,
    pub duration_ms: u64,
}

impl From<&ToastMessage> for ToastView {
    fn from(t: &ToastMessage) -> Self {
        Self {
            message: t.message.clone(),
            kind: t.kind,
            duration_ms: t.duration_ms,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CardView {
    pub id: String,
    pub city: String,
    pub location_label: String,
    pub temperature: String,
    pub condition: String,
    pub image_ref: String,
    pub is_placeholder: bool,
    pub is_fantasy: bool,
    pub view_config: ViewConfig,
    /// A refresh or edit is pending for this card.
    pub is_busy: bool,
}

impl CardView {
    fn new(card: &Card, is_busy: bool) -> Self {
        Self {
            id: card.id.to_string(),
            city: card.city().to_string(),
            location_label: card.weather.location.display_name(),
            temperature: format_temperature(card.weather.current.temperature_c),
            condition: card.weather.current.condition.to_string(),
            image_ref: card.image.image_ref.clone(),
            is_placeholder: card.image.is_placeholder,
            is_fantasy: card.is_fantasy(),
            view_config: card.image.view_config.unwrap_or_default(),
            is_busy,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StackCardView {
    pub relative_offset: i32,
    pub card: CardView,
    pub transform: CardTransform,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModeView {
    Stack,
    Expanded { card: CardView, scroll_offset: f64 },
    Preview { card: CardView },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TransitionView {
    pub entering: bool,
    pub exit: Option<ExitAnimation>,
    /// Downward offset of the overlay while it is being dragged to dismiss.
    pub dismiss_offset: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SuggestionView {
    pub index: usize,
    pub label: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SearchView {
    pub text: String,
    pub suggestions: Vec<SuggestionView>,
    pub is_loading: bool,
    pub failed: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CreationView {
    pub in_progress: bool,
    pub status: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub mode: ModeView,
    pub cards: Vec<StackCardView>,
    pub card_count: usize,
    pub active_position: Option<usize>,
    pub gestures_enabled: bool,
    pub is_dragging: bool,
    pub transition: TransitionView,
    pub search: SearchView,
    pub creation: CreationView,
    pub background_image: Option<String>,
    pub error: Option<UserFacingError>,
    pub toast: Option<ToastView>,
}

fn mode_view(model: &Model) -> ModeView {
    match model.view_mode.mode() {
        ViewMode::Stack => ModeView::Stack,
        ViewMode::Expanded { card_id } => match model.stack.card(card_id) {
            Some(card) => ModeView::Expanded {
                card: CardView::new(card, model.flights.is_card_busy(card_id)),
                scroll_offset: model.view_mode.scroll_offset(),
            },
            None => ModeView::Stack,
        },
        ViewMode::Preview { card } => ModeView::Preview {
            card: CardView::new(card, false),
        },
    }
}

fn creation_view(model: &Model) -> CreationView {
    let status = match model.creation.stage() {
        CreationStage::Idle => None,
        CreationStage::FetchingWeather { request, .. } => {
            Some(format!("Checking the weather in {}", request.city()))
        }
        CreationStage::Generating { request, .. } => {
            Some(format!("Painting {}", request.city()))
        }
    };
    CreationView {
        in_progress: status.is_some(),
        status,
    }
}

#[must_use]
pub fn build(model: &Model) -> ViewModel {
    let engine = StackLayoutEngine::new(model.metrics, model.config);
    let drag = model.metrics.normalize_drag(model.stack.drag_state().current_offset_x);

    let cards = model
        .stack
        .layout(&engine, drag)
        .into_iter()
        .map(|(slot, card, transform)| StackCardView {
            relative_offset: slot.relative_offset,
            card: CardView::new(card, model.flights.is_card_busy(&card.id)),
            transform,
        })
        .collect();

    let search = SearchView {
        text: model.search.text().to_string(),
        suggestions: model
            .search
            .suggestions()
            .iter()
            .enumerate()
            .map(|(index, c)| SuggestionView {
                index,
                label: c.location.display_name(),
            })
            .collect(),
        is_loading: model.search.is_loading(),
        failed: model.search.failed(),
    };

    let error = model.active_error.as_ref().map(|e| {
        let mut view = UserFacingError::from(e);
        view.is_retryable = view.is_retryable && model.retry.is_some();
        view
    });

    ViewModel {
        mode: mode_view(model),
        cards,
        card_count: model.stack.len(),
        active_position: model.stack.active_position(),
        gestures_enabled: model.gestures_enabled(),
        is_dragging: model.stack.is_dragging(),
        transition: TransitionView {
            entering: model.view_mode.is_entering(),
            exit: model.view_mode.exit_animation(),
            dismiss_offset: model.view_mode.dismiss_offset(),
        },
        search,
        creation: creation_view(model),
        background_image: model.background.as_ref().map(|b| b.image_ref.clone()),
        error,
        toast: model.active_toast.as_ref().map(ToastView::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::card;
    use crate::ErrorKind;

    #[test]
    fn test_empty_model_view() {
        let vm = build(&Model::default());
        assert_eq!(vm.mode, ModeView::Stack);
        assert!(vm.cards.is_empty());
        assert_eq!(vm.active_position, None);
        assert!(!vm.gestures_enabled);
        assert!(vm.error.is_none());
    }

    #[test]
    fn test_stack_cards_carry_transforms() {
        let mut model = Model::default();
        model.stack.push_and_activate(card("A"));
        model.stack.push_and_activate(card("B"));
        let vm = build(&model);
        assert_eq!(vm.card_count, 2);
        assert_eq!(vm.cards.len(), 2);
        let active = vm.cards.iter().find(|c| c.relative_offset == 0).unwrap();
        assert_eq!(active.card.id, "B");
        assert_eq!(active.transform.scale, 1.0);
        assert_eq!(active.card.temperature, "18°");
    }

    #[test]
    fn test_retry_hidden_without_action() {
        let mut model = Model::default();
        model.set_error(AppError::new(ErrorKind::Network, "offline"), None);
        let vm = build(&model);
        let error = vm.error.unwrap();
        assert!(!error.is_retryable);
        assert_eq!(error.error_code, "NETWORK_ERROR");
    }
}
