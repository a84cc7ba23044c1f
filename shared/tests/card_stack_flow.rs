use crux_core::testing::AppTester;
use skydeck::model::{
    Card, CardId, CardOrigin, CurrentConditions, ImageAsset, Location, WeatherCondition,
    WeatherSnapshot,
};
use skydeck::view::ModeView;
use skydeck::view_mode::{ExitAnimation, ViewMode};
use skydeck::{App, CruxApp, Effect, Event, Model};

fn card(name: &str) -> Card {
    Card {
        id: CardId::new(name),
        weather: WeatherSnapshot {
            location: Location {
                name: name.to_string(),
                country: Some("Norway".to_string()),
                admin_area: None,
                latitude: 59.91,
                longitude: 10.75,
                timezone: None,
            },
            current: CurrentConditions {
                temperature_c: 7.0,
                apparent_temperature_c: 5.0,
                humidity_pct: 70,
                wind_speed_kmh: 9.0,
                wind_direction_deg: 180,
                condition: WeatherCondition::Overcast,
                is_day: true,
            },
            hourly: Vec::new(),
            daily: Vec::new(),
            observed_at_ms: 1_700_000_000_000,
        },
        image: ImageAsset::new(format!("https://img.example.com/{name}.png"), 1_700_000_000_000),
        origin: CardOrigin::RealWeather,
        created_at_ms: 1_700_000_000_000,
    }
}

/// A stack of cards with the first one active.
fn model_with(names: &[&str]) -> Model {
    let mut model = Model::default();
    for name in names {
        model.stack.push_and_activate(card(name));
    }
    let len = i64::try_from(names.len()).unwrap();
    if len > 0 {
        // push_and_activate leaves the newest card in front; wrap back to the first
        model.stack.navigate(1).unwrap();
        assert_eq!(model.stack.cursor(), len);
    }
    model
}

fn active(model: &Model) -> &str {
    model.stack.active_card().map_or("", |c| c.id.as_str())
}

fn swipe(app: &AppTester<App, Effect>, model: &mut Model, dx: f64) {
    app.update(Event::PointerDown { x: 200.0 }, model);
    app.update(Event::PointerMove { x: 200.0 + dx / 2.0 }, model);
    app.update(Event::PointerMove { x: 200.0 + dx }, model);
    app.update(Event::PointerUp, model);
}

fn has_render(effects: &[Effect]) -> bool {
    effects.iter().any(|e| matches!(e, Effect::Render(_)))
}

#[test]
fn test_swipe_left_cycles_through_cards() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&["A", "B", "C"]);
    assert_eq!(active(&model), "A");

    swipe(&app, &mut model, -150.0);
    assert_eq!(active(&model), "B");
    swipe(&app, &mut model, -150.0);
    assert_eq!(active(&model), "C");
    swipe(&app, &mut model, -150.0);
    assert_eq!(active(&model), "A");

    swipe(&app, &mut model, 150.0);
    assert_eq!(active(&model), "C");
}

#[test]
fn test_short_drag_snaps_back() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&["A", "B"]);

    swipe(&app, &mut model, -60.0);
    assert_eq!(active(&model), "A");
    assert!(!model.stack.is_dragging());
}

#[test]
fn test_drag_renders_transforms_for_window() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&["A", "B", "C", "D"]);

    app.update(Event::PointerDown { x: 200.0 }, &mut model);
    let update = app.update(Event::PointerMove { x: 150.0 }, &mut model);
    assert!(has_render(&update.effects));

    let view = App.view(&model);
    assert!(view.is_dragging);
    let offsets: Vec<i32> = view.cards.iter().map(|c| c.relative_offset).collect();
    assert_eq!(offsets, vec![-1, 0, 1, 2]);
    let front = view.cards.iter().find(|c| c.relative_offset == 0).unwrap();
    assert!(front.transform.translate_x < 0.0);
    assert!(!front.transform.animated);
}

#[test]
fn test_click_after_drag_does_not_expand() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&["A", "B"]);

    swipe(&app, &mut model, -40.0);
    app.update(Event::CardClicked { relative_offset: 0 }, &mut model);
    assert!(model.view_mode.is_stack());

    app.update(Event::PointerDown { x: 200.0 }, &mut model);
    app.update(Event::PointerUp, &mut model);
    app.update(Event::CardClicked { relative_offset: 0 }, &mut model);
    assert_eq!(
        model.view_mode.expanded_card_id(),
        Some(&CardId::new("A"))
    );
}

#[test]
fn test_clicking_back_card_brings_it_forward() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&["A", "B", "C", "D"]);

    app.update(Event::CardClicked { relative_offset: 2 }, &mut model);
    assert_eq!(active(&model), "C");
    assert!(model.view_mode.is_stack());

    // not in the visible window of four cards
    app.update(Event::CardClicked { relative_offset: -2 }, &mut model);
    assert_eq!(active(&model), "C");
}

#[test]
fn test_navigate_by_matches_swipes() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&["A", "B", "C"]);

    app.update(Event::NavigateBy { delta: 1 }, &mut model);
    assert_eq!(active(&model), "B");
    app.update(Event::NavigateBy { delta: -2 }, &mut model);
    assert_eq!(active(&model), "C");
    app.update(Event::NavigateBy { delta: 7 }, &mut model);
    assert_eq!(active(&model), "A");
}

#[test]
fn test_empty_stack_ignores_all_input() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    swipe(&app, &mut model, -150.0);
    app.update(Event::CardClicked { relative_offset: 0 }, &mut model);
    app.update(Event::NavigateBy { delta: 3 }, &mut model);

    assert!(model.stack.is_empty());
    assert_eq!(model.stack.cursor(), 0);
    assert!(model.view_mode.is_stack());
    assert!(model.active_error.is_none());
    let view = App.view(&model);
    assert!(view.cards.is_empty());
    assert!(!view.gestures_enabled);
}

#[test]
fn test_removing_last_card_returns_to_idle() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&["A"]);

    app.update(Event::CardClicked { relative_offset: 0 }, &mut model);
    assert!(matches!(model.view_mode.mode(), ViewMode::Expanded { .. }));

    let update = app.update(
        Event::RemoveCard {
            card_id: CardId::new("A"),
        },
        &mut model,
    );
    assert!(has_render(&update.effects));
    assert!(model.stack.is_empty());
    assert_eq!(model.stack.cursor(), 0);
    assert!(model.view_mode.is_stack());
    assert!(!model.gestures_enabled());
    assert!(model.active_toast.is_some());
}

#[test]
fn test_removing_unknown_card_reports_error() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&["A", "B"]);

    app.update(
        Event::RemoveCard {
            card_id: CardId::new("Z"),
        },
        &mut model,
    );
    assert_eq!(model.stack.len(), 2);
    assert_eq!(
        model.active_error.as_ref().map(skydeck::AppError::code),
        Some("NOT_FOUND")
    );
}

#[test]
fn test_expanded_mode_blocks_stack_gestures() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&["A", "B", "C"]);

    app.update(Event::PointerDown { x: 10.0 }, &mut model);
    app.update(Event::PointerUp, &mut model);
    app.update(Event::CardClicked { relative_offset: 0 }, &mut model);
    assert!(!model.gestures_enabled());

    swipe(&app, &mut model, -200.0);
    app.update(Event::NavigateBy { delta: 1 }, &mut model);
    assert_eq!(active(&model), "A");

    let view = App.view(&model);
    assert!(matches!(view.mode, ModeView::Expanded { ref card, .. } if card.id == "A"));
}

#[test]
fn test_expanded_close_and_drag_dismiss() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&["A", "B"]);
    app.update(
        Event::ViewportResized {
            width: 400.0,
            height: 800.0,
            card_width: 320.0,
        },
        &mut model,
    );

    app.update(Event::CardClicked { relative_offset: 0 }, &mut model);
    assert!(model.view_mode.is_entering());
    app.update(Event::ViewTransitionEnded, &mut model);
    assert!(!model.view_mode.is_entering());

    app.update(Event::CloseRequested, &mut model);
    assert!(model.view_mode.is_stack());
    assert_eq!(model.view_mode.exit_animation(), Some(ExitAnimation::Collapse));
    assert!(model.gestures_enabled());
    app.update(Event::ViewTransitionEnded, &mut model);
    assert_eq!(model.view_mode.exit_animation(), None);

    // scrolled content must be back at the top before the dismiss drag arms
    app.update(Event::CardClicked { relative_offset: 0 }, &mut model);
    app.update(Event::ExpandedScrolled { offset: 120.0 }, &mut model);
    app.update(Event::DismissDragStarted { y: 100.0 }, &mut model);
    app.update(Event::DismissDragMoved { y: 400.0 }, &mut model);
    app.update(Event::DismissDragEnded, &mut model);
    assert!(!model.view_mode.is_stack());

    app.update(Event::ExpandedScrolled { offset: 0.0 }, &mut model);
    app.update(Event::DismissDragStarted { y: 100.0 }, &mut model);
    app.update(Event::DismissDragMoved { y: 400.0 }, &mut model);
    app.update(Event::DismissDragEnded, &mut model);
    assert!(model.view_mode.is_stack());
    assert_eq!(
        model.view_mode.exit_animation(),
        Some(ExitAnimation::SlideDown { distance: 800.0 })
    );
}

#[test]
fn test_cancelled_dismiss_drag_resets_overlay() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&["A", "B"]);
    app.update(Event::CardClicked { relative_offset: 0 }, &mut model);

    app.update(Event::DismissDragStarted { y: 100.0 }, &mut model);
    app.update(Event::DismissDragMoved { y: 260.0 }, &mut model);
    assert_eq!(App.view(&model).transition.dismiss_offset, 160.0);

    let update = app.update(Event::DismissDragCancelled, &mut model);
    assert!(has_render(&update.effects));
    assert_eq!(App.view(&model).transition.dismiss_offset, 0.0);
    assert!(!model.view_mode.is_stack());

    // ending after a cancel does not dismiss
    app.update(Event::DismissDragEnded, &mut model);
    assert!(!model.view_mode.is_stack());

    app.update(Event::DismissDragStarted { y: 100.0 }, &mut model);
    app.update(Event::DismissDragMoved { y: 300.0 }, &mut model);
    app.update(Event::PointerCancel, &mut model);
    assert_eq!(App.view(&model).transition.dismiss_offset, 0.0);
    assert!(!model.view_mode.is_stack());
}

#[test]
fn test_invalid_configuration_keeps_previous() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&["A"]);
    let before = model.config;

    let mut config = before;
    config.swipe_threshold_px = 1.0;
    app.update(Event::Configure(config), &mut model);
    assert_eq!(model.config, before);

    let mut config = before;
    config.swipe_threshold_px = 50.0;
    app.update(Event::Configure(config), &mut model);
    assert_eq!(model.config.swipe_threshold_px, 50.0);
}
