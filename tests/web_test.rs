//! Router tests: wire-name endpoints, command marshalling and the
//! not-initialized gate.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::{fast_config, Rig};
use http_body_util::BodyExt;
use tokio::sync::mpsc;
use tower::ServiceExt;
use triphase::config::Config;
use triphase::selector::OperatingMode;
use triphase::switcher::SwitcherCommand;
use triphase::web::{AppState, router};

fn app_state_for(rig: &Rig) -> (AppState, mpsc::UnboundedReceiver<SwitcherCommand>) {
    let (commands, commands_rx) = mpsc::unbounded_channel();
    (
        AppState {
            commands,
            snapshot_rx: rig.switcher.snapshot_rx(),
            history_rx: rig.switcher.history_rx(),
            config_rx: rig.switcher.config_rx(),
            initialized: true,
        },
        commands_rx,
    )
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_answers_ok() {
    let rig = Rig::new(fast_config(OperatingMode::OneTwoThreePhasesDynamic, true));
    let (state, _rx) = app_state_for(&rig);

    let response = router(state)
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn state_endpoint_serves_the_published_snapshot() {
    let mut rig = Rig::new(fast_config(OperatingMode::OneTwoThreePhasesDynamic, true));
    rig.connect_vehicle();
    rig.tick();
    rig.switcher.publish_state(rig.now);

    let (state, _rx) = app_state_for(&rig);
    let response = router(state)
        .oneshot(
            Request::get("/phase_switcher/state")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["sequencer_state"], serde_json::json!(1)); // standby
    assert_eq!(json["requested_phases"], serde_json::json!(0));
    assert_eq!(json["contactor_state"], serde_json::json!(false));
}

#[tokio::test]
async fn history_endpoints_serve_full_rings() {
    let rig = Rig::new(fast_config(OperatingMode::OneTwoThreePhasesDynamic, true));
    let (state, _rx) = app_state_for(&rig);
    let app = router(state);

    for path in [
        "/phase_switcher/requested_power_history",
        "/phase_switcher/charging_power_history",
        "/phase_switcher/requested_phases_history",
    ] {
        let response = app
            .clone()
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let arr = json.as_array().expect("json array");
        assert_eq!(arr.len(), 721);
        assert!(arr.iter().all(|v| v.is_null()));
    }
}

#[tokio::test]
async fn power_command_is_marshalled_not_applied_inline() {
    let rig = Rig::new(fast_config(OperatingMode::OneTwoThreePhasesDynamic, true));
    let (state, mut rx) = app_state_for(&rig);

    let response = router(state)
        .oneshot(
            Request::post("/phase_switcher/available_charging_power")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"power": 4200}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        rx.try_recv().unwrap(),
        SwitcherCommand::SetAvailableChargingPower(4200)
    );
    // Core state untouched until the switcher task drains the channel
    assert_eq!(rig.switcher.available_charging_power(), 0);
}

#[tokio::test]
async fn put_config_clamps_at_the_boundary() {
    let rig = Rig::new(fast_config(OperatingMode::OneTwoThreePhasesDynamic, true));
    let (state, mut rx) = app_state_for(&rig);

    let body = serde_json::json!({
        "enabled": true,
        "operating_mode": "one_phase_static",
        "delay_time_more_phases": 5,
        "delay_time_less_phases": 60,
        "minimum_duration": 900,
        "pause_time": 100000
    });
    let response = router(state)
        .oneshot(
            Request::put("/phase_switcher/config")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    match rx.try_recv().unwrap() {
        SwitcherCommand::UpdateConfig(section) => {
            assert_eq!(section.delay_time_more_phases, 10);
            assert_eq!(section.pause_time, 3600);
            assert_eq!(section.operating_mode, OperatingMode::OnePhaseStatic);
        }
        other => panic!("unexpected command: {:?}", other),
    }
}

#[tokio::test]
async fn debug_toggles_are_get_endpoints() {
    let rig = Rig::new(fast_config(OperatingMode::OneTwoThreePhasesDynamic, true));
    let (state, mut rx) = app_state_for(&rig);
    let app = router(state);

    let response = app
        .clone()
        .oneshot(
            Request::get("/phase_switcher/start_debug")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(rx.try_recv().unwrap(), SwitcherCommand::SetDebug(true));

    let response = app
        .oneshot(
            Request::get("/phase_switcher/stop_debug")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(rx.try_recv().unwrap(), SwitcherCommand::SetDebug(false));
}

#[tokio::test]
async fn uninitialized_module_answers_400() {
    let (commands, _rx) = mpsc::unbounded_channel();
    let state = AppState::uninitialized(commands, Config::default());
    let app = router(state);

    for path in [
        "/phase_switcher/state",
        "/phase_switcher/requested_power_history",
        "/phase_switcher/charging_power_history",
        "/phase_switcher/requested_phases_history",
    ] {
        let response = app
            .clone()
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    // Health and config remain reachable
    let response = app
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
