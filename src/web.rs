//! Axum-based HTTP server with OpenAPI (utoipa) annotations.
//!
//! Endpoint paths are wire-stable for UI compatibility; in particular
//! `/phase_switcher/requested_phases_history` serves the phases×230×6 scaled
//! series under its historical name. Handlers never touch switcher state
//! directly: reads come from the published watch channels, mutations are
//! marshalled through the command channel.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tokio::sync::{mpsc, watch};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{OpenApi, ToSchema};

use crate::config::{Config, PhaseSwitcherConfig};
use crate::switcher::{HistoryView, StateSnapshot, SwitcherCommand};

#[derive(Clone)]
pub struct AppState {
    pub commands: mpsc::UnboundedSender<SwitcherCommand>,
    pub snapshot_rx: watch::Receiver<Arc<StateSnapshot>>,
    pub history_rx: watch::Receiver<Arc<HistoryView>>,
    pub config_rx: watch::Receiver<Arc<Config>>,
    /// False when the switcher could not be constructed (hardware or meter
    /// probe failed); state and history endpoints then answer 400.
    pub initialized: bool,
}

impl AppState {
    /// State for a boot where the switcher module is disabled. The watch
    /// channels hold placeholder values that no handler exposes.
    pub fn uninitialized(commands: mpsc::UnboundedSender<SwitcherCommand>, config: Config) -> Self {
        let (_snapshot_tx, snapshot_rx) = watch::channel(Arc::new(StateSnapshot::default()));
        let (_history_tx, history_rx) = watch::channel(Arc::new(HistoryView::default()));
        let (_config_tx, config_rx) = watch::channel(Arc::new(config));
        Self {
            commands,
            snapshot_rx,
            history_rx,
            config_rx,
            initialized: false,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct PowerBody {
    /// Available charging power in watts
    pub power: u16,
}

fn not_initialized() -> Response {
    (StatusCode::BAD_REQUEST, "not initialized").into_response()
}

#[utoipa::path(get, path = "/api/health", responses(
    (status = 200, description = "Service is healthy")
))]
async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[utoipa::path(get, path = "/phase_switcher/state", responses(
    (status = 200, description = "Current state snapshot", body = StateSnapshot),
    (status = 400, description = "Module not initialized")
))]
async fn get_state(State(state): State<AppState>) -> Response {
    if !state.initialized {
        return not_initialized();
    }
    let snapshot = state.snapshot_rx.borrow().as_ref().clone();
    Json(snapshot).into_response()
}

#[utoipa::path(post, path = "/phase_switcher/available_charging_power",
    request_body = PowerBody, responses((status = 200)))]
async fn post_available_charging_power(
    State(state): State<AppState>,
    Json(body): Json<PowerBody>,
) -> impl IntoResponse {
    let _ = state
        .commands
        .send(SwitcherCommand::SetAvailableChargingPower(body.power));
    (StatusCode::OK, Json(serde_json::json!({"ok": true})))
}

#[utoipa::path(post, path = "/phase_switcher/start_quick_charging", responses((status = 200)))]
async fn post_start_quick_charging(State(state): State<AppState>) -> impl IntoResponse {
    let _ = state.commands.send(SwitcherCommand::StartQuickCharging);
    (StatusCode::OK, Json(serde_json::json!({"ok": true})))
}

#[utoipa::path(get, path = "/phase_switcher/config", responses(
    (status = 200, description = "Live phase switcher configuration", body = PhaseSwitcherConfig)
))]
async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.config_rx.borrow().clone();
    Json(config.phase_switcher.clone())
}

#[utoipa::path(put, path = "/phase_switcher/config",
    request_body = PhaseSwitcherConfig, responses((status = 200)))]
async fn put_config(
    State(state): State<AppState>,
    Json(body): Json<PhaseSwitcherConfig>,
) -> impl IntoResponse {
    // Bounds are enforced here at the boundary; the core never re-validates
    let _ = state
        .commands
        .send(SwitcherCommand::UpdateConfig(body.clamped()));
    (StatusCode::OK, Json(serde_json::json!({"ok": true})))
}

#[utoipa::path(post, path = "/phase_switcher/config/reload", responses((status = 200)))]
async fn post_reload_config(State(state): State<AppState>) -> impl IntoResponse {
    let _ = state.commands.send(SwitcherCommand::ReloadConfig);
    (StatusCode::OK, Json(serde_json::json!({"ok": true})))
}

#[utoipa::path(get, path = "/phase_switcher/requested_power_history", responses(
    (status = 200, description = "Requested power ring, oldest first, null = pre-boot"),
    (status = 400, description = "Module not initialized")
))]
async fn get_requested_power_history(State(state): State<AppState>) -> Response {
    if !state.initialized {
        return not_initialized();
    }
    let history = state.history_rx.borrow().clone();
    Json(history.requested_power.clone()).into_response()
}

#[utoipa::path(get, path = "/phase_switcher/charging_power_history", responses(
    (status = 200, description = "Measured power ring, oldest first, null = unknown"),
    (status = 400, description = "Module not initialized")
))]
async fn get_charging_power_history(State(state): State<AppState>) -> Response {
    if !state.initialized {
        return not_initialized();
    }
    let history = state.history_rx.borrow().clone();
    Json(history.charging_power.clone()).into_response()
}

#[utoipa::path(get, path = "/phase_switcher/requested_phases_history", responses(
    (status = 200, description = "Committed phases scaled by 230 V x 6 A for plotting"),
    (status = 400, description = "Module not initialized")
))]
async fn get_requested_phases_history(State(state): State<AppState>) -> Response {
    if !state.initialized {
        return not_initialized();
    }
    let history = state.history_rx.borrow().clone();
    Json(history.requested_phases.clone()).into_response()
}

#[utoipa::path(get, path = "/phase_switcher/start_debug", responses((status = 200)))]
async fn get_start_debug(State(state): State<AppState>) -> impl IntoResponse {
    let _ = state.commands.send(SwitcherCommand::SetDebug(true));
    StatusCode::OK
}

#[utoipa::path(get, path = "/phase_switcher/stop_debug", responses((status = 200)))]
async fn get_stop_debug(State(state): State<AppState>) -> impl IntoResponse {
    let _ = state.commands.send(SwitcherCommand::SetDebug(false));
    StatusCode::OK
}

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        get_state,
        post_available_charging_power,
        post_start_quick_charging,
        get_config,
        put_config,
        post_reload_config,
        get_requested_power_history,
        get_charging_power_history,
        get_requested_phases_history,
        get_start_debug,
        get_stop_debug
    ),
    components(schemas(PowerBody, PhaseSwitcherConfig, StateSnapshot)),
    tags((name = "triphase", description = "Triphase phase switcher API"))
)]
pub struct ApiDoc;

/// Build the application router; split out so tests can drive it directly.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/phase_switcher/state", get(get_state))
        .route(
            "/phase_switcher/available_charging_power",
            post(post_available_charging_power),
        )
        .route(
            "/phase_switcher/start_quick_charging",
            post(post_start_quick_charging),
        )
        .route("/phase_switcher/config", get(get_config).put(put_config))
        .route("/phase_switcher/config/reload", post(post_reload_config))
        .route(
            "/phase_switcher/requested_power_history",
            get(get_requested_power_history),
        )
        .route(
            "/phase_switcher/charging_power_history",
            get(get_charging_power_history),
        )
        .route(
            "/phase_switcher/requested_phases_history",
            get(get_requested_phases_history),
        )
        .route("/phase_switcher/start_debug", get(get_start_debug))
        .route("/phase_switcher/stop_debug", get(get_stop_debug))
        .route("/openapi.json", get(openapi_json))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let router = router(state);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .unwrap_or_else(|_| ([127, 0, 0, 1], port).into());
    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;
    Ok(())
}
