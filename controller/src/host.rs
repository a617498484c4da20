use std::{collections::HashMap, net::SocketAddr, path::Path, time::Duration};

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::watch};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use thermostat_common::{
    ControllerStatus, FanMode, PersistedSettings, RuntimeConfig, StateUpdate, SystemMode,
    Temperature, ThermostatEngine, ThermostatError,
};

use crate::{
    gateway::Gateway, poll, relay::RelayBoard, remote_sensor::RemoteSensor, store::SettingsStore,
};

#[derive(Clone)]
struct AppState {
    gateway: Gateway,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Body of `POST /api`. Unknown fields, `current` included, are ignored. After a
/// sensor failure `GET /api` reports `current` as 0 until a fresh reading arrives.
#[derive(Debug, Default, Deserialize)]
struct StateUpdateRequest {
    desired: Option<Temperature>,
    sysmode: Option<String>,
    fanmode: Option<String>,
}

impl StateUpdateRequest {
    fn parse(self) -> Result<StateUpdate, ThermostatError> {
        Ok(StateUpdate {
            desired: self.desired,
            sysmode: self.sysmode.as_deref().map(str::parse::<SystemMode>).transpose()?,
            fanmode: self.fanmode.as_deref().map(str::parse::<FanMode>).transpose()?,
        })
    }
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = RuntimeConfig::from_env();
    let store = SettingsStore::new(config.settings_path());
    let settings = store.load().await.unwrap_or_else(|err| {
        warn!(
            "failed to load settings from {}: {err}, using defaults",
            store.path().display()
        );
        PersistedSettings::default()
    });
    info!(
        "starting with desired={}F sysmode={} fanmode={}",
        settings.desired, settings.sysmode, settings.fanmode
    );

    let relays = RelayBoard::open(config.relays.clone()).context("failed to open relay board")?;
    let gateway = Gateway::new(
        ThermostatEngine::new(settings).unwrap_or_default(),
        Box::new(relays),
    );
    gateway.apply_current().await;

    let sensor = RemoteSensor::connect(
        &config.network,
        Duration::from_millis(config.thermostat.sensor_stale_timeout_ms),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poll_task = tokio::spawn(poll::run(
        gateway.clone(),
        sensor,
        Duration::from_millis(config.thermostat.poll_interval_ms),
        shutdown_rx.clone(),
    ));
    tokio::spawn(forward_shutdown_signal(shutdown_tx.clone()));

    let served = serve_api(&config, gateway.clone(), shutdown_rx).await;
    if let Err(err) = &served {
        warn!("api server stopped: {err:#}");
    }

    // Runs on every exit path, including a bind failure or a signal mid-poll.
    shutdown_tx.send_replace(true);
    if let Err(err) = poll_task.await {
        warn!("poll task ended abnormally: {err}");
    }
    gateway.shutdown().await;
    if let Err(err) = store.save(&gateway.settings().await).await {
        warn!(
            "failed to save settings to {}: {err}",
            store.path().display()
        );
    }
    info!("controller stopped");

    served
}

async fn serve_api(
    config: &RuntimeConfig,
    gateway: Gateway,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let app = router(AppState { gateway }, &config.ui_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.network.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind controller server at {addr}"))?;

    info!("controller listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { poll::stopped(&mut shutdown).await })
        .await
        .context("controller server failed")
}

fn router(state: AppState, ui_dir: &Path) -> Router {
    Router::new()
        .route("/api", get(handle_get_state).post(handle_post_state))
        .route("/api/status", get(handle_get_status))
        .route("/api/desired", post(handle_set_desired))
        .route("/api/sysmode", post(handle_set_sysmode))
        .route("/api/fanmode", post(handle_set_fanmode))
        .fallback_service(ServeDir::new(ui_dir))
        .with_state(state)
}

async fn forward_shutdown_signal(shutdown: watch::Sender<bool>) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown requested");
    shutdown.send_replace(true);
}

async fn handle_get_state(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.gateway.snapshot().await)
}

async fn handle_post_state(
    State(state): State<AppState>,
    payload: Result<Json<StateUpdateRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("invalid request body: {}", rejection.body_text()),
            )
        }
    };
    let update = match request.parse() {
        Ok(update) => update,
        Err(err) => return rejected(err),
    };

    match state.gateway.apply_update(update).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(err) => rejected(err),
    }
}

async fn handle_get_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(ControllerStatus::from(state.gateway.snapshot().await))
}

async fn handle_set_desired(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let Some(value) = params.get("value") else {
        return error_response(StatusCode::BAD_REQUEST, "Missing 'value' parameter");
    };
    let Ok(desired) = value.trim().parse::<Temperature>() else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid temperature value");
    };

    match state.gateway.set_desired(desired).await {
        Ok(snapshot) => Json(ControllerStatus::from(snapshot)).into_response(),
        Err(err) => rejected(err),
    }
}

async fn handle_set_sysmode(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let Some(value) = params.get("value") else {
        return error_response(StatusCode::BAD_REQUEST, "Missing 'value' parameter");
    };

    match state.gateway.set_system_mode(value).await {
        Ok(snapshot) => Json(ControllerStatus::from(snapshot)).into_response(),
        Err(err) => rejected(err),
    }
}

async fn handle_set_fanmode(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let Some(value) = params.get("value") else {
        return error_response(StatusCode::BAD_REQUEST, "Missing 'value' parameter");
    };

    match state.gateway.set_fan_mode(value).await {
        Ok(snapshot) => Json(ControllerStatus::from(snapshot)).into_response(),
        Err(err) => rejected(err),
    }
}

fn rejected(err: ThermostatError) -> axum::response::Response {
    warn!("rejected update: {err}");
    error_response(StatusCode::BAD_REQUEST, &err.to_string())
}

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}
