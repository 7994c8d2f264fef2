use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use city_server::config::{Cli, ServerConfig};
use city_server::layout::Layout;
use city_server::session::{
    parse_move_body, status_for, ErrorResponse, JoinResponse, MoveResponse,
};
use city_server::telemetry::init_tracing;
use city_server::types::PlayerId;
use city_server::{Level, LevelError};
use clap::Parser;
use serde_json::json;
use tracing::{error, info};

type SharedLevel = Arc<Level>;

#[tokio::main]
async fn main() -> ExitCode {
    let config = ServerConfig::from_env(Cli::parse());
    init_tracing(&config.log_level, config.json_logs);

    let level = match Layout::load(&config.level_path)
        .and_then(|layout| Level::from_layout(&layout, config.level.clone()))
    {
        Ok(level) => Arc::new(level),
        Err(err) => {
            error!(%err, "cannot start without a level");
            return ExitCode::FAILURE;
        }
    };
    start_sweep_loop(level.clone(), config.sweep_interval, config.player_timeout);

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/join", post(join_handler))
        .route("/players/{id}/move", post(move_handler))
        .route("/players/{id}/heartbeat", post(heartbeat_handler))
        .route("/state", get(state_handler))
        .route("/state.json", get(state_json_handler))
        .with_state(level);

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(%err, addr = %bind_addr, "failed to bind server socket");
            return ExitCode::FAILURE;
        }
    };

    info!(
        port = config.port,
        level = %config.level_path.display(),
        player_timeout_secs = config.player_timeout.as_secs(),
        "listening"
    );
    if let Err(err) = axum::serve(listener, app).await {
        error!(%err, "server runtime failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn start_sweep_loop(level: SharedLevel, every: Duration, player_timeout: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            level.sweep_idle(player_timeout);
        }
    });
}

fn level_error(err: LevelError) -> Response {
    let status = StatusCode::from_u16(status_for(&err)).unwrap_or(StatusCode::BAD_REQUEST);
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn join_handler(State(level): State<SharedLevel>) -> Response {
    match level.join() {
        Ok(id) => Json(JoinResponse { id }).into_response(),
        Err(err) => level_error(err),
    }
}

async fn move_handler(
    State(level): State<SharedLevel>,
    Path(id): Path<PlayerId>,
    body: String,
) -> Response {
    let Some(dir) = parse_move_body(&body) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "expected a direction: up, right, down or left".to_string(),
            }),
        )
            .into_response();
    };
    match level.move_player(id, dir) {
        Ok(outcome) => Json(MoveResponse {
            moved: outcome.moved(),
        })
        .into_response(),
        Err(err) => level_error(err),
    }
}

async fn heartbeat_handler(State(level): State<SharedLevel>, Path(id): Path<PlayerId>) -> Response {
    match level.heartbeat(id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => level_error(err),
    }
}

async fn state_handler(State(level): State<SharedLevel>) -> String {
    level.snapshot()
}

async fn state_json_handler(State(level): State<SharedLevel>) -> impl IntoResponse {
    Json(level.snapshot_view())
}
