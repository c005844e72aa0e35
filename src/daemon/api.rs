//! HTTP API for the restart service

use crate::config::PortRange;
use crate::logging::LogLevelHandle;
use crate::restart::RestartOrchestrator;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Command value that triggers a restart
pub const RESTART_COMMAND: &str = "restart_pangolin";

/// Service name reported by the health endpoint
pub const SERVICE_NAME: &str = "pangolin-restart-service";

/// Shared state for the API handlers
#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<RestartOrchestrator>,
    /// Present when the global subscriber was installed by this process
    pub log_level: Option<LogLevelHandle>,
}

impl ApiState {
    pub fn new(orchestrator: Arc<RestartOrchestrator>, log_level: Option<LogLevelHandle>) -> Self {
        Self {
            orchestrator,
            log_level,
        }
    }
}

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub config: HealthConfig,
}

/// Configuration summary included in the health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthConfig {
    pub port_range: PortRange,
    pub pangolin_directory: PathBuf,
    pub listen_port: u16,
}

/// Form body for `/restart`
#[derive(Debug, Deserialize)]
struct CommandForm {
    #[serde(default)]
    command: String,
}

/// Build the API router
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/restart", post(restart))
        .route("/config", get(get_config).post(update_config))
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let config = state.orchestrator.config().current().await;
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        config: HealthConfig {
            port_range: config.port_range,
            pangolin_directory: config.pangolin.directory.clone(),
            listen_port: config.service.listen_port,
        },
    })
}

async fn restart(State(state): State<ApiState>, request: Request) -> Response {
    let command = match read_command(request).await {
        Ok(command) => command,
        Err(e) => {
            error!("Error handling restart request: {}", e);
            return status_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "error",
                format!("Internal server error: {}", e),
            );
        }
    };

    if command != RESTART_COMMAND {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": format!("Invalid command. Expected '{}'", RESTART_COMMAND)
            })),
        )
            .into_response();
    }

    info!("Received {} command", RESTART_COMMAND);
    let outcome = state.orchestrator.restart_current().await;

    if outcome.success {
        status_response(StatusCode::OK, "success", outcome.message)
    } else {
        status_response(StatusCode::INTERNAL_SERVER_ERROR, "error", outcome.message)
    }
}

/// Pull `command` out of a JSON or form body.
///
/// A body that is neither yields an empty command. Malformed JSON is an error.
async fn read_command(request: Request) -> Result<String, String> {
    let is_json = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    if is_json {
        let Json(body) = Json::<Value>::from_request(request, &())
            .await
            .map_err(|e| e.body_text())?;
        Ok(body
            .get("command")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    } else {
        Ok(Form::<CommandForm>::from_request(request, &())
            .await
            .map(|Form(form)| form.command)
            .unwrap_or_default())
    }
}

async fn get_config(State(state): State<ApiState>) -> Response {
    let config = state.orchestrator.config().current().await;
    Json(&*config).into_response()
}

async fn update_config(State(state): State<ApiState>, body: Bytes) -> Response {
    let patch = match serde_json::from_slice::<Value>(&body) {
        Ok(patch) if patch.as_object().is_some_and(|o| !o.is_empty()) => patch,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "No JSON data provided"})),
            )
                .into_response()
        }
    };
    let touches_service = patch.get("service").is_some();

    match state.orchestrator.config().apply_patch(patch).await {
        Ok(config) => {
            if touches_service {
                if let Some(handle) = &state.log_level {
                    if let Err(e) = handle.set_level(&config.service.log_level) {
                        warn!("Failed to apply new log level: {}", e);
                    }
                }
            }
            info!("Configuration updated");
            Json(json!({
                "status": "success",
                "message": "Configuration updated",
                "config": &*config,
            }))
            .into_response()
        }
        Err(e) => {
            error!("Error updating configuration: {}", e);
            status_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "error",
                format!("Failed to update configuration: {}", e),
            )
        }
    }
}

fn status_response(code: StatusCode, status: &str, message: String) -> Response {
    (code, Json(json!({"status": status, "message": message}))).into_response()
}
