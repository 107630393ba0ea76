//! Drawdeck Tool Server
//!
//! A small HTTP server exposing the scene engine's operations as tools.
//!
//! ## Protocol
//!
//! `POST /tools/{name}` with a JSON argument object; the response is the
//! operation's result payload, or `{"error": {"kind", "message"}}` with a
//! matching status code on failure.
//!
//! Configuration: `DRAWDECK_ADDR` (default `0.0.0.0:3030`) and
//! `DRAWDECK_EXPORT_DIR` (default current directory) for saved scenes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use drawdeck_core::{CoreError, FileSink, Workspace, ops};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::{
    net::SocketAddr,
    path::PathBuf,
    sync::{Arc, RwLock},
};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Shared application state.
///
/// Mutating tools take the write lock for their whole duration; read-only
/// tools share the read lock. `save_scene` reads under the shared lock and
/// performs the only file I/O in the system.
struct AppState {
    workspace: RwLock<Workspace>,
    sink: FileSink,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drawdeck_server=info,tower_http=info".into()),
        )
        .init();

    let export_dir = std::env::var("DRAWDECK_EXPORT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."));
    let sink = match FileSink::new(export_dir) {
        Ok(sink) => sink,
        Err(e) => {
            error!("failed to prepare export directory: {e}");
            std::process::exit(1);
        }
    };
    info!("Saving scenes to {}", sink.base_path().display());

    let state = Arc::new(AppState {
        workspace: RwLock::new(Workspace::new()),
        sink,
    });

    let app = Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/tools/{tool}", post(call_tool))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr: SocketAddr = std::env::var("DRAWDECK_ADDR")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3030)));
    info!("Drawdeck tool server listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        error!("server error: {e}");
        std::process::exit(1);
    }
}

/// Index page
async fn index() -> &'static str {
    "Drawdeck Tool Server - POST tool arguments to /tools/{name}"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// Dispatch one tool call.
async fn call_tool(
    State(state): State<Arc<AppState>>,
    Path(tool): Path<String>,
    Json(args): Json<Value>,
) -> Response {
    match dispatch(&state, &tool, args) {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(error) => {
            let (status, kind) = match &error {
                CoreError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
                CoreError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                CoreError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io"),
            };
            let body = json!({"error": {"kind": kind, "message": error.to_string()}});
            (status, Json(body)).into_response()
        }
    }
}

fn parse<T: DeserializeOwned>(args: Value) -> Result<T, CoreError> {
    serde_json::from_value(args).map_err(|e| CoreError::Validation(format!("invalid arguments: {e}")))
}

fn to_payload<T: serde::Serialize>(payload: T) -> Result<Value, CoreError> {
    serde_json::to_value(payload).map_err(|e| CoreError::Io(e.to_string()))
}

/// Route a tool name to the matching core operation.
fn dispatch(state: &AppState, tool: &str, args: Value) -> Result<Value, CoreError> {
    match tool {
        "create" => {
            let request = parse(args)?;
            let mut ws = write_lock(state)?;
            to_payload(ops::create(&mut ws, request)?)
        }
        "update" => {
            let request = parse(args)?;
            let mut ws = write_lock(state)?;
            to_payload(ops::update(&mut ws, request)?)
        }
        "delete" => {
            let request = parse(args)?;
            let mut ws = write_lock(state)?;
            to_payload(ops::delete(&mut ws, request)?)
        }
        "query" => {
            let request = parse(args)?;
            let ws = read_lock(state)?;
            to_payload(ops::query(&ws, request))
        }
        "get_resource" => {
            let request = parse(args)?;
            let ws = read_lock(state)?;
            ops::get_resource(&ws, request)
        }
        "group" => {
            let request = parse(args)?;
            let mut ws = write_lock(state)?;
            to_payload(ops::group(&mut ws, request)?)
        }
        "ungroup" => {
            let request = parse(args)?;
            let mut ws = write_lock(state)?;
            to_payload(ops::ungroup(&mut ws, request)?)
        }
        "align" => {
            let request = parse(args)?;
            let mut ws = write_lock(state)?;
            to_payload(ops::align(&mut ws, request)?)
        }
        "distribute" => {
            let request = parse(args)?;
            let mut ws = write_lock(state)?;
            to_payload(ops::distribute(&mut ws, request)?)
        }
        "lock" => {
            let request = parse(args)?;
            let mut ws = write_lock(state)?;
            to_payload(ops::lock(&mut ws, request)?)
        }
        "unlock" => {
            let request = parse(args)?;
            let mut ws = write_lock(state)?;
            to_payload(ops::unlock(&mut ws, request)?)
        }
        "save_scene" => {
            let request = parse(args)?;
            let ws = read_lock(state)?;
            let message = ops::save_scene(&ws, &state.sink, request)?;
            Ok(Value::String(message))
        }
        _ => Err(CoreError::NotFound(format!("unknown tool: {tool}"))),
    }
}

fn write_lock(state: &AppState) -> Result<std::sync::RwLockWriteGuard<'_, Workspace>, CoreError> {
    state
        .workspace
        .write()
        .map_err(|e| CoreError::Io(format!("workspace lock poisoned: {e}")))
}

fn read_lock(state: &AppState) -> Result<std::sync::RwLockReadGuard<'_, Workspace>, CoreError> {
    state
        .workspace
        .read()
        .map_err(|e| CoreError::Io(format!("workspace lock poisoned: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use drawdeck_core::SequentialIdentity;
    use tempfile::tempdir;

    fn test_state(dir: &std::path::Path) -> AppState {
        AppState {
            workspace: RwLock::new(Workspace::with_identity(Box::new(
                SequentialIdentity::new(),
            ))),
            sink: FileSink::new(dir.to_path_buf()).unwrap(),
        }
    }

    #[test]
    fn test_dispatch_create_query_save() {
        let dir = tempdir().unwrap();
        let state = test_state(dir.path());

        let created = dispatch(
            &state,
            "create",
            json!({"type": "rectangle", "x": 1.0, "y": 2.0}),
        )
        .unwrap();
        assert_eq!(created["created"], true);

        let listed = dispatch(&state, "query", json!({})).unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let message = dispatch(&state, "save_scene", json!({})).unwrap();
        assert!(message.as_str().unwrap().contains("scene.excalidraw"));
        assert!(dir.path().join("scene.excalidraw").exists());
    }

    #[test]
    fn test_dispatch_unknown_tool() {
        let dir = tempdir().unwrap();
        let state = test_state(dir.path());
        let err = dispatch(&state, "teleport", json!({})).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn test_dispatch_invalid_arguments() {
        let dir = tempdir().unwrap();
        let state = test_state(dir.path());
        // Missing required x/y.
        let err = dispatch(&state, "create", json!({"type": "rectangle"})).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_dispatch_not_found_surfaces() {
        let dir = tempdir().unwrap();
        let state = test_state(dir.path());
        let err = dispatch(&state, "delete", json!({"id": "missing"})).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}
