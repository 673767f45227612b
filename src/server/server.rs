use anyhow::{Context, Result};
use std::{path::PathBuf, time::Duration};

use tracing::{debug, error, info, warn};

use crate::collection::catalog::{asset_manifest, default_image_path, PLACEHOLDER_IMAGE_PATH};
use crate::collection::photo::decode_data_uri;
use crate::collection::{CollectionError, Dispatcher, ImageRef, Intent, ItemId, Outcome};
use tower_http::services::ServeDir;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;

use super::{log_requests, state::*, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

fn error_response(err: CollectionError) -> Response {
    let status = match &err {
        CollectionError::UnknownItem(_) => StatusCode::NOT_FOUND,
        CollectionError::PhotoNotAllowed(_) => StatusCode::CONFLICT,
        CollectionError::InvalidSnapshot(_) => StatusCode::BAD_REQUEST,
        CollectionError::Storage(_) => {
            error!("{}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string()).into_response()
}

fn dispatch(dispatcher: &GuardedDispatcher, intent: Intent) -> Response {
    match dispatcher.lock().unwrap().dispatch(intent) {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err) => error_response(err),
    }
}

fn image_response(bytes: Vec<u8>, mime_type: Option<&str>) -> Response {
    let mime_type = mime_type
        .map(str::to_string)
        .or_else(|| infer::get(&bytes).map(|kind| kind.mime_type().to_string()))
        .unwrap_or_else(|| "image/jpeg".to_string());
    ([(header::CONTENT_TYPE, mime_type)], bytes).into_response()
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    Json(stats)
}

async fn get_view(State(dispatcher): State<GuardedDispatcher>) -> Response {
    let projection = dispatcher.lock().unwrap().redraw();
    Json(projection).into_response()
}

async fn post_intent(
    State(dispatcher): State<GuardedDispatcher>,
    Json(intent): Json<Intent>,
) -> Response {
    dispatch(&dispatcher, intent)
}

async fn get_export(State(dispatcher): State<GuardedDispatcher>) -> Response {
    let outcome = dispatcher.lock().unwrap().dispatch(Intent::Export);
    match outcome {
        Ok(Outcome::Download {
            file_name,
            contents,
            ..
        }) => (
            [
                (header::CONTENT_TYPE, "application/json".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file_name),
                ),
            ],
            contents,
        )
            .into_response(),
        Ok(other) => {
            error!("Export produced {:?}", other);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn post_import(State(dispatcher): State<GuardedDispatcher>, contents: String) -> Response {
    dispatch(&dispatcher, Intent::Import { contents })
}

/// Continuation of an image activation: the body is fully read before the
/// dispatcher is locked, and the gate is checked again under the lock.
async fn put_photo(
    State(dispatcher): State<GuardedDispatcher>,
    Path(id): Path<ItemId>,
    body: Bytes,
) -> Response {
    if body.is_empty() {
        return (StatusCode::BAD_REQUEST, "Empty photo").into_response();
    }
    let result = dispatcher.lock().unwrap().attach_photo(id, &body);
    match result {
        Ok(projection) => Json(projection).into_response(),
        Err(err) => error_response(err),
    }
}

async fn get_image(State(state): State<ServerState>, Path(id): Path<ItemId>) -> Response {
    let image = match state.dispatcher.lock().unwrap().store().resolve_image(id) {
        Ok(image) => image,
        Err(err) => return error_response(err),
    };
    if let ImageRef::Custom(uri) = &image {
        match decode_data_uri(uri) {
            Some(decoded) => return image_response(decoded.bytes, Some(decoded.mime_type.as_str())),
            None => warn!("Custom image of item {} is not a valid data URI", id),
        }
    }
    let frontend_dir = match &state.config.frontend_dir_path {
        Some(path) => PathBuf::from(path),
        None => return StatusCode::NOT_FOUND.into_response(),
    };

    match image {
        ImageRef::Default(id) => {
            match tokio::fs::read(frontend_dir.join(default_image_path(id))).await {
                Ok(bytes) => return image_response(bytes, None),
                Err(err) => {
                    debug!("Default image of item {} failed to load: {}", id, err);
                    let marked = state
                        .dispatcher
                        .lock()
                        .unwrap()
                        .dispatch(Intent::ImageLoadFailed { id });
                    if let Err(err) = marked {
                        return error_response(err);
                    }
                }
            }
        }
        ImageRef::Custom(_) | ImageRef::Placeholder => {}
    }

    match tokio::fs::read(frontend_dir.join(PLACEHOLDER_IMAGE_PATH)).await {
        Ok(bytes) => image_response(bytes, None),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn get_assets() -> impl IntoResponse {
    Json(asset_manifest())
}

pub fn make_app(config: ServerConfig, dispatcher: Dispatcher) -> Result<Router> {
    let state = ServerState::new(config.clone(), dispatcher);

    let album_routes: Router = Router::new()
        .route("/view", get(get_view))
        .route("/intent", post(post_intent))
        .route("/export", get(get_export))
        .route("/import", post(post_import))
        .route("/item/{id}/photo", put(put_photo))
        .route("/image/{id}", get(get_image))
        .route("/assets", get(get_assets))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let app: Router = home_router
        .nest("/v1/album", album_routes)
        .layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

pub async fn run_server(config: ServerConfig, dispatcher: Dispatcher) -> Result<()> {
    let port = config.port;
    let app = make_app(config, dispatcher)?;

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on port {}", port);

    Ok(axum::serve(listener, app).await?)
}
