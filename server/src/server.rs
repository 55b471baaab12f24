use crate::AppState;
use crate::generation::{ByteStream, GenerationError};
use crate::prompts::build_messages;
use crate::store::{StoreError, StyleMap};
use crate::style::validate::{StyleValue, validate_style};
use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures::{Stream, StreamExt, future};
use pagesmith_proto::writer::EVENT_STREAM_CONTENT_TYPE;
use pagesmith_proto::{ErrorBody, GenerateRequest, GenerationEvent, UpstreamDecoder, decode_stream, encode_event};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/api/generate", post(handle_generate))
        .route("/api/models", get(handle_models))
        .route(
            "/api/projects/{project_id}/styles",
            get(handle_get_styles).put(handle_put_styles),
        )
        .route(
            "/api/projects/{project_id}/versions",
            get(handle_list_versions).post(handle_save_version),
        )
        .route(
            "/api/projects/{project_id}/versions/{version_id}",
            get(handle_get_version),
        )
        .layer(CorsLayer::permissive()) // Allow CORS for all origins during development
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorBody::new(message))).into_response()
}

fn store_error_response(e: StoreError) -> Response {
    match e {
        StoreError::InvalidId(id) => {
            error_response(StatusCode::BAD_REQUEST, format!("Invalid identifier: {}", id))
        }
        other => {
            error!("Storage failure: {}", other);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Storage failure")
        }
    }
}

/// Re-encode the provider's event stream as normalized frames.
///
/// `done` produces no frame; clients see the body end instead. A failure
/// becomes one `{"error":..}` frame, after which the body ends.
pub fn normalize_stream(source: ByteStream) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
    decode_stream(UpstreamDecoder::upstream(), source).filter_map(|event| {
        match &event {
            GenerationEvent::Error { message } => warn!("Generation stream failed: {}", message),
            GenerationEvent::Done => debug!("Generation stream complete"),
            _ => {}
        }
        future::ready(match encode_event(&event) {
            Ok(Some(frame)) => Some(Ok(Bytes::from(frame))),
            Ok(None) => None,
            Err(e) => {
                warn!("Dropping unencodable event: {}", e);
                None
            }
        })
    })
}

async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Response {
    info!(
        "📡 Received POST /api/generate (follow-up: {}, {} prompt chars)",
        request.is_follow_up,
        request.prompt.chars().count()
    );

    if request.prompt.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Prompt is required");
    }
    if request.is_follow_up && request.current_html.is_none() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Follow-up requests must include currentHtml",
        );
    }

    let Some(upstream) = state.upstream.as_ref() else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "No API key configured for the generation provider",
        );
    };

    let model = state.models.resolve(request.model.as_deref());
    let messages = build_messages(&request);

    let source = match upstream.stream_chat(model, &messages).await {
        Ok(source) => source,
        Err(GenerationError::Status { status, message }) => {
            let status = StatusCode::from_u16(status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY);
            return error_response(status, message);
        }
        Err(e) => {
            error!("Generation request failed: {}", e);
            return error_response(StatusCode::BAD_GATEWAY, e.to_string());
        }
    };

    info!("Streaming generation from {}", model);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, EVENT_STREAM_CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(normalize_stream(source)))
        .unwrap_or_else(|e| {
            error!("Failed to build stream response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}

async fn handle_models(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.models.clone())
}

async fn handle_get_styles(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Response {
    match state.store.load_styles(&project_id).await {
        Ok(styles) => Json(styles.unwrap_or_default()).into_response(),
        Err(e) => store_error_response(e),
    }
}

/// Every value is validated and stored in sanitized form. Any invalid
/// value rejects the whole map.
async fn handle_put_styles(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(styles): Json<StyleMap>,
) -> Response {
    let mut sanitized = StyleMap::new();
    let mut errors = Vec::new();

    for (selector, properties) in styles {
        for (property, value) in properties {
            let result = validate_style(&property, &StyleValue::Text(value));
            if let Some(warning) = &result.warning {
                debug!("{} {}: {}", selector, property, warning);
            }
            if result.is_valid {
                sanitized
                    .entry(selector.clone())
                    .or_default()
                    .insert(property, result.sanitized_value.to_string());
            } else {
                let message = result.error.unwrap_or_else(|| "invalid value".to_string());
                errors.push(format!("{} {}: {}", selector, property, message));
            }
        }
    }

    if !errors.is_empty() {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, errors.join("; "));
    }

    match state.store.save_styles(&project_id, &sanitized).await {
        Ok(()) => Json(sanitized).into_response(),
        Err(e) => store_error_response(e),
    }
}

async fn handle_list_versions(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Response {
    match state.store.list_versions(&project_id).await {
        Ok(versions) => Json(versions).into_response(),
        Err(e) => store_error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct SaveVersionRequest {
    content: String,
    #[serde(default)]
    label: Option<String>,
}

async fn handle_save_version(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(request): Json<SaveVersionRequest>,
) -> Response {
    if request.content.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Version content is empty");
    }

    match state
        .store
        .save_version(&project_id, request.label.as_deref(), &request.content)
        .await
    {
        Ok(info) => {
            info!("Saved version {} of {}", info.id, project_id);
            (StatusCode::CREATED, Json(info)).into_response()
        }
        Err(e) => store_error_response(e),
    }
}

async fn handle_get_version(
    State(state): State<AppState>,
    Path((project_id, version_id)): Path<(String, String)>,
) -> Response {
    match state.store.get_version(&project_id, &version_id).await {
        Ok(Some(version)) => Json(version).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Version not found"),
        Err(e) => store_error_response(e),
    }
}
