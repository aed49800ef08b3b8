//! HTTP surface: the `/notes` CRUD handlers, the rate-limited login
//! route, and router construction.
//!
//! All note operations are addressed by request body rather than path,
//! mirroring the API contract the frontend already speaks.  Validation
//! always runs before any store access; handlers never recover from
//! store errors themselves.

use std::collections::HashMap;

use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request, State},
    http::{Method, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use jotter_store::{DateTime, Note, ObjectId, Store};

use crate::error::ApiError;
use crate::rate_limit::{login_rate_limit, RateLimiter};

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub login_limiter: RateLimiter,
}

/// `Json` wrapper whose rejection speaks this API's error contract:
/// malformed bodies come back as 400 with a `{"message": ...}` payload
/// instead of axum's plain-text 422.
struct JsonBody<T>(T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            // A well-formed body carrying the wrong type (say a string
            // where `completed` wants a bool) is the same contract breach
            // as a missing field.
            Err(JsonRejection::JsonDataError(_)) => Err(all_fields_required()),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    // The limiter guards login-class endpoints only; note routes are
    // intentionally unthrottled.
    let auth = Router::new()
        .route("/auth/login", post(login))
        .route_layer(middleware::from_fn_with_state(
            state.login_limiter.clone(),
            login_rate_limit,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/notes",
            get(list_notes)
                .post(create_note)
                .patch(update_note)
                .delete(delete_note),
        )
        .merge(auth)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Session issuance lives in the upstream identity service; this stub
/// exists so the login limiter has an endpoint to guard.
async fn login() -> impl IntoResponse {
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(serde_json::json!({
            "message": "Login is handled by the identity service"
        })),
    )
}

// ─── Note handlers ───

/// A note as returned by the list endpoint: ids as hex strings, the
/// owner replaced by their username (null if the user no longer exists),
/// timestamps as RFC 3339.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NoteView {
    id: String,
    user: Option<String>,
    title: String,
    text: String,
    completed: bool,
    created_at: String,
    updated_at: String,
}

impl NoteView {
    fn from_note(note: Note, usernames: &HashMap<ObjectId, String>) -> Self {
        Self {
            id: note.id.map(|id| id.to_hex()).unwrap_or_default(),
            user: usernames.get(&note.user).cloned(),
            title: note.title,
            text: note.text,
            completed: note.completed,
            created_at: rfc3339(note.created_at),
            updated_at: rfc3339(note.updated_at),
        }
    }
}

fn rfc3339(ts: DateTime) -> String {
    ts.try_to_rfc3339_string().unwrap_or_default()
}

async fn list_notes(State(state): State<AppState>) -> Result<Json<Vec<NoteView>>, ApiError> {
    let notes = state.store.list_notes().await?;
    if notes.is_empty() {
        return Err(ApiError::BadRequest("No notes found.".to_string()));
    }

    // One batched lookup for every referenced owner instead of a query
    // per note.
    let mut user_ids: Vec<ObjectId> = notes.iter().map(|n| n.user).collect();
    user_ids.sort_unstable();
    user_ids.dedup();
    let usernames = state.store.usernames_by_id(&user_ids).await?;

    let views = notes
        .into_iter()
        .map(|note| NoteView::from_note(note, &usernames))
        .collect();
    Ok(Json(views))
}

#[derive(Deserialize)]
struct CreateNoteRequest {
    user: Option<String>,
    title: Option<String>,
    text: Option<String>,
}

async fn create_note(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateNoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, title, text) = match (
        non_empty(req.user),
        non_empty(req.title),
        non_empty(req.text),
    ) {
        (Some(user), Some(title), Some(text)) => (user, title, text),
        _ => return Err(all_fields_required()),
    };
    let user = parse_id(&user)?;

    // Fast-path duplicate check for a friendly message; the unique index
    // remains the authoritative guarantee under concurrent writers.
    if state.store.find_by_title(&title, None).await?.is_some() {
        return Err(ApiError::DuplicateTitle);
    }

    let note = Note::new(user, title, text);
    let id = state.store.insert_note(&note).await?;
    info!(id = %id, title = %note.title, "note created");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": format!("New note {} created", note.title)
        })),
    ))
}

#[derive(Deserialize)]
struct UpdateNoteRequest {
    id: Option<String>,
    user: Option<String>,
    title: Option<String>,
    text: Option<String>,
    completed: Option<bool>,
}

async fn update_note(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<UpdateNoteRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (id, user, title, text, completed) = match (
        non_empty(req.id),
        non_empty(req.user),
        non_empty(req.title),
        non_empty(req.text),
        req.completed,
    ) {
        (Some(id), Some(user), Some(title), Some(text), Some(completed)) => {
            (id, user, title, text, completed)
        }
        _ => return Err(all_fields_required()),
    };
    let id = parse_id(&id)?;
    let user = parse_id(&user)?;

    let mut note = state
        .store
        .get_note(id)
        .await?
        .ok_or(ApiError::NoteNotFound)?;

    // A title clash only conflicts when it belongs to a different note,
    // so renaming a note to its own title is allowed.
    if state.store.find_by_title(&title, Some(id)).await?.is_some() {
        return Err(ApiError::DuplicateTitle);
    }

    note.user = user;
    note.title = title;
    note.text = text;
    note.completed = completed;
    note.updated_at = DateTime::now();

    state.store.update_note(id, &note).await?;
    info!(id = %id, title = %note.title, "note updated");

    Ok(Json(serde_json::json!({
        "message": format!("{} updated", note.title)
    })))
}

#[derive(Deserialize)]
struct DeleteNoteRequest {
    id: Option<String>,
}

async fn delete_note(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<DeleteNoteRequest>,
) -> Result<Json<String>, ApiError> {
    let Some(id) = non_empty(req.id) else {
        return Err(ApiError::BadRequest("Note ID required".to_string()));
    };
    let id = parse_id(&id)?;

    let note = state
        .store
        .get_note(id)
        .await?
        .ok_or(ApiError::NoteNotFound)?;

    state.store.delete_note(id).await?;
    info!(id = %id, title = %note.title, "note deleted");

    Ok(Json(format!(
        "note {} with ID {} deleted",
        note.title,
        id.to_hex()
    )))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn all_fields_required() -> ApiError {
    ApiError::BadRequest("All fields are required".to_string())
}

fn parse_id(hex: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(hex)
        .map_err(|_| ApiError::BadRequest(format!("Invalid object ID: {hex}")))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
