//! HTTP boundary: bearer-key authentication plus the push and pull sync
//! endpoints. JWT issuance, SMS login and rate limiting live elsewhere;
//! this layer only resolves a key to a stored user and hands off to the
//! sync engine.

use axum::{
    extract::{Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::ApiKeyEntry;
use crate::db::UsersReadRepository;
use crate::error::SyncError;
use crate::models::User;
use crate::notify::EventPublisher;
use crate::sync::{Receiver, SyncBatch, UpdaterManager};

/// Authenticated user info, added to request extensions after auth
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// API key store - maps bearer key -> user id
#[derive(Debug, Default)]
pub struct ApiKeyStore {
    keys: HashMap<String, Uuid>,
}

impl ApiKeyStore {
    pub fn from_entries(entries: &[ApiKeyEntry]) -> Self {
        let mut keys = HashMap::new();
        for entry in entries {
            keys.insert(entry.key.clone(), entry.user_id);
        }
        tracing::info!("Loaded {} API key(s)", keys.len());
        Self { keys }
    }

    fn validate(&self, key: &str) -> Option<Uuid> {
        self.keys.get(key).copied()
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub publisher: EventPublisher,
    pub api_keys: Arc<ApiKeyStore>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

fn error_response(status: StatusCode, error: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error,
            message: message.into(),
        }),
    )
        .into_response()
}

/// Authentication middleware
async fn auth_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let api_key = match auth_header {
        Some(h) if h.starts_with("Bearer ") => &h[7..],
        Some(_) => {
            return error_response(
                StatusCode::UNAUTHORIZED,
                "invalid_auth",
                "Authorization header must use Bearer scheme",
            );
        }
        None => {
            return error_response(
                StatusCode::UNAUTHORIZED,
                "missing_auth",
                "Authorization header required",
            );
        }
    };

    match state.api_keys.validate(api_key) {
        Some(user_id) => {
            request.extensions_mut().insert(AuthUser { user_id });
            next.run(request).await
        }
        None => error_response(StatusCode::UNAUTHORIZED, "invalid_key", "Invalid API key"),
    }
}

/// The key resolved, but the user row must exist too.
async fn load_user(state: &AppState, auth: &AuthUser) -> Result<User, Response> {
    let users_read = UsersReadRepository::new(state.pool.clone());
    match users_read.get_user(auth.user_id).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(error_response(
            StatusCode::UNAUTHORIZED,
            "unknown_user",
            format!("no user for id {}", auth.user_id),
        )),
        Err(e) => {
            tracing::error!("failed to load user {}: {e}", auth.user_id);
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage",
                "failed to load user",
            ))
        }
    }
}

fn sync_error_response(err: SyncError) -> Response {
    let status = match &err {
        SyncError::NotFound(_) => StatusCode::NOT_FOUND,
        SyncError::Forbidden(_) => StatusCode::FORBIDDEN,
        SyncError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SyncError::Conflict(_) => StatusCode::CONFLICT,
        SyncError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("sync failed: {err}");
    }

    error_response(status, "sync_error", err.to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint (no auth required)
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Get current user info (auth required)
async fn me(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> Response {
    match load_user(&state, &auth).await {
        Ok(user) => Json(user).into_response(),
        Err(response) => response,
    }
}

#[derive(Deserialize)]
struct UpdatesQuery {
    /// Watermark: unix seconds of the last successful sync. Zero (or
    /// absent) means "everything".
    #[serde(default)]
    date: i64,
}

/// Pull: everything that changed for the user since the watermark.
async fn get_updates(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<UpdatesQuery>,
) -> Response {
    let user = match load_user(&state, &auth).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let since = chrono::DateTime::from_timestamp(query.date, 0).unwrap_or_default();

    let receiver = Receiver::new(state.pool.clone());
    match receiver.get_updates(&user, since).await {
        Ok(pack) => Json(pack).into_response(),
        Err(err) => sync_error_response(err),
    }
}

/// Push: reconcile one batch of client mutations.
async fn post_updates(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(batch): Json<SyncBatch>,
) -> Response {
    let user = match load_user(&state, &auth).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let errors = batch.validate();
    if !errors.is_empty() {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "validation",
            errors.join("; "),
        );
    }

    let manager = UpdaterManager::new(state.pool.clone(), state.publisher.clone());
    match manager.run_update(&user, &batch).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => sync_error_response(err),
    }
}

/// Build the application router: public health check plus the
/// authenticated sync endpoints.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(health));

    let protected_routes = Router::new()
        .route("/me", get(me))
        .route("/shoppingList/updates", get(get_updates).post(post_updates))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
