// HTTP routes served behind the auth gate

use std::path::Path;
use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::auth::{Authenticator, Gatekeeper, LoginError, RequireUser, TokenCodec, gate};

#[derive(Clone)]
pub struct AppState {
    codec: Arc<TokenCodec>,
    authenticator: Arc<dyn Authenticator>,
}

/// Build the application router.
///
/// `business` carries the post/comment/user/like routes owned by the rest of
/// the application. Everything, including the fallback, sits behind the gate.
pub fn create_router(
    gatekeeper: Gatekeeper,
    authenticator: Arc<dyn Authenticator>,
    uploads_dir: impl AsRef<Path>,
    business: Router,
) -> Router {
    let state = AppState {
        codec: gatekeeper.codec().clone(),
        authenticator,
    };

    Router::new()
        .route("/auth/login", post(login))
        .route("/users/me", get(current_user))
        .with_state(state)
        .nest_service("/uploads", ServeDir::new(uploads_dir.as_ref()))
        .merge(business)
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn_with_state(gatekeeper, gate)),
        )
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

fn message(status: StatusCode, text: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(serde_json::json!({ "message": text, "data": null })),
    )
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let user_id = state
        .authenticator
        .authenticate(&payload.email, &payload.password)
        .await
        .map_err(|e| match e {
            LoginError::UnknownEmail => message(StatusCode::NOT_FOUND, &e.to_string()),
            LoginError::WrongPassword => message(StatusCode::UNAUTHORIZED, &e.to_string()),
            LoginError::Backend(_) => {
                error!("Login failed: {}", e);
                message(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
            }
        })?;

    let token = state.codec.issue(user_id).map_err(|e| {
        error!("Token issuance failed for user {}: {}", user_id, e.reason());
        message(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
    })?;

    info!("User {} logged in", user_id);

    Ok(Json(serde_json::json!({
        "message": "login succeeded",
        "data": {
            "userId": user_id,
            "token": token,
        }
    })))
}

/// Echo the authenticated caller.
async fn current_user(RequireUser(user_id): RequireUser) -> Json<Value> {
    Json(serde_json::json!({ "userId": user_id }))
}

async fn not_found() -> (StatusCode, Json<Value>) {
    message(StatusCode::NOT_FOUND, "Not found")
}
