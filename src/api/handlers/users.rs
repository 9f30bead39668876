//! User handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiJson, CreateUserRequest};
use crate::domain::User;
use crate::server::AppState;

/// POST /api/users - Register a user.
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state
        .service
        .create_user(&request.wallet, &request.username, &request.email)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users - List users.
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.service.list_users().await?))
}
