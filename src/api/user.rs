use axum::{extract::State, http::StatusCode, Extension, Json};

use super::auth::{hash_password, AuthUser};
use super::status_from_db;
use super::types::*;
use crate::db::UserRepo;
use crate::server::AppState;

pub async fn get_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserDto>, StatusCode> {
    let user = state
        .db
        .get_user_by_id(&auth.user_id)
        .await
        .map_err(status_from_db)?;

    Ok(Json(UserDto::from(&user)))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserDto>, StatusCode> {
    let mut user = state
        .db
        .get_user_by_id(&auth.user_id)
        .await
        .map_err(status_from_db)?;

    if let Some(email) = req.email {
        user.email = email.trim().to_string();
    }
    if let Some(password) = req.password {
        if password.is_empty() {
            return Err(StatusCode::BAD_REQUEST);
        }
        user.password = hash_password(password, state.config.auth.bcrypt_cost).await?;
    }

    state.db.update_user(&user).await.map_err(status_from_db)?;

    Ok(Json(UserDto::from(&user)))
}
