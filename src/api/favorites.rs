use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use tracing::info;

use super::auth::AuthUser;
use super::status_from_db;
use super::types::*;
use crate::db::{Book, DbError, FavoriteRepo};
use crate::server::AppState;

async fn recommendations_for(state: &AppState, user_id: &str) -> Result<Vec<Book>, StatusCode> {
    state
        .recommender
        .recommend(state.db.as_ref(), user_id)
        .await
        .map_err(status_from_db)
}

/// The caller's favorites along with fresh recommendations.
pub async fn list_favorites(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<FavoritesResponse>, StatusCode> {
    let favorites = state
        .db
        .favorites_for_user(&auth.user_id)
        .await
        .map_err(status_from_db)?;
    let recommendations = recommendations_for(&state, &auth.user_id).await?;

    Ok(Json(FavoritesResponse {
        favorites: favorites.iter().map(FavoriteDto::from).collect(),
        recommendations,
    }))
}

pub async fn add_favorite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<FavoriteRequest>,
) -> Result<(StatusCode, Json<FavoriteCreated>), StatusCode> {
    let favorite = state
        .db
        .add_favorite(&auth.user_id, req.book)
        .await
        .map_err(status_from_db)?;
    info!(user = %auth.user_id, book = favorite.book.id, "added favorite");

    let recommendations = recommendations_for(&state, &auth.user_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(FavoriteCreated {
            favorite: FavoriteDto::from(&favorite),
            recommendations,
        }),
    ))
}

/// Removes one of the caller's favorites by favorite id.
pub async fn delete_favorite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Response, StatusCode> {
    match state.db.delete_favorite(&auth.user_id, id).await {
        Ok(()) => {}
        Err(DbError::NotFound(_)) => {
            let body = ErrorBody {
                error: "Favorite book not found.".to_string(),
            };
            return Ok((StatusCode::NOT_FOUND, Json(body)).into_response());
        }
        Err(e) => return Err(status_from_db(e)),
    }

    let recommendations = recommendations_for(&state, &auth.user_id).await?;

    Ok(Json(FavoriteDeleted {
        message: format!("Favorite book with ID {} has been deleted.", id),
        recommendations,
    })
    .into_response())
}
