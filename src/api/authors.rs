use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::pagination::apply_pagination;
use super::types::*;
use super::{required, status_from_db};
use crate::db::{Author, AuthorId, AuthorRepo};
use crate::server::AppState;
use crate::util::QueryParams;

pub async fn list_authors(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<QueryResult<Author>>, StatusCode> {
    let search = params.get("search").map(str::trim);
    let authors = state.db.list_authors(search).await.map_err(status_from_db)?;

    Ok(Json(apply_pagination(authors, &params)))
}

pub async fn create_author(
    State(state): State<AppState>,
    Json(req): Json<AuthorRequest>,
) -> Result<(StatusCode, Json<Author>), StatusCode> {
    let name = required(&req.name)?;
    let author = state.db.create_author(name).await.map_err(status_from_db)?;
    Ok((StatusCode::CREATED, Json(author)))
}

pub async fn get_author(
    State(state): State<AppState>,
    Path(id): Path<AuthorId>,
) -> Result<Json<Author>, StatusCode> {
    let author = state.db.get_author(id).await.map_err(status_from_db)?;
    Ok(Json(author))
}

pub async fn update_author(
    State(state): State<AppState>,
    Path(id): Path<AuthorId>,
    Json(req): Json<AuthorRequest>,
) -> Result<Json<Author>, StatusCode> {
    let name = required(&req.name)?;
    let author = state
        .db
        .update_author(id, name)
        .await
        .map_err(status_from_db)?;
    Ok(Json(author))
}

/// Deleting an author also deletes their books.
pub async fn delete_author(
    State(state): State<AppState>,
    Path(id): Path<AuthorId>,
) -> Result<StatusCode, StatusCode> {
    state.db.delete_author(id).await.map_err(status_from_db)?;
    Ok(StatusCode::NO_CONTENT)
}
