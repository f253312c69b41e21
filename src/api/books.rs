use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::pagination::apply_pagination;
use super::types::*;
use super::{required, status_from_db};
use crate::db::{Book, BookId, BookRepo};
use crate::server::AppState;
use crate::util::QueryParams;

pub async fn list_books(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<QueryResult<Book>>, StatusCode> {
    let search = params.get("search").map(str::trim);
    let books = state.db.list_books(search).await.map_err(status_from_db)?;

    Ok(Json(apply_pagination(books, &params)))
}

pub async fn create_book(
    State(state): State<AppState>,
    Json(req): Json<BookRequest>,
) -> Result<(StatusCode, Json<Book>), StatusCode> {
    let title = required(&req.title)?;
    let author = required(&req.author.name)?;

    let book = state
        .db
        .create_book(title, author)
        .await
        .map_err(status_from_db)?;

    Ok((StatusCode::CREATED, Json(book)))
}

pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<BookId>,
) -> Result<Json<Book>, StatusCode> {
    let book = state.db.get_book(id).await.map_err(status_from_db)?;
    Ok(Json(book))
}

pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<BookId>,
    Json(req): Json<BookRequest>,
) -> Result<Json<Book>, StatusCode> {
    let title = required(&req.title)?;
    let author = required(&req.author.name)?;

    let book = state
        .db
        .update_book(id, Some(title), Some(author))
        .await
        .map_err(status_from_db)?;

    Ok(Json(book))
}

pub async fn patch_book(
    State(state): State<AppState>,
    Path(id): Path<BookId>,
    Json(req): Json<BookPatch>,
) -> Result<Json<Book>, StatusCode> {
    let title = req.title.as_deref().map(required).transpose()?;
    let author = req
        .author
        .as_ref()
        .map(|a| required(&a.name))
        .transpose()?;

    let book = state
        .db
        .update_book(id, title, author)
        .await
        .map_err(status_from_db)?;

    Ok(Json(book))
}

pub async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<BookId>,
) -> Result<StatusCode, StatusCode> {
    state.db.delete_book(id).await.map_err(status_from_db)?;
    Ok(StatusCode::NO_CONTENT)
}
