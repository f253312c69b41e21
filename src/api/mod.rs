pub mod auth;
pub mod authors;
pub mod books;
pub mod favorites;
pub mod pagination;
pub mod types;
pub mod user;

pub use auth::*;
pub use authors::*;
pub use books::*;
pub use favorites::*;
pub use types::*;
pub use user::*;

use axum::http::StatusCode;
use tracing::error;

use crate::db::DbError;

pub(crate) fn status_from_db(err: DbError) -> StatusCode {
    match err {
        DbError::NotFound(_) => StatusCode::NOT_FOUND,
        DbError::AlreadyExists(_) => StatusCode::CONFLICT,
        DbError::Sqlx(e) => {
            error!("Database error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Trims `value`, rejecting it when nothing is left.
pub(crate) fn required(value: &str) -> Result<&str, StatusCode> {
    let value = value.trim();
    if value.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(value)
}
