use std::collections::HashMap;

use axum::{
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    Extension, Json,
};
use tracing::{error, info, warn};

use super::types::*;
use super::{required, status_from_db};
use crate::db::{AccessToken, AccessTokenRepo, DbError, User, UserRepo};
use crate::server::AppState;

/// The authenticated caller, attached to the request by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub token: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserDto>), StatusCode> {
    let username = required(&req.username)?.to_string();
    required(&req.password)?;

    let password = hash_password(req.password, state.config.auth.bcrypt_cost).await?;
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        username,
        email: req.email.trim().to_string(),
        password,
        created: Some(chrono::Utc::now().to_rfc3339()),
        lastlogin: None,
    };

    state.db.insert_user(&user).await.map_err(status_from_db)?;
    info!(user = %user.username, "registered user");

    Ok((StatusCode::CREATED, Json(UserDto::from(&user))))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, StatusCode> {
    let username = req.username.trim();

    let user = match state.db.get_user(username).await {
        Ok(user) => user,
        Err(DbError::NotFound(_)) => return Err(StatusCode::UNAUTHORIZED),
        Err(e) => return Err(status_from_db(e)),
    };

    if !verify_password(req.password, user.password.clone()).await? {
        warn!(user = %username, "login failed: bad password");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let token = issue_token(&state, &user.id).await?;
    if let Err(e) = state.db.touch_user_login(&user.id).await {
        error!("Failed to record login for {}: {}", user.id, e);
    }

    Ok(Json(LoginResponse {
        access_token: token.token,
        user: UserDto::from(&user),
    }))
}

/// Swaps the caller's token for a fresh one.
pub async fn refresh_token(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<LoginResponse>, StatusCode> {
    let user = state
        .db
        .get_user_by_id(&auth.user_id)
        .await
        .map_err(status_from_db)?;

    let token = issue_token(&state, &user.id).await?;
    state
        .db
        .delete_token(&auth.token)
        .await
        .map_err(status_from_db)?;

    Ok(Json(LoginResponse {
        access_token: token.token,
        user: UserDto::from(&user),
    }))
}

pub async fn require_auth(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token_str = extract_token(&req, &params).ok_or(StatusCode::UNAUTHORIZED)?;

    let token = match state.db.get_token(&token_str).await {
        Ok(token) => token,
        Err(DbError::NotFound(_)) => return Err(StatusCode::UNAUTHORIZED),
        Err(e) => return Err(status_from_db(e)),
    };

    if let Err(e) = state.db.touch_token(&token.token).await {
        error!("Failed to touch token: {}", e);
    }

    req.extensions_mut().insert(AuthUser {
        user_id: token.userid,
        token: token.token,
    });

    Ok(next.run(req).await)
}

async fn issue_token(state: &AppState, user_id: &str) -> Result<AccessToken, StatusCode> {
    let token = AccessToken {
        token: uuid::Uuid::new_v4().simple().to_string(),
        userid: user_id.to_string(),
        created: Some(chrono::Utc::now()),
        lastused: None,
    };

    state.db.insert_token(&token).await.map_err(status_from_db)?;
    Ok(token)
}

pub(crate) async fn hash_password(password: String, cost: u32) -> Result<String, StatusCode> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| {
            error!("Password hashing task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Password hashing failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

async fn verify_password(password: String, hash: String) -> Result<bool, StatusCode> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .map_err(|e| {
            error!("Password verification task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

fn extract_token<B>(req: &axum::http::Request<B>, params: &HashMap<String, String>) -> Option<String> {
    if let Some(auth_header) = req.headers().get("Authorization") {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = parse_authorization(auth_str) {
                return Some(token);
            }
        }
    }

    if let Some(token) = req
        .headers()
        .get("X-Api-Token")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    {
        return Some(token);
    }

    params.get("api_key").cloned()
}

/// Accepts `Bearer <token>` and `Token <token>`.
fn parse_authorization(auth_str: &str) -> Option<String> {
    let (scheme, token) = auth_str.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") && !scheme.eq_ignore_ascii_case("token") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_authorization() {
        assert_eq!(parse_authorization("Bearer abc123"), Some("abc123".to_string()));
        assert_eq!(parse_authorization("token  abc123 "), Some("abc123".to_string()));
        assert_eq!(parse_authorization("Basic dXNlcjpwdw=="), None);
        assert_eq!(parse_authorization("Bearer "), None);
        assert_eq!(parse_authorization("abc123"), None);
    }

    #[test]
    fn test_extract_token_sources() {
        let req = axum::http::Request::builder()
            .header("X-Api-Token", "from-header")
            .body(())
            .unwrap();
        assert_eq!(
            extract_token(&req, &HashMap::new()),
            Some("from-header".to_string())
        );

        let req = axum::http::Request::builder().body(()).unwrap();
        let params = HashMap::from([("api_key".to_string(), "from-query".to_string())]);
        assert_eq!(extract_token(&req, &params), Some("from-query".to_string()));
        assert_eq!(extract_token(&req, &HashMap::new()), None);
    }
}
