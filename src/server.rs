use axum::{
    extract::Request,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::api;
use crate::config::Config;
use crate::db::Repository;
use crate::recommend::RecommendationEngine;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn Repository>,
    pub recommender: Arc<RecommendationEngine>,
}

impl AppState {
    pub fn new(config: Config, db: Arc<dyn Repository>) -> Self {
        let recommender = RecommendationEngine::new(&config.recommendations);
        Self {
            config: Arc::new(config),
            db,
            recommender: Arc::new(recommender),
        }
    }

    pub fn with_recommender(mut self, recommender: RecommendationEngine) -> Self {
        self.recommender = Arc::new(recommender);
        self
    }
}

pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/user/register", post(api::register))
        .route("/api/user/login", post(api::login));

    let protected_routes = Router::new()
        .route("/api/user/login/refresh", post(api::refresh_token))
        .route("/api/user/me", get(api::get_me).patch(api::update_me))
        .route("/api/books", get(api::list_books).post(api::create_book))
        .route(
            "/api/books/:id",
            get(api::get_book)
                .put(api::update_book)
                .patch(api::patch_book)
                .delete(api::delete_book),
        )
        .route("/api/authors", get(api::list_authors).post(api::create_author))
        .route(
            "/api/authors/:id",
            get(api::get_author)
                .put(api::update_author)
                .patch(api::update_author)
                .delete(api::delete_author),
        )
        .route(
            "/api/favorites",
            get(api::list_favorites).post(api::add_favorite),
        )
        .route("/api/favorites/:id", delete(api::delete_favorite))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            api::require_auth,
        ));

    let routes = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(fallback_handler)
        .with_state(state);

    // Path rewriting has to happen before routing, so the routes sit
    // behind an outer router that only has a fallback.
    Router::new()
        .fallback_service(routes)
        .layer(axum::middleware::from_fn(crate::middleware::normalize_path))
        .layer(axum::middleware::from_fn(crate::middleware::log_request))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

async fn fallback_handler(req: Request) -> impl IntoResponse {
    // CORS preflight for paths without a route.
    if req.method() == axum::http::Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    StatusCode::NOT_FOUND.into_response()
}
