pub mod about;
pub mod assets;
pub mod auth;
pub mod follow;
pub mod home;
pub mod media;
pub mod posts;

use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;

/// The whole site.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(home::index))
        .route("/assets/{*path}", get(assets::serve))
        .route("/media/{*path}", get(media::serve))
        .merge(auth::router())
        .merge(posts::router())
        .merge(follow::router())
        .merge(about::router())
        .fallback(|| async { AppError::NotFound })
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
