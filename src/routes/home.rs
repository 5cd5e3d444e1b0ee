use askama::Template;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::blog::domain::{FeedScope, PostSummary};
use crate::blog::feed;
use crate::blog::paginator::Page;
use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/index.html")]
pub struct IndexTemplate {
    pub viewer: Option<String>,
    pub page: Page<PostSummary>,
}

/// `?page=` on every listing.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => html_body(body),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

/// An already rendered page.
pub fn html_body(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        body,
    )
        .into_response()
}

/// GET /: every post, newest first. Rendered pages are cached briefly.
pub async fn index(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let key = format!(
        "{}:{}",
        viewer.username().unwrap_or_default(),
        query.page.as_deref().unwrap_or_default()
    );

    if let Some(body) = state.index_cache.get(&key).await {
        return Ok(html_body(body));
    }

    let page =
        feed::compose_feed(state.repo.as_ref(), FeedScope::Global, query.page.as_deref()).await?;
    let body = IndexTemplate {
        viewer: viewer.username(),
        page,
    }
    .render()?;

    state.index_cache.insert(key, body.clone()).await;
    Ok(html_body(body))
}
