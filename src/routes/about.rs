use askama::Template;
use axum::routing::get;
use axum::Router;

use crate::extractors::MaybeUser;
use crate::routes::home::Html;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/about_author.html")]
pub struct AuthorTemplate {
    pub viewer: Option<String>,
}

#[derive(Template)]
#[template(path = "pages/about_tech.html")]
pub struct TechTemplate {
    pub viewer: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/about/author/", get(author))
        .route("/about/tech/", get(tech))
}

async fn author(viewer: MaybeUser) -> Html<AuthorTemplate> {
    Html(AuthorTemplate {
        viewer: viewer.username(),
    })
}

async fn tech(viewer: MaybeUser) -> Html<TechTemplate> {
    Html(TechTemplate {
        viewer: viewer.username(),
    })
}
