use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::Redirect;
use axum::routing::get;
use axum::Router;

use crate::blog::domain::{FeedScope, PostSummary};
use crate::blog::feed;
use crate::blog::follow::{self, FollowOutcome, UnfollowOutcome};
use crate::blog::paginator::Page;
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::routes::home::{Html, PageQuery};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/follow.html")]
pub struct FollowTemplate {
    pub viewer: Option<String>,
    pub page: Page<PostSummary>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/follow/", get(follow_index))
        .route("/profile/{username}/follow/", get(profile_follow))
        .route("/profile/{username}/unfollow/", get(profile_unfollow))
}

/// GET /follow/: posts by the authors the viewer follows
async fn follow_index(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Html<FollowTemplate>> {
    let page = feed::compose_feed(
        state.repo.as_ref(),
        FeedScope::Followed(user.id),
        query.page.as_deref(),
    )
    .await?;

    Ok(Html(FollowTemplate {
        viewer: Some(user.username),
        page,
    }))
}

async fn profile_follow(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(username): Path<String>,
) -> AppResult<Redirect> {
    let repo = state.repo.as_ref();
    let author = feed::resolve_author(repo, &username).await?;

    match follow::follow(repo, user.id, author.id).await? {
        FollowOutcome::Created => Ok(Redirect::to("/follow/")),
        FollowOutcome::SelfFollow | FollowOutcome::AlreadyFollowing => Ok(Redirect::to("/")),
    }
}

async fn profile_unfollow(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(username): Path<String>,
) -> AppResult<Redirect> {
    let repo = state.repo.as_ref();
    let author = feed::resolve_author(repo, &username).await?;

    match follow::unfollow(repo, user.id, author.id).await? {
        UnfollowOutcome::Removed => Ok(Redirect::to(&format!("/profile/{}/", author.username))),
        UnfollowOutcome::NotFollowing => Ok(Redirect::to("/")),
    }
}
