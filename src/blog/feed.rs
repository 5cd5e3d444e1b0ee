//! Feed composition: which posts a viewer sees for a scope, in what order,
//! split into pages.
//!
//! Nothing here caches. Every call reads the current state of the store;
//! the index page cache sits in front of the HTTP handler instead.

use crate::blog::domain::{CommentView, FeedScope, PostId, PostSummary, UserId};
use crate::blog::follow;
use crate::blog::paginator::{Page, PageInfo, POSTS_PER_PAGE};
use crate::blog::repository::{BlogRepository, RepositoryError};
use crate::db::models::{Group, User};

/// Everything the profile page shows about an author.
#[derive(Debug, Clone)]
pub struct Profile {
    pub author: User,
    /// True only for a signed-in viewer who follows the author.
    pub is_followed: bool,
    pub followers: u64,
    pub following: u64,
    pub posts: Page<PostSummary>,
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostSummary,
    pub comments: Vec<CommentView>,
    pub author_post_count: u64,
}

pub async fn resolve_group(
    repo: &dyn BlogRepository,
    slug: &str,
) -> Result<Group, RepositoryError> {
    repo.find_group_by_slug(slug)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(format!("group {slug}")))
}

pub async fn resolve_author(
    repo: &dyn BlogRepository,
    username: &str,
) -> Result<User, RepositoryError> {
    repo.find_user_by_username(username)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(format!("user {username}")))
}

/// One page of the feed for `scope`. `page` is the raw `?page=` value.
pub async fn compose_feed(
    repo: &dyn BlogRepository,
    scope: FeedScope,
    page: Option<&str>,
) -> Result<Page<PostSummary>, RepositoryError> {
    let count = repo.count_posts(scope).await?;
    let info = PageInfo::resolve(page, count, POSTS_PER_PAGE);
    let items = repo.find_posts(scope, info.per_page, info.offset()).await?;

    tracing::debug!(
        ?scope,
        page = info.number,
        pages = info.num_pages,
        count,
        "Composed feed page"
    );

    Ok(Page { items, info })
}

pub async fn compose_profile(
    repo: &dyn BlogRepository,
    username: &str,
    viewer: Option<UserId>,
    page: Option<&str>,
) -> Result<Profile, RepositoryError> {
    let author = resolve_author(repo, username).await?;

    let is_followed = match viewer {
        Some(viewer) => follow::is_following(repo, viewer, author.id).await?,
        None => false,
    };
    let followers = repo.count_followers(author.id).await?;
    let following = repo.count_following(author.id).await?;
    let posts = compose_feed(repo, FeedScope::Author(author.id), page).await?;

    Ok(Profile {
        author,
        is_followed,
        followers,
        following,
        posts,
    })
}

pub async fn compose_detail(
    repo: &dyn BlogRepository,
    post_id: PostId,
) -> Result<PostDetail, RepositoryError> {
    let post = repo
        .find_post_summary(post_id)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(format!("post {post_id}")))?;
    let comments = repo.find_comments(post_id).await?;
    let author_post_count = repo.count_posts(FeedScope::Author(post.author.id)).await?;

    Ok(PostDetail {
        post,
        comments,
        author_post_count,
    })
}
