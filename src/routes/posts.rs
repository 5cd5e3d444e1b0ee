use askama::Template;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use chrono::Utc;
use serde::Deserialize;

use crate::blog::domain::{FeedScope, NewPost, PostChanges, PostId, PostSummary};
use crate::blog::feed::{self, PostDetail, Profile};
use crate::blog::forms::{CommentForm, FormErrors, PostForm, UploadedImage, MAX_IMAGE_BYTES};
use crate::blog::paginator::Page;
use crate::db::models::Group;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::routes::home::{Html, PageQuery};
use crate::state::AppState;

// --- Templates ---

#[derive(Template)]
#[template(path = "pages/group_list.html")]
pub struct GroupTemplate {
    pub viewer: Option<String>,
    pub group: Group,
    pub page: Page<PostSummary>,
}

#[derive(Template)]
#[template(path = "pages/profile.html")]
pub struct ProfileTemplate {
    pub viewer: Option<String>,
    pub profile: Profile,
    pub can_follow: bool,
}

#[derive(Template)]
#[template(path = "pages/post_detail.html")]
pub struct PostDetailTemplate {
    pub viewer: Option<String>,
    pub detail: PostDetail,
    pub can_edit: bool,
    pub comment_error: Option<String>,
}

#[derive(Template)]
#[template(path = "pages/create_post.html")]
pub struct PostFormTemplate {
    pub viewer: Option<String>,
    pub form: PostForm,
    pub groups: Vec<Group>,
    pub errors: FormErrors,
    /// Set when editing an existing post.
    pub post_id: Option<PostId>,
}

impl PostFormTemplate {
    pub fn is_edit(&self) -> bool {
        self.post_id.is_some()
    }

    pub fn action(&self) -> String {
        match self.post_id {
            Some(id) => format!("/posts/{}/edit/", id),
            None => "/create/".to_string(),
        }
    }

    pub fn is_selected(&self, group: &Group) -> bool {
        self.form.selected_group() == Some(group.id.0)
    }
}

#[derive(Debug, Deserialize)]
pub struct DetailQuery {
    pub comment: Option<String>,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    // Room for the largest accepted image plus the text fields.
    let upload_limit = DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024);

    Router::new()
        .route("/group/{slug}/", get(group_posts))
        .route("/profile/{username}/", get(profile))
        .route("/posts/{post_id}/", get(post_detail))
        .route(
            "/create/",
            get(post_create_page)
                .post(post_create)
                .layer(upload_limit.clone()),
        )
        .route(
            "/posts/{post_id}/edit/",
            get(post_edit_page).post(post_edit).layer(upload_limit),
        )
        .route("/posts/{post_id}/comment/", post(add_comment))
}

/// Unparseable ids can never match a post.
fn parse_post_id(raw: &str) -> AppResult<PostId> {
    raw.parse::<i64>().map(PostId).map_err(|_| AppError::NotFound)
}

fn detail_url(id: PostId) -> String {
    format!("/posts/{}/", id)
}

// --- Listing handlers ---

async fn group_posts(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Html<GroupTemplate>> {
    let repo = state.repo.as_ref();
    let group = feed::resolve_group(repo, &slug).await?;
    let page = feed::compose_feed(repo, FeedScope::Group(group.id), query.page.as_deref()).await?;

    Ok(Html(GroupTemplate {
        viewer: viewer.username(),
        group,
        page,
    }))
}

async fn profile(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Html<ProfileTemplate>> {
    let profile = feed::compose_profile(
        state.repo.as_ref(),
        &username,
        viewer.id(),
        query.page.as_deref(),
    )
    .await?;
    let can_follow = viewer.id().is_some_and(|id| id != profile.author.id);

    Ok(Html(ProfileTemplate {
        viewer: viewer.username(),
        profile,
        can_follow,
    }))
}

async fn post_detail(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(post_id): Path<String>,
    Query(query): Query<DetailQuery>,
) -> AppResult<Html<PostDetailTemplate>> {
    let post_id = parse_post_id(&post_id)?;
    let detail = feed::compose_detail(state.repo.as_ref(), post_id).await?;
    let can_edit = viewer.id() == Some(detail.post.author.id);
    let comment_error = query
        .comment
        .filter(|flag| flag == "invalid")
        .map(|_| "Comment text is required.".to_string());

    Ok(Html(PostDetailTemplate {
        viewer: viewer.username(),
        detail,
        can_edit,
        comment_error,
    }))
}

// --- Post form handlers ---

async fn read_post_form(mut multipart: Multipart) -> AppResult<PostForm> {
    let mut form = PostForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "text" => form.text = field.text().await?,
            "group" => form.group = Some(field.text().await?),
            "image" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                // Browsers send an empty part when no file was chosen.
                if !filename.is_empty() || !bytes.is_empty() {
                    form.image = Some(UploadedImage {
                        filename,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn save_image(state: &AppState, image: Option<UploadedImage>) -> AppResult<Option<String>> {
    match image {
        Some(image) => Ok(Some(state.media.save_post_image(&image).await?)),
        None => Ok(None),
    }
}

async fn post_create_page(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Html<PostFormTemplate>> {
    let groups = state.repo.list_groups().await?;
    Ok(Html(PostFormTemplate {
        viewer: Some(user.username),
        form: PostForm::default(),
        groups,
        errors: FormErrors::default(),
        post_id: None,
    }))
}

async fn post_create(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> AppResult<Response> {
    let mut form = read_post_form(multipart).await?;
    let groups = state.repo.list_groups().await?;

    let clean = match form.clean(&groups) {
        Ok(clean) => clean,
        Err(errors) => {
            form.image = None;
            return Ok(Html(PostFormTemplate {
                viewer: Some(user.username),
                form,
                groups,
                errors,
                post_id: None,
            })
            .into_response());
        }
    };

    let image = save_image(&state, form.image.take()).await?;
    let post_id = state
        .repo
        .create_post(
            &NewPost {
                author: user.id,
                text: clean.text,
                group: clean.group,
                image,
            },
            Utc::now(),
        )
        .await?;
    state.invalidate_index().await;

    tracing::info!("Post {} created by {}", post_id, user.username);
    Ok(Redirect::to(&format!("/profile/{}/", user.username)).into_response())
}

async fn post_edit_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
) -> AppResult<Response> {
    let post_id = parse_post_id(&post_id)?;
    let post = state.repo.find_post(post_id).await?.ok_or(AppError::NotFound)?;
    if post.author_id != user.id {
        return Ok(Redirect::to(&detail_url(post_id)).into_response());
    }

    let groups = state.repo.list_groups().await?;
    Ok(Html(PostFormTemplate {
        viewer: Some(user.username),
        form: PostForm::from_post(&post),
        groups,
        errors: FormErrors::default(),
        post_id: Some(post_id),
    })
    .into_response())
}

async fn post_edit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
    multipart: Multipart,
) -> AppResult<Response> {
    let post_id = parse_post_id(&post_id)?;
    let post = state.repo.find_post(post_id).await?.ok_or(AppError::NotFound)?;
    if post.author_id != user.id {
        tracing::warn!("{} tried to edit post {} by someone else", user.username, post_id);
        return Ok(Redirect::to(&detail_url(post_id)).into_response());
    }

    let mut form = read_post_form(multipart).await?;
    let groups = state.repo.list_groups().await?;

    let clean = match form.clean(&groups) {
        Ok(clean) => clean,
        Err(errors) => {
            form.image = None;
            return Ok(Html(PostFormTemplate {
                viewer: Some(user.username),
                form,
                groups,
                errors,
                post_id: Some(post_id),
            })
            .into_response());
        }
    };

    let image = save_image(&state, form.image.take()).await?;
    state
        .repo
        .update_post(
            post_id,
            &PostChanges {
                text: clean.text,
                group: clean.group,
                image,
            },
        )
        .await?;
    state.invalidate_index().await;

    Ok(Redirect::to(&detail_url(post_id)).into_response())
}

// --- Comments ---

/// POST /posts/{id}/comment/: always lands back on the post. An invalid
/// comment is not stored and the detail page is told so.
async fn add_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
    Form(form): Form<CommentForm>,
) -> AppResult<Response> {
    let post_id = parse_post_id(&post_id)?;
    if state.repo.find_post(post_id).await?.is_none() {
        return Err(AppError::NotFound);
    }

    match form.clean() {
        Ok(text) => {
            state
                .repo
                .create_comment(post_id, user.id, &text, Utc::now())
                .await?;
            Ok(Redirect::to(&detail_url(post_id)).into_response())
        }
        Err(_) => Ok(Redirect::to(&format!("{}?comment=invalid", detail_url(post_id))).into_response()),
    }
}
