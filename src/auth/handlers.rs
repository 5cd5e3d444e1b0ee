use askama::Template;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use crate::auth::password::{hash_password_async, verify_password_async};
use crate::auth::session;
use crate::blog::forms::FormErrors;
use crate::blog::RepositoryError;
use crate::error::AppResult;
use crate::extractors::{session_token, MaybeUser};
use crate::routes::home::Html;
use crate::state::AppState;

const MAX_USERNAME_LEN: usize = 150;
const MIN_PASSWORD_LEN: usize = 8;

// -- Templates --

#[derive(Template)]
#[template(path = "pages/signup.html")]
pub struct SignupTemplate {
    pub viewer: Option<String>,
    pub username: String,
    pub display_name: String,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub viewer: Option<String>,
    pub username: String,
    pub next: String,
    pub error: Option<String>,
}

// -- Request types --

#[derive(Debug, Default, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

impl SignupForm {
    pub fn clean(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();

        let username = self.username.trim();
        if username.is_empty() {
            errors.add("username", "Username is required.");
        } else if username.chars().count() > MAX_USERNAME_LEN {
            errors.add("username", "Username must be 150 characters or fewer.");
        } else if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@.+-_".contains(c))
        {
            errors.add(
                "username",
                "Use only letters, digits and @/./+/-/_ characters.",
            );
        }

        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.add("password", "Password must be at least 8 characters.");
        } else if self.password != self.password_confirm {
            errors.add("password_confirm", "The two password fields didn't match.");
        }

        errors.into_result(())
    }

    fn display_name(&self) -> Option<&str> {
        Some(self.display_name.trim()).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub next: String,
}

/// Only same-site paths are honoured as post-login destinations.
pub fn safe_next(next: &str) -> &str {
    if next.starts_with('/') && !next.starts_with("//") && !next.contains('\\') {
        next
    } else {
        "/"
    }
}

fn signed_in(state: &AppState, token: &str, target: &str) -> Response {
    let cookie = session::session_cookie(
        &state.config.auth.cookie_name,
        token,
        state.config.auth.session_hours,
    );
    ([(header::SET_COOKIE, cookie)], Redirect::to(target)).into_response()
}

// -- Signup handlers --

/// GET /auth/signup/: render the registration form
pub async fn signup_page(MaybeUser(user): MaybeUser) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    Ok(Html(SignupTemplate {
        viewer: None,
        username: String::new(),
        display_name: String::new(),
        errors: FormErrors::default(),
    })
    .into_response())
}

/// POST /auth/signup/: create the account and sign it in
pub async fn signup(
    State(state): State<AppState>,
    Form(form): Form<SignupForm>,
) -> AppResult<Response> {
    let rerender = |errors: FormErrors| {
        Html(SignupTemplate {
            viewer: None,
            username: form.username.clone(),
            display_name: form.display_name.clone(),
            errors,
        })
        .into_response()
    };

    if let Err(errors) = form.clean() {
        return Ok(rerender(errors));
    }

    let password_hash =
        hash_password_async(form.password.clone(), state.config.auth.bcrypt_cost).await?;
    let user = match state
        .repo
        .create_user(form.username.trim(), form.display_name(), &password_hash)
        .await
    {
        Ok(user) => user,
        Err(RepositoryError::Conflict(_)) => {
            let mut errors = FormErrors::default();
            errors.add("username", "A user with that username already exists.");
            return Ok(rerender(errors));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!("New account: {}", user.username);
    let token = session::create_session(&state.db, user.id, state.config.auth.session_hours)?;
    Ok(signed_in(&state, &token, "/"))
}

// -- Login handlers --

/// GET /auth/login/: render login page
pub async fn login_page(
    MaybeUser(user): MaybeUser,
    Query(query): Query<LoginQuery>,
) -> AppResult<Response> {
    let next = query.next.unwrap_or_default();
    if user.is_some() {
        return Ok(Redirect::to(safe_next(&next)).into_response());
    }

    Ok(Html(LoginTemplate {
        viewer: None,
        username: String::new(),
        next,
        error: None,
    })
    .into_response())
}

/// POST /auth/login/: check credentials and start a session
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let user = state.repo.find_user_by_username(form.username.trim()).await?;
    let verified = match &user {
        Some(user) => {
            verify_password_async(form.password.clone(), user.password_hash.clone()).await?
        }
        None => false,
    };

    let user = match user {
        Some(user) if verified => user,
        _ => {
            tracing::warn!("Failed login for {}", form.username.trim());
            return Ok(Html(LoginTemplate {
                viewer: None,
                username: form.username,
                next: form.next,
                error: Some("Please enter a correct username and password.".to_string()),
            })
            .into_response());
        }
    };

    let token = session::create_session(&state.db, user.id, state.config.auth.session_hours)?;
    Ok(signed_in(&state, &token, safe_next(&form.next)))
}

/// POST /auth/logout/: end the session
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let cookie_name = &state.config.auth.cookie_name;
    if let Some(token) = session_token(&headers, cookie_name) {
        session::delete_session(&state.db, token)?;
    }

    Ok((
        [(header::SET_COOKIE, session::clear_session_cookie(cookie_name))],
        Redirect::to("/"),
    )
        .into_response())
}
