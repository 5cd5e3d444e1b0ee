/// End-to-end tests against a real server bound to an ephemeral port.
use chrono::Utc;
use reqwest::header::{COOKIE, LOCATION, SET_COOKIE};
use reqwest::{multipart, Client, Response, StatusCode};
use tempfile::TempDir;
use yatube::auth::session;
use yatube::blog::domain::{NewPost, PostId};
use yatube::blog::BlogRepository;
use yatube::config::Config;
use yatube::db;
use yatube::db::models::User;
use yatube::routes;
use yatube::state::AppState;

struct TestServer {
    _dir: TempDir,
    base: String,
    state: AppState,
    client: Client,
}

impl TestServer {
    async fn start(index_ttl_secs: u64) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.auth.bcrypt_cost = 4;
        config.cache.index_ttl_secs = index_ttl_secs;
        config.resolve_paths(dir.path());

        let pool = db::create_pool(&config.db_path()).expect("Failed to create test database");
        db::run_migrations(&pool).expect("Failed to run migrations");
        let state = AppState::new(pool, config);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = routes::app(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        Self {
            _dir: dir,
            base: format!("http://{}", addr),
            state,
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn user(&self, username: &str) -> User {
        self.state
            .repo
            .create_user(username, None, "not-a-real-hash")
            .await
            .unwrap()
    }

    /// Cookie header value for a fresh session of `user`.
    fn login(&self, user: &User) -> String {
        let token = session::create_session(&self.state.db, user.id, 1).unwrap();
        format!("{}={}", self.state.config.auth.cookie_name, token)
    }

    async fn post(&self, user: &User, text: &str) -> PostId {
        self.state
            .repo
            .create_post(
                &NewPost {
                    author: user.id,
                    text: text.to_string(),
                    group: None,
                    image: None,
                },
                Utc::now(),
            )
            .await
            .unwrap()
    }

    async fn get(&self, path: &str, cookie: Option<&str>) -> Response {
        let mut request = self.client.get(self.url(path));
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        request.send().await.unwrap()
    }
}

fn location(response: &Response) -> &str {
    response.headers()[LOCATION].to_str().unwrap()
}

#[tokio::test]
async fn index_lists_posts_for_anonymous_visitors() {
    let server = TestServer::start(0).await;
    let leo = server.user("leo").await;
    server.post(&leo, "War and Peace draft").await;

    let response = server.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("War and Peace draft"));
    assert!(body.contains("/auth/login/"));
}

#[tokio::test]
async fn unknown_pages_are_404() {
    let server = TestServer::start(0).await;
    for path in [
        "/group/nowhere/",
        "/profile/ghost/",
        "/posts/999/",
        "/posts/not-a-number/",
        "/unexisting_page/",
    ] {
        let response = server.get(path, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
    }
}

#[tokio::test]
async fn protected_pages_redirect_to_login_with_next() {
    let server = TestServer::start(0).await;
    let leo = server.user("leo").await;
    let id = server.post(&leo, "some text").await;

    let response = server.get("/create/", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login/?next=%2Fcreate%2F");

    let response = server.get(&format!("/posts/{id}/edit/"), None).await;
    assert_eq!(
        location(&response),
        format!("/auth/login/?next=%2Fposts%2F{id}%2Fedit%2F")
    );

    let response = server.get("/follow/", None).await;
    assert_eq!(location(&response), "/auth/login/?next=%2Ffollow%2F");
}

#[tokio::test]
async fn creating_a_post_redirects_to_profile() {
    let server = TestServer::start(0).await;
    let leo = server.user("leo").await;
    let cookie = server.login(&leo);
    let group = server
        .state
        .repo
        .create_group("Writers", "writers", "")
        .await
        .unwrap();

    let form = multipart::Form::new()
        .text("text", "A fresh post")
        .text("group", group.id.to_string());
    let response = server
        .client
        .post(server.url("/create/"))
        .header(COOKIE, &cookie)
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/leo/");

    let body = server.get("/group/writers/", None).await.text().await.unwrap();
    assert!(body.contains("A fresh post"));
}

#[tokio::test]
async fn invalid_post_form_is_shown_again() {
    let server = TestServer::start(0).await;
    let leo = server.user("leo").await;
    let cookie = server.login(&leo);

    let form = multipart::Form::new().text("text", "   ").text("group", "");
    let response = server
        .client
        .post(server.url("/create/"))
        .header(COOKIE, &cookie)
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("Post text is required."));
    assert_eq!(
        server
            .state
            .repo
            .count_posts(yatube::blog::domain::FeedScope::Global)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn uploaded_image_is_served_from_media() {
    let server = TestServer::start(0).await;
    let leo = server.user("leo").await;
    let cookie = server.login(&leo);

    let png = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    let image = multipart::Part::bytes(png.clone())
        .file_name("small.png")
        .mime_str("image/png")
        .unwrap();
    let form = multipart::Form::new()
        .text("text", "With a picture")
        .part("image", image);
    let response = server
        .client
        .post(server.url("/create/"))
        .header(COOKIE, &cookie)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let page = server
        .state
        .repo
        .find_posts(yatube::blog::domain::FeedScope::Global, 10, 0)
        .await
        .unwrap();
    let stored = page[0].image.clone().expect("image path stored");
    assert!(stored.starts_with("posts/") && stored.ends_with(".png"));

    let response = server.get(&format!("/media/{stored}"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");
    assert_eq!(response.bytes().await.unwrap().to_vec(), png);
}

#[tokio::test]
async fn only_the_author_can_edit() {
    let server = TestServer::start(0).await;
    let leo = server.user("leo").await;
    let intruder = server.user("intruder").await;
    let id = server.post(&leo, "original text").await;

    let response = server
        .get(&format!("/posts/{id}/edit/"), Some(&server.login(&intruder)))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/posts/{id}/"));

    let form = multipart::Form::new().text("text", "hijacked");
    let response = server
        .client
        .post(server.url(&format!("/posts/{id}/edit/")))
        .header(COOKIE, server.login(&intruder))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), format!("/posts/{id}/"));
    let post = server.state.repo.find_post(id).await.unwrap().unwrap();
    assert_eq!(post.text, "original text");

    let form = multipart::Form::new().text("text", "revised text");
    let response = server
        .client
        .post(server.url(&format!("/posts/{id}/edit/")))
        .header(COOKIE, server.login(&leo))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), format!("/posts/{id}/"));
    let edited = server.state.repo.find_post(id).await.unwrap().unwrap();
    assert_eq!(edited.text, "revised text");
    assert_eq!(edited.created_at, post.created_at);
}

#[tokio::test]
async fn comments_need_a_login_and_text() {
    let server = TestServer::start(0).await;
    let leo = server.user("leo").await;
    let reader = server.user("reader").await;
    let id = server.post(&leo, "discuss me").await;
    let path = format!("/posts/{id}/comment/");

    let response = server
        .client
        .post(server.url(&path))
        .form(&[("text", "anonymous words")])
        .send()
        .await
        .unwrap();
    assert!(location(&response).starts_with("/auth/login/?next="));

    let cookie = server.login(&reader);
    let response = server
        .client
        .post(server.url(&path))
        .header(COOKIE, &cookie)
        .form(&[("text", "Nice post")])
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), format!("/posts/{id}/"));

    let response = server
        .client
        .post(server.url(&path))
        .header(COOKIE, &cookie)
        .form(&[("text", "  ")])
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), format!("/posts/{id}/?comment=invalid"));

    let comments = server.state.repo.find_comments(id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].text, "Nice post");

    let body = server
        .get(&format!("/posts/{id}/?comment=invalid"), Some(&cookie))
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("Nice post"));
    assert!(body.contains("Comment text is required."));
}

#[tokio::test]
async fn follow_and_unfollow_through_profile() {
    let server = TestServer::start(0).await;
    let author = server.user("author").await;
    let other = server.user("other").await;
    let reader = server.user("reader").await;
    server.post(&author, "words by the author").await;
    server.post(&other, "words by someone else").await;
    let cookie = server.login(&reader);

    let response = server.get("/profile/author/follow/", Some(&cookie)).await;
    assert_eq!(location(&response), "/follow/");

    let body = server.get("/follow/", Some(&cookie)).await.text().await.unwrap();
    assert!(body.contains("words by the author"));
    assert!(!body.contains("words by someone else"));

    // Following twice changes nothing.
    let response = server.get("/profile/author/follow/", Some(&cookie)).await;
    assert_eq!(location(&response), "/");
    assert_eq!(server.state.repo.count_followers(author.id).await.unwrap(), 1);

    // Nor does following yourself.
    let response = server.get("/profile/reader/follow/", Some(&cookie)).await;
    assert_eq!(location(&response), "/");
    assert_eq!(server.state.repo.count_following(reader.id).await.unwrap(), 1);

    let body = server
        .get("/profile/author/", Some(&cookie))
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("/profile/author/unfollow/"));

    let response = server.get("/profile/author/unfollow/", Some(&cookie)).await;
    assert_eq!(location(&response), "/profile/author/");
    let body = server.get("/follow/", Some(&cookie)).await.text().await.unwrap();
    assert!(!body.contains("words by the author"));
}

#[tokio::test]
async fn index_is_cached_until_posts_change() {
    let server = TestServer::start(60).await;
    let leo = server.user("leo").await;
    let cookie = server.login(&leo);
    server.post(&leo, "first post").await;

    let body = server.get("/", None).await.text().await.unwrap();
    assert!(body.contains("first post"));

    // Written straight to the store, so the cached page is still served.
    server.post(&leo, "sneaky post").await;
    let body = server.get("/", None).await.text().await.unwrap();
    assert!(!body.contains("sneaky post"));

    let form = multipart::Form::new().text("text", "posted through the site");
    server
        .client
        .post(server.url("/create/"))
        .header(COOKIE, &cookie)
        .multipart(form)
        .send()
        .await
        .unwrap();

    let body = server.get("/", None).await.text().await.unwrap();
    assert!(body.contains("sneaky post"));
    assert!(body.contains("posted through the site"));
}

#[tokio::test]
async fn zero_ttl_disables_the_index_cache() {
    let server = TestServer::start(0).await;
    let leo = server.user("leo").await;
    server.post(&leo, "first post").await;
    server.get("/", None).await;

    server.post(&leo, "second post").await;
    let body = server.get("/", None).await.text().await.unwrap();
    assert!(body.contains("second post"));
}

#[tokio::test]
async fn signup_then_login_round() {
    let server = TestServer::start(0).await;

    let response = server
        .client
        .post(server.url("/auth/signup/"))
        .form(&[
            ("username", "newbie"),
            ("display_name", "New Person"),
            ("password", "correct horse"),
            ("password_confirm", "correct horse"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(response.headers()[SET_COOKIE]
        .to_str()
        .unwrap()
        .starts_with("yatube_session="));

    let response = server
        .client
        .post(server.url("/auth/signup/"))
        .form(&[
            ("username", "newbie"),
            ("password", "another password"),
            ("password_confirm", "another password"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("already exists"));

    let response = server
        .client
        .post(server.url("/auth/login/"))
        .form(&[("username", "newbie"), ("password", "wrong password")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .text()
        .await
        .unwrap()
        .contains("Please enter a correct username and password."));

    let response = server
        .client
        .post(server.url("/auth/login/"))
        .form(&[
            ("username", "newbie"),
            ("password", "correct horse"),
            ("next", "/create/"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/create/");

    let cookie = response.headers()[SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    let body = server.get("/", Some(&cookie)).await.text().await.unwrap();
    assert!(body.contains("/profile/newbie/"));
}

#[tokio::test]
async fn about_pages_render() {
    let server = TestServer::start(0).await;
    for path in ["/about/author/", "/about/tech/"] {
        assert_eq!(server.get(path, None).await.status(), StatusCode::OK);
    }
}
