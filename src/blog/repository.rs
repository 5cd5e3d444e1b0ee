// Repository pattern - every query the blog runs lives here
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use thiserror::Error;

use crate::blog::domain::*;
use crate::db::models::{Comment, Follow, Group, Post, User};
use crate::state::DbPool;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Typed access to users, groups, posts, comments and follow edges.
#[async_trait]
pub trait BlogRepository: Send + Sync {
    async fn create_user(
        &self,
        username: &str,
        display_name: Option<&str>,
        password_hash: &str,
    ) -> Result<User, RepositoryError>;

    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn find_user_by_username(&self, username: &str)
        -> Result<Option<User>, RepositoryError>;

    async fn create_group(
        &self,
        title: &str,
        slug: &str,
        description: &str,
    ) -> Result<Group, RepositoryError>;

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<Group>, RepositoryError>;

    async fn list_groups(&self) -> Result<Vec<Group>, RepositoryError>;

    async fn create_post(
        &self,
        post: &NewPost,
        created_at: DateTime<Utc>,
    ) -> Result<PostId, RepositoryError>;

    /// Returns false when no post has that id. `created_at` is never touched.
    async fn update_post(&self, id: PostId, changes: &PostChanges)
        -> Result<bool, RepositoryError>;

    async fn find_post(&self, id: PostId) -> Result<Option<Post>, RepositoryError>;

    async fn find_post_summary(&self, id: PostId)
        -> Result<Option<PostSummary>, RepositoryError>;

    async fn count_posts(&self, scope: FeedScope) -> Result<u64, RepositoryError>;

    /// Newest first; equal timestamps keep insertion order (earlier id first).
    async fn find_posts(
        &self,
        scope: FeedScope,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<PostSummary>, RepositoryError>;

    async fn create_comment(
        &self,
        post: PostId,
        author: UserId,
        text: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Comment, RepositoryError>;

    /// Oldest first.
    async fn find_comments(&self, post: PostId) -> Result<Vec<CommentView>, RepositoryError>;

    /// Inserts the edge unless it already exists. Returns true if a row was added.
    async fn insert_follow(&self, follower: UserId, author: UserId)
        -> Result<bool, RepositoryError>;

    /// Returns true if an edge was removed.
    async fn delete_follow(&self, follower: UserId, author: UserId)
        -> Result<bool, RepositoryError>;

    async fn find_follow(
        &self,
        follower: UserId,
        author: UserId,
    ) -> Result<Option<Follow>, RepositoryError>;

    async fn count_followers(&self, author: UserId) -> Result<u64, RepositoryError>;

    async fn count_following(&self, follower: UserId) -> Result<u64, RepositoryError>;
}

/// SQLite implementation
pub struct SqliteBlogRepository {
    pool: DbPool,
}

impl SqliteBlogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const POST_SELECT: &str = "
    SELECT p.id, p.text, p.created_at, p.image,
           u.id, u.username, u.display_name,
           g.id, g.title, g.slug,
           (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id)
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN groups g ON g.id = p.group_id";

/// WHERE clause for a feed scope plus the value bound to its placeholder.
fn scope_filter(scope: FeedScope) -> (&'static str, Option<i64>) {
    match scope {
        FeedScope::Global => ("1 = 1", None),
        FeedScope::Group(group) => ("p.group_id = ?", Some(group.0)),
        FeedScope::Author(author) => ("p.author_id = ?", Some(author.0)),
        FeedScope::Followed(follower) => (
            "p.author_id IN (SELECT f.author_id FROM follows f WHERE f.user_id = ?)",
            Some(follower.0),
        ),
    }
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    decode_timestamp(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("invalid timestamp: {raw}").into(),
        )
    })
}

fn post_summary_from_row(row: &Row<'_>) -> rusqlite::Result<PostSummary> {
    let group = match row.get::<_, Option<i64>>(7)? {
        Some(id) => Some(GroupRef {
            id: GroupId(id),
            title: row.get(8)?,
            slug: row.get(9)?,
        }),
        None => None,
    };

    Ok(PostSummary {
        id: PostId(row.get(0)?),
        text: row.get(1)?,
        created_at: timestamp_column(row, 2)?,
        image: row.get(3)?,
        author: AuthorRef {
            id: UserId(row.get(4)?),
            username: row.get(5)?,
            display_name: row.get(6)?,
        },
        group,
        comment_count: row.get(10)?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(row.get(0)?),
        username: row.get(1)?,
        display_name: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: timestamp_column(row, 4)?,
    })
}

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: GroupId(row.get(0)?),
        title: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl BlogRepository for SqliteBlogRepository {
    async fn create_user(
        &self,
        username: &str,
        display_name: Option<&str>,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let conn = self.pool.get()?;
        let created_at = Utc::now();

        let inserted = conn.execute(
            "INSERT INTO users (username, display_name, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                username,
                display_name,
                password_hash,
                encode_timestamp(&created_at)
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => {
                return Err(RepositoryError::Conflict(format!(
                    "username {username} is taken"
                )))
            }
            Err(e) => return Err(e.into()),
        }

        Ok(User {
            id: UserId(conn.last_insert_rowid()),
            username: username.to_string(),
            display_name: display_name.map(str::to_string),
            password_hash: password_hash.to_string(),
            created_at,
        })
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let conn = self.pool.get()?;
        let user = conn
            .query_row(
                "SELECT id, username, display_name, password_hash, created_at
                 FROM users WHERE id = ?1",
                params![id.0],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let conn = self.pool.get()?;
        let user = conn
            .query_row(
                "SELECT id, username, display_name, password_hash, created_at
                 FROM users WHERE username = ?1",
                params![username],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    async fn create_group(
        &self,
        title: &str,
        slug: &str,
        description: &str,
    ) -> Result<Group, RepositoryError> {
        let conn = self.pool.get()?;
        match conn.execute(
            "INSERT INTO groups (title, slug, description) VALUES (?1, ?2, ?3)",
            params![title, slug, description],
        ) {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => {
                return Err(RepositoryError::Conflict(format!("slug {slug} is taken")))
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Group {
            id: GroupId(conn.last_insert_rowid()),
            title: title.to_string(),
            slug: slug.to_string(),
            description: description.to_string(),
        })
    }

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<Group>, RepositoryError> {
        let conn = self.pool.get()?;
        let group = conn
            .query_row(
                "SELECT id, title, slug, description FROM groups WHERE slug = ?1",
                params![slug],
                group_from_row,
            )
            .optional()?;
        Ok(group)
    }

    async fn list_groups(&self) -> Result<Vec<Group>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt =
            conn.prepare("SELECT id, title, slug, description FROM groups ORDER BY title, id")?;
        let groups = stmt
            .query_map([], group_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(groups)
    }

    async fn create_post(
        &self,
        post: &NewPost,
        created_at: DateTime<Utc>,
    ) -> Result<PostId, RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO posts (text, created_at, author_id, group_id, image)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                post.text,
                encode_timestamp(&created_at),
                post.author.0,
                post.group.map(|g| g.0),
                post.image
            ],
        )?;
        Ok(PostId(conn.last_insert_rowid()))
    }

    async fn update_post(
        &self,
        id: PostId,
        changes: &PostChanges,
    ) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE posts SET text = ?1, group_id = ?2, image = COALESCE(?3, image)
             WHERE id = ?4",
            params![
                changes.text,
                changes.group.map(|g| g.0),
                changes.image,
                id.0
            ],
        )?;
        Ok(rows > 0)
    }

    async fn find_post(&self, id: PostId) -> Result<Option<Post>, RepositoryError> {
        let conn = self.pool.get()?;
        let post = conn
            .query_row(
                "SELECT id, text, created_at, author_id, group_id, image
                 FROM posts WHERE id = ?1",
                params![id.0],
                |row| {
                    Ok(Post {
                        id: PostId(row.get(0)?),
                        text: row.get(1)?,
                        created_at: timestamp_column(row, 2)?,
                        author_id: UserId(row.get(3)?),
                        group_id: row.get::<_, Option<i64>>(4)?.map(GroupId),
                        image: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(post)
    }

    async fn find_post_summary(
        &self,
        id: PostId,
    ) -> Result<Option<PostSummary>, RepositoryError> {
        let conn = self.pool.get()?;
        let sql = format!("{POST_SELECT} WHERE p.id = ?1");
        let post = conn
            .query_row(&sql, params![id.0], post_summary_from_row)
            .optional()?;
        Ok(post)
    }

    async fn count_posts(&self, scope: FeedScope) -> Result<u64, RepositoryError> {
        let conn = self.pool.get()?;
        let (clause, value) = scope_filter(scope);
        let sql = format!("SELECT COUNT(*) FROM posts p WHERE {clause}");
        let count: i64 = conn.query_row(&sql, params_from_iter(value.iter()), |row| row.get(0))?;
        Ok(count as u64)
    }

    async fn find_posts(
        &self,
        scope: FeedScope,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<PostSummary>, RepositoryError> {
        let conn = self.pool.get()?;
        let (clause, value) = scope_filter(scope);
        let sql = format!(
            "{POST_SELECT} WHERE {clause} ORDER BY p.created_at DESC, p.id ASC LIMIT ? OFFSET ?"
        );

        let mut values: Vec<i64> = value.into_iter().collect();
        values.push(limit as i64);
        values.push(offset as i64);

        let mut stmt = conn.prepare(&sql)?;
        let posts = stmt
            .query_map(params_from_iter(values.iter()), post_summary_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    async fn create_comment(
        &self,
        post: PostId,
        author: UserId,
        text: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Comment, RepositoryError> {
        let conn = self.pool.get()?;
        match conn.execute(
            "INSERT INTO comments (post_id, author_id, text, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![post.0, author.0, text, encode_timestamp(&created_at)],
        ) {
            Ok(_) => {}
            // Foreign key failure: the post vanished between lookup and insert.
            Err(e) if is_constraint_violation(&e) => {
                return Err(RepositoryError::NotFound(format!("post {post}")))
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Comment {
            id: conn.last_insert_rowid(),
            post_id: post,
            author_id: author,
            text: text.to_string(),
            created_at,
        })
    }

    async fn find_comments(&self, post: PostId) -> Result<Vec<CommentView>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.text, c.created_at, u.id, u.username, u.display_name
             FROM comments c
             JOIN users u ON u.id = c.author_id
             WHERE c.post_id = ?1
             ORDER BY c.created_at ASC, c.id ASC",
        )?;

        let comments = stmt
            .query_map(params![post.0], |row| {
                Ok(CommentView {
                    id: row.get(0)?,
                    text: row.get(1)?,
                    created_at: timestamp_column(row, 2)?,
                    author: AuthorRef {
                        id: UserId(row.get(3)?),
                        username: row.get(4)?,
                        display_name: row.get(5)?,
                    },
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    async fn insert_follow(
        &self,
        follower: UserId,
        author: UserId,
    ) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        // OR IGNORE lets the UNIQUE and CHECK constraints absorb racing duplicates.
        let rows = conn.execute(
            "INSERT OR IGNORE INTO follows (user_id, author_id) VALUES (?1, ?2)",
            params![follower.0, author.0],
        )?;
        Ok(rows > 0)
    }

    async fn delete_follow(
        &self,
        follower: UserId,
        author: UserId,
    ) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "DELETE FROM follows WHERE user_id = ?1 AND author_id = ?2",
            params![follower.0, author.0],
        )?;
        Ok(rows > 0)
    }

    async fn find_follow(
        &self,
        follower: UserId,
        author: UserId,
    ) -> Result<Option<Follow>, RepositoryError> {
        let conn = self.pool.get()?;
        let follow = conn
            .query_row(
                "SELECT id, user_id, author_id FROM follows WHERE user_id = ?1 AND author_id = ?2",
                params![follower.0, author.0],
                |row| {
                    Ok(Follow {
                        id: row.get(0)?,
                        user_id: UserId(row.get(1)?),
                        author_id: UserId(row.get(2)?),
                    })
                },
            )
            .optional()?;
        Ok(follow)
    }

    async fn count_followers(&self, author: UserId) -> Result<u64, RepositoryError> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM follows WHERE author_id = ?1",
            params![author.0],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    async fn count_following(&self, follower: UserId) -> Result<u64, RepositoryError> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM follows WHERE user_id = ?1",
            params![follower.0],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
