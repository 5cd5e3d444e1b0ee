// Domain types shared by the repository, the feed composer and the pages
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::models::{Group, User, POST_LABEL_LENGTH};

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(UserId);
id_type!(GroupId);
id_type!(PostId);

/// Which posts belong to a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope {
    Global,
    Group(GroupId),
    Author(UserId),
    /// Posts by every author the given user follows.
    Followed(UserId),
}

/// Author columns joined onto posts and comments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorRef {
    pub id: UserId,
    pub username: String,
    pub display_name: Option<String>,
}

impl AuthorRef {
    pub fn full_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

impl From<&User> for AuthorRef {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRef {
    pub id: GroupId,
    pub title: String,
    pub slug: String,
}

impl From<&Group> for GroupRef {
    fn from(group: &Group) -> Self {
        Self {
            id: group.id,
            title: group.title.clone(),
            slug: group.slug.clone(),
        }
    }
}

/// A post as it appears in a listing or on its detail page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSummary {
    pub id: PostId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author: AuthorRef,
    pub group: Option<GroupRef>,
    pub image: Option<String>,
    pub comment_count: i64,
}

impl PostSummary {
    pub fn label(&self) -> String {
        self.text.chars().take(POST_LABEL_LENGTH).collect()
    }

    pub fn created_display(&self) -> String {
        format_date(&self.created_at)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author: AuthorRef,
}

impl CommentView {
    pub fn created_display(&self) -> String {
        format_date(&self.created_at)
    }
}

/// Fields for a post about to be inserted.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author: UserId,
    pub text: String,
    pub group: Option<GroupId>,
    pub image: Option<String>,
}

/// Editable fields of an existing post. `image: None` keeps the stored image.
#[derive(Debug, Clone)]
pub struct PostChanges {
    pub text: String,
    pub group: Option<GroupId>,
    pub image: Option<String>,
}

/// Storage representation of timestamps. Millisecond RFC 3339 in UTC sorts
/// lexically in chronological order.
pub fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn decode_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn format_date(ts: &DateTime<Utc>) -> String {
    ts.format("%-d %b %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_round_trip_through_storage_format() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let encoded = encode_timestamp(&ts);
        assert_eq!(encoded, "2024-03-09T07:05:01.000Z");
        assert_eq!(decode_timestamp(&encoded), Some(ts));
    }

    #[test]
    fn encoded_timestamps_sort_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2024, 9, 30, 23, 59, 59).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap();
        assert!(encode_timestamp(&earlier) < encode_timestamp(&later));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert_eq!(decode_timestamp("yesterday"), None);
    }

    #[test]
    fn author_full_name_falls_back_to_username() {
        let author = AuthorRef {
            id: UserId(1),
            username: "leo".into(),
            display_name: None,
        };
        assert_eq!(author.full_name(), "leo");
    }

    #[test]
    fn date_format_is_human_readable() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(format_date(&ts), "15 Jan 2025");
    }
}
