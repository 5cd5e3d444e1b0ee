use crate::blog::domain::UserId;
use crate::blog::repository::{BlogRepository, RepositoryError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    SelfFollow,
    AlreadyFollowing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfollowOutcome {
    Removed,
    NotFollowing,
}

/// Subscribe `follower` to `author`. Following yourself or following twice
/// changes nothing.
pub async fn follow(
    repo: &dyn BlogRepository,
    follower: UserId,
    author: UserId,
) -> Result<FollowOutcome, RepositoryError> {
    if follower == author {
        return Ok(FollowOutcome::SelfFollow);
    }

    if repo.insert_follow(follower, author).await? {
        tracing::info!("User {} now follows {}", follower, author);
        Ok(FollowOutcome::Created)
    } else {
        Ok(FollowOutcome::AlreadyFollowing)
    }
}

pub async fn unfollow(
    repo: &dyn BlogRepository,
    follower: UserId,
    author: UserId,
) -> Result<UnfollowOutcome, RepositoryError> {
    if repo.delete_follow(follower, author).await? {
        tracing::info!("User {} unfollowed {}", follower, author);
        Ok(UnfollowOutcome::Removed)
    } else {
        Ok(UnfollowOutcome::NotFollowing)
    }
}

pub async fn is_following(
    repo: &dyn BlogRepository,
    follower: UserId,
    author: UserId,
) -> Result<bool, RepositoryError> {
    Ok(repo.find_follow(follower, author).await?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blog::repository::SqliteBlogRepository;
    use crate::db;

    async fn setup() -> (SqliteBlogRepository, UserId, UserId) {
        let pool = db::memory_pool().unwrap();
        db::run_migrations(&pool).unwrap();
        let repo = SqliteBlogRepository::new(pool);
        let reader = repo.create_user("reader", None, "hash").await.unwrap();
        let writer = repo.create_user("writer", None, "hash").await.unwrap();
        (repo, reader.id, writer.id)
    }

    #[tokio::test]
    async fn follow_creates_edge() {
        let (repo, reader, writer) = setup().await;
        assert_eq!(
            follow(&repo, reader, writer).await.unwrap(),
            FollowOutcome::Created
        );
        assert!(is_following(&repo, reader, writer).await.unwrap());
        // Edges are directed.
        assert!(!is_following(&repo, writer, reader).await.unwrap());
    }

    #[tokio::test]
    async fn follow_twice_leaves_one_edge() {
        let (repo, reader, writer) = setup().await;
        follow(&repo, reader, writer).await.unwrap();
        assert_eq!(
            follow(&repo, reader, writer).await.unwrap(),
            FollowOutcome::AlreadyFollowing
        );
        assert_eq!(repo.count_followers(writer).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn self_follow_never_creates_edge() {
        let (repo, reader, _) = setup().await;
        assert_eq!(
            follow(&repo, reader, reader).await.unwrap(),
            FollowOutcome::SelfFollow
        );
        assert!(!is_following(&repo, reader, reader).await.unwrap());
        assert_eq!(repo.count_following(reader).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unfollow_missing_edge_is_noop() {
        let (repo, reader, writer) = setup().await;
        assert_eq!(
            unfollow(&repo, reader, writer).await.unwrap(),
            UnfollowOutcome::NotFollowing
        );
        assert_eq!(repo.count_following(reader).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unfollow_removes_edge() {
        let (repo, reader, writer) = setup().await;
        follow(&repo, reader, writer).await.unwrap();
        assert_eq!(
            unfollow(&repo, reader, writer).await.unwrap(),
            UnfollowOutcome::Removed
        );
        assert!(!is_following(&repo, reader, writer).await.unwrap());
    }
}
