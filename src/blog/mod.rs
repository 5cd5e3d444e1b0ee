pub mod cache;
pub mod domain;
pub mod feed;
pub mod follow;
pub mod forms;
pub mod paginator;
pub mod repository;

pub use repository::{BlogRepository, RepositoryError, SqliteBlogRepository};
