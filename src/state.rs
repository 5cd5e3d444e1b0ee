use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::blog::cache::PageCache;
use crate::blog::{BlogRepository, SqliteBlogRepository};
use crate::config::Config;
use crate::media::MediaStore;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub repo: Arc<dyn BlogRepository>,
    pub media: MediaStore,
    pub index_cache: PageCache,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> Self {
        let repo = Arc::new(SqliteBlogRepository::new(db.clone()));
        let media = MediaStore::new(config.media_path());
        let index_cache = PageCache::new(config.cache.index_ttl());
        Self {
            db,
            config,
            repo,
            media,
            index_cache,
        }
    }

    /// Drop cached index pages after post data changed.
    pub async fn invalidate_index(&self) {
        self.index_cache.clear();
    }
}
