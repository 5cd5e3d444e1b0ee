use std::path::{Component, Path, PathBuf};

use crate::blog::forms::UploadedImage;

/// Filesystem storage for uploaded post images.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write an image under `posts/` with a fresh name. Returns the path
    /// relative to the media root, which is what posts store.
    pub async fn save_post_image(&self, image: &UploadedImage) -> std::io::Result<String> {
        let ext = image.extension().unwrap_or_else(|| "bin".to_string());
        let relative = format!("posts/{}.{}", uuid::Uuid::now_v7(), ext);
        let full = self.root.join(&relative);

        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, &image.bytes).await?;

        tracing::info!("Stored upload {} ({} bytes)", relative, image.bytes.len());
        Ok(relative)
    }

    /// Map a request path onto a file under the root. Anything that could
    /// escape the root is refused.
    pub fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let path = Path::new(relative);
        if relative.is_empty()
            || !path
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(path))
    }
}
