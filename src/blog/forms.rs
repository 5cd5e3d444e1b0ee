use serde::Deserialize;

use crate::blog::domain::GroupId;
use crate::db::models::{Group, Post};

/// Upload size limit for post images.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Field-level validation messages, in the order they were found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormErrors {
    errors: Vec<(&'static str, String)>,
}

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push((field, message.into()));
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, message)| message.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    pub fn is_image(&self) -> bool {
        mime_guess::from_path(&self.filename)
            .first()
            .map(|mime| mime.type_() == mime_guess::mime::IMAGE)
            .unwrap_or(false)
    }

    /// Lower-cased file extension, if the name has one.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }
}

/// Submitted create/edit post form, before validation.
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub text: String,
    /// Raw value of the group select; empty means no group.
    pub group: Option<String>,
    pub image: Option<UploadedImage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanPost {
    pub text: String,
    pub group: Option<GroupId>,
}

impl PostForm {
    /// Prefill the form with a stored post for editing.
    pub fn from_post(post: &Post) -> Self {
        Self {
            text: post.text.clone(),
            group: post.group_id.map(|g| g.to_string()),
            image: None,
        }
    }

    pub fn selected_group(&self) -> Option<i64> {
        self.group.as_deref().and_then(|g| g.trim().parse().ok())
    }

    /// Validate against the groups that currently exist.
    pub fn clean(&self, groups: &[Group]) -> Result<CleanPost, FormErrors> {
        let mut errors = FormErrors::default();

        let text = self.text.trim();
        if text.is_empty() {
            errors.add("text", "Post text is required.");
        }

        let group = match self.group.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let found = raw
                    .parse::<i64>()
                    .ok()
                    .and_then(|id| groups.iter().find(|g| g.id.0 == id));
                match found {
                    Some(group) => Some(group.id),
                    None => {
                        errors.add("group", "Select a valid group.");
                        None
                    }
                }
            }
        };

        if let Some(image) = &self.image {
            if image.bytes.is_empty() {
                errors.add("image", "The submitted file is empty.");
            } else if image.bytes.len() > MAX_IMAGE_BYTES {
                errors.add("image", "The image is too large.");
            } else if !image.is_image() {
                errors.add("image", "Upload a valid image.");
            }
        }

        errors.into_result(CleanPost {
            text: text.to_string(),
            group,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

impl CommentForm {
    pub fn clean(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::default();
        let text = self.text.trim();
        if text.is_empty() {
            errors.add("text", "Comment text is required.");
        }
        errors.into_result(text.to_string())
    }
}
