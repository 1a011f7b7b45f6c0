//! Media uploads kept on the local filesystem.

use crate::config::CONFIG;
use crate::core::errors::ObjectStoreError;
use crate::core::traits::ObjectStore;
use crate::infrastructure::entities::{MediaKind, MediaRef};
use async_trait::async_trait;
use di::{inject, injectable};
use log::debug;
use std::path::PathBuf;
use tokio::fs;
use uuid::Uuid;

pub struct LocalObjectStore {
    base_path: PathBuf,
    base_url: String,
    max_size: usize,
}

#[injectable(ObjectStore)]
impl LocalObjectStore {
    #[inject]
    pub fn create() -> LocalObjectStore {
        LocalObjectStore::new(
            CONFIG.media_dir.clone(),
            CONFIG.media_base_url.clone(),
            CONFIG.max_media_bytes,
        )
    }
}

impl LocalObjectStore {
    pub fn new(base_path: PathBuf, base_url: String, max_size: usize) -> LocalObjectStore {
        LocalObjectStore {
            base_path,
            base_url: base_url.trim_end_matches('/').to_owned(),
            max_size,
        }
    }
}

/// File extension for an accepted content type.
fn extension_for(content_type: &str) -> &str {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    match essence {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/heic" => "heic",
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "video/webm" => "webm",
        _ => "bin",
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, bytes: &[u8], content_type: &str) -> Result<MediaRef, ObjectStoreError> {
        let kind = MediaKind::from_content_type(content_type)
            .ok_or_else(|| ObjectStoreError::UnsupportedType(content_type.to_owned()))?;
        if bytes.is_empty() {
            return Err(ObjectStoreError::Empty);
        }
        if bytes.len() > self.max_size {
            return Err(ObjectStoreError::TooLarge {
                size: bytes.len(),
                max: self.max_size,
            });
        }

        fs::create_dir_all(&self.base_path).await?;
        let file_name = format!("{}.{}", Uuid::new_v4(), extension_for(content_type));
        fs::write(self.base_path.join(&file_name), bytes).await?;
        debug!("Stored {} bytes as {file_name}", bytes.len());

        Ok(MediaRef {
            url: format!("{}/{}", self.base_url, file_name),
            kind,
        })
    }
}
