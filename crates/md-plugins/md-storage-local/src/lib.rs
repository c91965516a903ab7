//! # md-storage-local
//! Local filesystem implementation of `MediaStore`.
//! Features: Content-addressable storage, directory sharding, image sniffing.

use std::path::PathBuf;

use async_trait::async_trait;
use md_core::traits::{MediaStore, UnsupportedMedia};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::debug;

pub struct LocalMediaStore {
    /// Root directory for all uploads (e.g., "./data/media")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/media")
    url_prefix: String,
}

impl LocalMediaStore {
    pub fn new(root: PathBuf, url_prefix: String) -> Self {
        Self {
            root_path: root,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Sharded relative path: "ab/cd/abcdef...hash.ext"
    fn sharded_id(hash: &str, extension: &str) -> String {
        format!("{}/{}/{}.{}", &hash[0..2], &hash[2..4], hash, extension)
    }

    pub fn path_for(&self, media_id: &str) -> PathBuf {
        self.root_path.join(media_id)
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    /// Saves an upload using its SHA-256 hash as the filename.
    /// Identical uploads share one file.
    async fn save_upload(&self, data: Vec<u8>, content_type: &str) -> anyhow::Result<String> {
        // 1. Only accept bytes that look like an image, whatever the client claims
        let format = image::guess_format(&data)
            .map_err(|_| UnsupportedMedia(format!("upload declared as '{}' is not a recognised image", content_type)))?;
        let extension = format.extensions_str().first().copied().unwrap_or("bin");

        // 2. Calculate Hash
        let hash = format!("{:x}", Sha256::digest(&data));
        let media_id = Self::sharded_id(&hash, extension);
        let target_path = self.path_for(&media_id);

        // 3. Ensure directory exists
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // 4. Write once; identical content already has a file
        if !fs::try_exists(&target_path).await? {
            fs::write(&target_path, &data).await?;
            debug!(%media_id, bytes = data.len(), ?format, "stored upload");
        }

        Ok(media_id)
    }

    fn url_for(&self, media_id: &str) -> String {
        format!("{}/{}", self.url_prefix, media_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Smallest valid PNG signature plus IHDR start; enough for format sniffing.
    const PNG: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    ];

    #[tokio::test]
    async fn stores_image_under_sharded_hash() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::new(dir.path().to_path_buf(), "/media/".into());

        let id = store.save_upload(PNG.to_vec(), "image/png").await.unwrap();
        assert!(id.ends_with(".png"));
        assert_eq!(&id[0..2], &id[6..8]);
        assert!(store.path_for(&id).exists());
        assert_eq!(store.url_for(&id), format!("/media/{}", id));
    }

    #[tokio::test]
    async fn identical_uploads_share_an_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::new(dir.path().to_path_buf(), "/media".into());

        let a = store.save_upload(PNG.to_vec(), "image/png").await.unwrap();
        let b = store.save_upload(PNG.to_vec(), "application/octet-stream").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn rejects_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::new(dir.path().to_path_buf(), "/media".into());

        let err = store
            .save_upload(b"definitely not an image".to_vec(), "image/jpeg")
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<UnsupportedMedia>().is_some());
    }
}
