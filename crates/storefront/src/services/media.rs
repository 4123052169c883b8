//! Local image storage for uploads.
//!
//! Files are written to `MEDIA_ROOT/<kind>/<uuid>.<ext>` and served under
//! `/media/`. The stored path (relative to the root) is what the database
//! keeps.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

use crate::config::MediaConfig;

/// URL prefix uploaded files are served from.
pub const MEDIA_URL_PREFIX: &str = "/media";

/// Errors from storing or removing an upload.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("uploaded file is empty")]
    Empty,

    #[error("uploaded file is larger than {max} bytes")]
    TooLarge { max: usize },

    #[error("only JPEG, PNG, GIF and WebP images are accepted")]
    UnsupportedType,

    #[error("invalid media path")]
    InvalidPath,

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What an upload is for; decides its directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Product,
    Category,
    ProfilePhoto,
    Review,
    ProductRequest,
}

impl MediaKind {
    #[must_use]
    pub const fn dir(self) -> &'static str {
        match self {
            Self::Product => "products",
            Self::Category => "categories",
            Self::ProfilePhoto => "profiles",
            Self::Review => "reviews",
            Self::ProductRequest => "requests",
        }
    }
}

/// Accepted image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl ImageFormat {
    /// Identify an image by its leading bytes.
    #[must_use]
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if data.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if data.len() >= 12 && data.starts_with(b"RIFF") && data.get(8..12) == Some(b"WEBP")
        {
            Some(Self::WebP)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::WebP => "webp",
        }
    }
}

/// Filesystem-backed media store.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    max_bytes: usize,
}

impl MediaStorage {
    #[must_use]
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            root: config.root.clone(),
            max_bytes: config.max_upload_bytes,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub const fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Check size and format without writing anything.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Empty`, `TooLarge` or `UnsupportedType`.
    pub fn validate(&self, data: &[u8]) -> Result<ImageFormat, StorageError> {
        if data.is_empty() {
            return Err(StorageError::Empty);
        }
        if data.len() > self.max_bytes {
            return Err(StorageError::TooLarge {
                max: self.max_bytes,
            });
        }
        ImageFormat::detect(data).ok_or(StorageError::UnsupportedType)
    }

    /// Validate and write an image. Returns its path relative to the root.
    ///
    /// # Errors
    ///
    /// Returns a validation error or `StorageError::Io` if the write fails.
    pub async fn store_image(&self, kind: MediaKind, data: &[u8]) -> Result<String, StorageError> {
        let format = self.validate(data)?;
        let relative = format!("{}/{}.{}", kind.dir(), Uuid::new_v4(), format.extension());
        let path = self.root.join(&relative);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;

        tracing::debug!(path = %relative, bytes = data.len(), "Stored upload");
        Ok(relative)
    }

    /// Remove a stored file. A file that is already gone is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` for paths that escape the root.
    pub async fn delete(&self, relative: &str) -> Result<(), StorageError> {
        let path = self.resolve(relative)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf, StorageError> {
        let candidate = Path::new(relative);
        let safe = !relative.is_empty()
            && candidate
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StorageError::InvalidPath);
        }
        Ok(self.root.join(candidate))
    }
}

/// Public URL of a stored path.
#[must_use]
pub fn media_url(relative: &str) -> String {
    format!("{MEDIA_URL_PREFIX}/{relative}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn storage(root: PathBuf, max: usize) -> MediaStorage {
        MediaStorage::new(&MediaConfig {
            root,
            max_upload_bytes: max,
        })
    }

    fn temp_root(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("bazaar-media-{name}-{}", Uuid::new_v4()))
    }

    #[test]
    fn test_detect_formats() {
        assert_eq!(ImageFormat::detect(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::detect(PNG), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::detect(b"GIF89a...."), Some(ImageFormat::Gif));
        assert_eq!(ImageFormat::detect(b"RIFF\0\0\0\0WEBPVP8 "), Some(ImageFormat::WebP));
        assert_eq!(ImageFormat::detect(b"RIFF\0\0\0\0WAVE"), None);
        assert_eq!(ImageFormat::detect(b"%PDF-1.7"), None);
    }

    #[test]
    fn test_validate_limits() {
        let store = storage(temp_root("validate"), 8);
        assert!(matches!(store.validate(b""), Err(StorageError::Empty)));
        assert!(matches!(
            store.validate(PNG),
            Err(StorageError::TooLarge { max: 8 })
        ));
        assert!(matches!(
            store.validate(b"hello"),
            Err(StorageError::UnsupportedType)
        ));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let store = storage(temp_root("resolve"), 1024);
        assert!(store.resolve("products/a.png").is_ok());
        assert!(store.resolve("../etc/passwd").is_err());
        assert!(store.resolve("/etc/passwd").is_err());
        assert!(store.resolve("").is_err());
    }

    #[tokio::test]
    async fn test_store_and_delete() {
        let root = temp_root("store");
        let store = storage(root.clone(), 1024);

        let relative = store.store_image(MediaKind::Product, PNG).await.unwrap();
        assert!(relative.starts_with("products/"));
        assert!(relative.ends_with(".png"));
        assert!(root.join(&relative).exists());
        assert_eq!(media_url(&relative), format!("/media/{relative}"));

        store.delete(&relative).await.unwrap();
        assert!(!root.join(&relative).exists());
        // Deleting twice is fine.
        store.delete(&relative).await.unwrap();

        let _ = std::fs::remove_dir_all(root);
    }
}
