//! Product image storage on the local filesystem.
//!
//! Files land in `<upload_dir>/products/<uuid>.<ext>` and are served from
//! `/uploads/products/...`. The database stores the path relative to the
//! upload directory.

use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

/// Subdirectory for product images.
const PRODUCTS_DIR: &str = "products";

/// Errors from storing or removing uploads.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file is empty")]
    Empty,

    #[error("file exceeds {max} bytes")]
    TooLarge { max: usize },

    #[error("unsupported image type; use JPEG, PNG or WebP")]
    UnsupportedType,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Accepted image formats, detected from file contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
}

impl ImageKind {
    /// Sniff the format from magic bytes. The client's content type is ignored.
    #[must_use]
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if bytes.len() >= 12
            && bytes.starts_with(b"RIFF")
            && bytes.get(8..12) == Some(b"WEBP".as_slice())
        {
            Some(Self::Webp)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }
}

/// Stores and deletes uploaded files under a root directory.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate and write a product image. Returns the relative path to store.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Empty`, `TooLarge` or `UnsupportedType` for bad
    /// input, and `UploadError::Io` if the file cannot be written.
    pub async fn save_product_image(&self, bytes: &[u8]) -> Result<String, UploadError> {
        let kind = self.validate(bytes)?;

        let dir = self.root.join(PRODUCTS_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let relative = format!("{PRODUCTS_DIR}/{}.{}", Uuid::new_v4(), kind.extension());
        tokio::fs::write(self.root.join(&relative), bytes).await?;

        tracing::info!(path = %relative, size = bytes.len(), "Stored product image");
        Ok(relative)
    }

    /// Remove a stored file. A file that is already gone is not an error.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Io` for failures other than not-found.
    pub async fn remove(&self, relative: &str) -> Result<(), UploadError> {
        // Only paths this store produced are removable.
        if relative.contains("..") || Path::new(relative).is_absolute() {
            tracing::warn!(path = %relative, "Refusing to remove path outside upload dir");
            return Ok(());
        }
        match tokio::fs::remove_file(self.root.join(relative)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn validate(&self, bytes: &[u8]) -> Result<ImageKind, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        if bytes.len() > self.max_bytes {
            return Err(UploadError::TooLarge {
                max: self.max_bytes,
            });
        }
        ImageKind::detect(bytes).ok_or(UploadError::UnsupportedType)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("solarshop-uploads-{}", Uuid::new_v4()))
    }

    #[test]
    fn test_detect_formats() {
        assert_eq!(ImageKind::detect(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::detect(PNG), Some(ImageKind::Png));
        assert_eq!(
            ImageKind::detect(b"RIFF\x10\0\0\0WEBPVP8 "),
            Some(ImageKind::Webp)
        );
        assert_eq!(ImageKind::detect(b"GIF89a"), None);
        assert_eq!(ImageKind::detect(b"RIFF"), None);
    }

    #[test]
    fn test_validate_limits() {
        let store = UploadStore::new(temp_root(), 8);
        assert!(matches!(store.validate(b""), Err(UploadError::Empty)));
        assert!(matches!(
            store.validate(PNG),
            Err(UploadError::TooLarge { max: 8 })
        ));
        assert!(matches!(
            UploadStore::new(temp_root(), 1024).validate(b"plain text"),
            Err(UploadError::UnsupportedType)
        ));
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let root = temp_root();
        let store = UploadStore::new(&root, 1024);

        let path = store.save_product_image(PNG).await.unwrap();
        assert!(path.starts_with("products/"));
        assert!(path.ends_with(".png"));
        assert!(root.join(&path).exists());

        store.remove(&path).await.unwrap();
        assert!(!root.join(&path).exists());
        // Second removal is a no-op.
        store.remove(&path).await.unwrap();

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
