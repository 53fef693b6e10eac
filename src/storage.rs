//! Avatar image files on local disk.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::tokens::random_string;

/// Subdirectory of the upload dir holding profile images.
pub const PROFILE_DIR: &str = "profile";

/// Avatars must be strictly smaller than this.
pub const MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;

const AVATAR_NAME_LENGTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

/// Detect JPEG or PNG content from its magic bytes.
pub fn detect_image(bytes: &[u8]) -> Option<ImageKind> {
    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];

    if bytes.starts_with(PNG) {
        Some(ImageKind::Png)
    } else if bytes.starts_with(JPEG) {
        Some(ImageKind::Jpeg)
    } else {
        None
    }
}

#[derive(Clone)]
pub struct AvatarStorage {
    profile_dir: PathBuf,
}

impl AvatarStorage {
    pub fn new(upload_dir: impl AsRef<Path>) -> Self {
        Self {
            profile_dir: upload_dir.as_ref().join(PROFILE_DIR),
        }
    }

    pub fn profile_dir(&self) -> &Path {
        &self.profile_dir
    }

    /// Create the upload and profile directories if missing.
    pub async fn create_folders(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.profile_dir).await
    }

    /// Write an avatar under a fresh random name and return the name.
    pub async fn save(&self, bytes: &[u8]) -> std::io::Result<String> {
        let filename = random_string(AVATAR_NAME_LENGTH);
        tokio::fs::write(self.profile_dir.join(&filename), bytes).await?;
        Ok(filename)
    }

    /// Remove an avatar file. A missing file is only logged.
    pub async fn delete(&self, filename: &str) {
        if filename.contains(['/', '\\']) || filename.starts_with('.') {
            warn!(filename, "Refusing to delete suspicious avatar name");
            return;
        }
        if let Err(e) = tokio::fs::remove_file(self.profile_dir.join(filename)).await {
            warn!(filename, error = %e, "Failed to delete avatar");
        }
    }
}
