//! Media file storage: product images and user avatars.
//!
//! Uploads land beneath `MEDIA_ROOT` under a per-kind prefix (`products/`
//! or `avatars/`) with uuid filenames, and are served read-only at
//! `/media/*` by the router's `ServeDir`.

use std::path::Path;

use uuid::Uuid;

/// Image extensions accepted for product images and avatars.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Path prefix for product images.
pub const PRODUCTS_PREFIX: &str = "products";

/// Path prefix for user avatars.
pub const AVATARS_PREFIX: &str = "avatars";

/// Error type for media storage failures.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// The uploaded filename has no accepted image extension.
    #[error("Unsupported file extension: {0}")]
    UnsupportedExtension(String),

    /// Filesystem failure while storing the upload.
    #[error("Media I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Store an uploaded file and return its media-relative path
/// (e.g. `avatars/4bd0….png`).
///
/// The extension is taken from the original filename and checked against
/// the accepted image extensions; the stored name is a fresh uuid so
/// uploads can never collide or traverse paths.
pub async fn save_upload(
    media_root: &Path,
    prefix: &str,
    original_filename: &str,
    data: &[u8],
) -> Result<String, MediaError> {
    let ext = original_filename
        .rsplit('.')
        .next()
        .unwrap_or("")
        .to_lowercase();
    if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(MediaError::UnsupportedExtension(ext));
    }

    let dir = media_root.join(prefix);
    tokio::fs::create_dir_all(&dir).await?;

    let filename = format!("{}.{ext}", Uuid::new_v4());
    tokio::fs::write(dir.join(&filename), data).await?;

    Ok(format!("{prefix}/{filename}"))
}

/// Public URL for a stored media path.
pub fn public_url(base_url: &str, media_path: &str) -> String {
    format!("{base_url}/media/{media_path}")
}
