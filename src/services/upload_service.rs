use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::utils::error::{AppError, AppResult};

/// An image written to the upload directory.
#[derive(Debug, Clone)]
pub struct StoredImage {
    /// Location on disk.
    pub path: PathBuf,
    /// Path clients use, e.g. `/uploads/profile-pictures/ana-1714550400000-<uuid>.png`.
    pub public_path: String,
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/svg+xml" => Some("svg"),
        "image/bmp" => Some("bmp"),
        "image/avif" => Some("avif"),
        _ => None,
    }
}

/// Writes `bytes` under `upload_root/subdir` with a randomized name.
pub async fn store_image(
    upload_root: &Path,
    subdir: Option<&str>,
    prefix: &str,
    content_type: Option<&str>,
    bytes: &[u8],
    max_bytes: usize,
) -> AppResult<StoredImage> {
    let content_type = content_type.unwrap_or_default();
    let extension = extension_for(content_type).ok_or_else(|| {
        AppError::UnsupportedMediaType("Only image files are allowed!".to_string())
    })?;

    if bytes.is_empty() {
        return Err(AppError::bad_request("No file uploaded"));
    }
    if bytes.len() > max_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "Image exceeds the {} byte limit",
            max_bytes
        )));
    }

    let dir = match subdir {
        Some(sub) => upload_root.join(sub),
        None => upload_root.to_path_buf(),
    };
    tokio::fs::create_dir_all(&dir).await?;

    let safe_prefix: String = prefix
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let file_name = format!(
        "{}-{}-{}.{}",
        safe_prefix,
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        extension
    );
    let path = dir.join(&file_name);
    tokio::fs::write(&path, bytes).await?;

    let public_path = match subdir {
        Some(sub) => format!("/uploads/{}/{}", sub, file_name),
        None => format!("/uploads/{}", file_name),
    };

    log::info!("🖼️  Stored upload {} ({} bytes)", public_path, bytes.len());
    Ok(StoredImage { path, public_path })
}

/// Best-effort removal of an upload, e.g. after the owning record could not be updated.
pub async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("⚠️  Could not remove upload {}: {}", path.display(), e);
        }
    }
}

/// Removes a previously stored image given its public `/uploads/...` path.
pub async fn discard_public(upload_root: &Path, public_path: &str) {
    let relative = match public_path.strip_prefix("/uploads/") {
        Some(rel) if !rel.is_empty() => rel,
        _ => return,
    };
    // never follow a stored path out of the upload directory
    if relative.split('/').any(|part| part == ".." || part.is_empty()) {
        log::warn!("⚠️  Refusing to remove suspicious upload path {}", public_path);
        return;
    }
    discard(&upload_root.join(relative)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_png_with_randomized_name() {
        let dir = tempfile::tempdir().unwrap();
        let stored = store_image(
            dir.path(),
            Some("profile-pictures"),
            "ana",
            Some("image/png"),
            b"\x89PNG fake",
            1024,
        )
        .await
        .unwrap();

        assert!(stored.public_path.starts_with("/uploads/profile-pictures/ana-"));
        assert!(stored.public_path.ends_with(".png"));
        assert!(stored.path.exists());

        discard_public(dir.path(), &stored.public_path).await;
        assert!(!stored.path.exists());
    }

    #[tokio::test]
    async fn rejects_non_images_and_oversized_bodies() {
        let dir = tempfile::tempdir().unwrap();

        let err = store_image(dir.path(), None, "event", Some("text/plain"), b"hi", 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMediaType(_)));

        let err = store_image(dir.path(), None, "event", Some("image/jpeg"), &[0u8; 32], 16)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));
    }

    #[tokio::test]
    async fn traversal_paths_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let outside = dir.path().join("keep.txt");
        std::fs::write(&outside, "x").unwrap();

        let uploads = dir.path().join("uploads");
        discard_public(&uploads, "/uploads/../keep.txt").await;
        assert!(outside.exists());
    }
}
