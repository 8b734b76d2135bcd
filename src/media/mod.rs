//! Uploaded media on disk, plus the external tools that inspect it

pub mod probe;
pub mod transcribe;

pub use probe::probe_duration;
pub use transcribe::{MediaError, Transcriber};

use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Public URL prefix under which `upload_dir` is served
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

const VIDEOS_SUBDIR: &str = "videos";

/// A file written into the upload directory
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub path: PathBuf,
    /// Public URL, e.g. `/uploads/videos/<uuid>_lecture.mp4`
    pub url: String,
}

/// Replace anything but alphanumerics, `.`, `-` and `_` so the client's
/// file name cannot escape the upload directory
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = sanitized.trim_start_matches('.');
    if trimmed.is_empty() {
        "video".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Write an uploaded video under `<upload_dir>/videos/` with a unique name
pub async fn store_video(upload_dir: &Path, original_name: &str, bytes: &[u8]) -> std::io::Result<StoredFile> {
    let dir = upload_dir.join(VIDEOS_SUBDIR);
    tokio::fs::create_dir_all(&dir).await?;

    let file_name = format!("{}_{}", Uuid::new_v4(), sanitize_filename(original_name));
    let path = dir.join(&file_name);
    tokio::fs::write(&path, bytes).await?;

    tracing::info!("Stored upload {} ({} bytes)", path.display(), bytes.len());

    Ok(StoredFile {
        path,
        url: format!("{}/{}/{}", UPLOADS_URL_PREFIX, VIDEOS_SUBDIR, file_name),
    })
}

/// Map a public URL back to its file, refusing anything outside the upload directory
pub fn path_for_url(upload_dir: &Path, url: &str) -> Option<PathBuf> {
    let relative = url.strip_prefix(UPLOADS_URL_PREFIX)?.trim_start_matches('/');
    if relative.is_empty() || relative.split('/').any(|part| part == ".." || part.is_empty()) {
        return None;
    }
    Some(upload_dir.join(relative))
}

/// Delete the file behind a public URL; a missing file is not an error
pub async fn remove_by_url(upload_dir: &Path, url: &str) -> std::io::Result<()> {
    let Some(path) = path_for_url(upload_dir, url) else {
        tracing::warn!("Refusing to delete media outside upload dir: {}", url);
        return Ok(());
    };

    match tokio::fs::remove_file(&path).await {
        Ok(()) => {
            tracing::info!("Deleted media file {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// MIME type from the file extension, defaulting to MP4
pub fn guess_mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("mpeg") | Some("mpg") => "video/mpeg",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("m4a") => "audio/mp4",
        _ => "video/mp4",
    }
}
