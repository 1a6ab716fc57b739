use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct VideoSource {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub mime_type: String,
}

impl VideoSource {
    pub fn new(path: PathBuf, size_bytes: u64) -> Self {
        let mime_type = guess_mime_type(&path).to_string();
        Self {
            path,
            size_bytes,
            mime_type,
        }
    }

    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }

    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "video".to_string())
    }
}

/// Map a video file extension to the MIME type the upload service expects.
pub fn guess_mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "mpeg" | "mpg" => "video/mpeg",
        "3gp" => "video/3gpp",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        _ => "application/octet-stream",
    }
}
