use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

use crate::transcript::Transcript;
use crate::video::VideoSource;

pub struct FileReader;

impl FileReader {
    /// Read a subtitle file verbatim. The extension is not checked; any UTF-8
    /// text is accepted as a transcript.
    pub async fn read_transcript(path: &Path) -> Result<Transcript> {
        let content = fs::read_to_string(path)
            .await
            .context(format!("Failed to read subtitle file: {:?}", path))?;

        Ok(Transcript::new(path.to_path_buf(), content))
    }

    /// Stat a video file without reading it into memory.
    pub async fn probe_video(path: &Path) -> Result<VideoSource> {
        let metadata = fs::metadata(path)
            .await
            .context(format!("Failed to stat video file: {:?}", path))?;

        if !metadata.is_file() {
            anyhow::bail!("Video path is not a file: {:?}", path);
        }

        Ok(VideoSource::new(path.to_path_buf(), metadata.len()))
    }

    /// Open the video for a streamed upload. Nothing is read up front.
    pub async fn open_video(video: &VideoSource) -> Result<fs::File> {
        fs::File::open(&video.path)
            .await
            .context(format!("Failed to open video file: {:?}", video.path))
    }
}
