pub mod reader;
pub mod transcript;
pub mod video;

pub use reader::FileReader;
pub use transcript::Transcript;
pub use video::{VideoSource, guess_mime_type};

use anyhow::Result;
use std::path::Path;
use tracing::info;

/// Load both inputs of a run: the subtitle transcript and the video descriptor.
pub async fn ingest_call(video_path: &Path, subtitles_path: &Path) -> Result<(VideoSource, Transcript)> {
    let video = FileReader::probe_video(video_path).await?;
    let transcript = FileReader::read_transcript(subtitles_path).await?;

    info!(
        cues = transcript.cue_count(),
        chars = transcript.text().chars().count(),
        "Loaded transcript"
    );

    Ok((video, transcript))
}
