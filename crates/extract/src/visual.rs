use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use cache::{ArtifactKey, BlobCache};
use ingest::{Transcript, VideoSource};

use crate::llm::{FileState, MediaModel, ModelSettings, RemoteFile};
use crate::schema::VisualAnalysis;
use crate::stream::{accumulate, format_elapsed};
use crate::{parse_model_json, prompt, ExtractError};

/// Delay between two processing-state checks of an uploaded video.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Phase 1: upload the call recording and extract timestamped on-screen observations.
pub struct VisualExtractor {
    model: Arc<dyn MediaModel>,
    settings: ModelSettings,
    poll_interval: Duration,
}

impl VisualExtractor {
    pub fn new(model: Arc<dyn MediaModel>) -> Self {
        Self {
            model,
            settings: ModelSettings::visual(),
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub async fn run(
        &self,
        video: &VideoSource,
        transcript: &Transcript,
        cache: &BlobCache,
    ) -> Result<VisualAnalysis> {
        info!(
            "  Uploading video: {} ({:.1} MB)",
            video.path.display(),
            video.size_mb()
        );
        let upload_start = Instant::now();
        let uploaded = self.model
            .upload(video)
            .await
            .context("Failed to upload video")?;
        info!(
            "  ✓ Upload complete in {}. File: {}",
            format_elapsed(upload_start.elapsed()),
            uploaded.name
        );

        let ready = self.wait_until_ready(uploaded).await?;

        let mut request = self.settings.request(prompt::build_visual_prompt(transcript.text()));
        request.attachment = Some(ready.clone());

        info!("  Streaming from {}...", self.settings.model);
        let fragments = self.model.stream(request).await?;
        let response = accumulate(fragments, "Visual analysis").await?;

        let analysis = VisualAnalysis(parse_model_json("Visual analysis", &response.text)?);

        let path = cache.write(ArtifactKey::VisualAnalysis, &analysis).await?;
        info!("  Saved: {}", path.display());
        info!("  {} visual observations extracted", analysis.observation_count());

        // Cleanup is best-effort; the analysis is already cached.
        match self.model.delete(&ready.name).await {
            Ok(()) => info!("  Cleaned up uploaded video file."),
            Err(e) => debug!(file = %ready.name, error = %e, "Ignoring failed remote delete"),
        }

        Ok(analysis)
    }

    /// Poll until the file leaves `Processing`. No timeout: remote processing
    /// time is unbounded.
    async fn wait_until_ready(&self, mut file: RemoteFile) -> Result<RemoteFile> {
        info!("  Waiting for file processing...");
        let poll_start = Instant::now();

        while file.state == FileState::Processing {
            tokio::time::sleep(self.poll_interval).await;
            file = self.model
                .get(&file.name)
                .await
                .context("Failed to poll uploaded video state")?;
            info!("  ... still processing ({})", format_elapsed(poll_start.elapsed()));
        }

        if file.state == FileState::Failed {
            return Err(ExtractError::ProcessingFailed {
                name: file.name,
                state: file.state,
            }
            .into());
        }

        info!("  ✓ File ready ({})", format_elapsed(poll_start.elapsed()));
        Ok(file)
    }
}
