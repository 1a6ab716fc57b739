use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use cache::{ArtifactKey, BlobCache};
use ingest::Transcript;

use crate::llm::{ModelSettings, TextGenerator};
use crate::schema::{Synthesis, VisualAnalysis};
use crate::stream::accumulate;
use crate::{parse_model_json, prompt};

/// Phase 2: merge the visual analysis and the transcript into product findings.
pub struct Synthesizer<M: ?Sized + TextGenerator = dyn TextGenerator> {
    model: Arc<M>,
    settings: ModelSettings,
}

impl<M: ?Sized + TextGenerator> Synthesizer<M> {
    pub fn new(model: Arc<M>) -> Self {
        Self {
            model,
            settings: ModelSettings::synthesis(),
        }
    }

    pub async fn run(
        &self,
        visual_analysis: &VisualAnalysis,
        transcript: &Transcript,
        cache: &BlobCache,
    ) -> Result<Synthesis> {
        let prompt = prompt::build_synthesis_prompt(visual_analysis, transcript.text())?;

        info!("  Streaming from {}...", self.settings.model);
        let fragments = self.model.stream(self.settings.request(prompt)).await?;
        let response = accumulate(fragments, "Synthesis").await?;

        let synthesis = Synthesis(parse_model_json("Synthesis", &response.text)?);

        let path = cache.write(ArtifactKey::Synthesis, &synthesis).await?;
        info!("  Saved: {}", path.display());
        info!("  {} pain points identified", synthesis.pain_point_count());
        info!("  {} workflows documented", synthesis.workflow_count());
        info!("  {} user personas identified", synthesis.persona_count());

        Ok(synthesis)
    }
}
