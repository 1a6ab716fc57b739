pub mod openai;
pub mod prompt;

pub use openai::OpenAiClient;

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use extract::{accumulate, format_count, ModelSettings, Synthesis, TextGenerator};

/// Summary counts of a generated plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanStats {
    /// Lines starting with a second-level heading marker.
    pub sections: usize,
    pub words: usize,
}

impl PlanStats {
    pub fn from_markdown(markdown: &str) -> Self {
        Self {
            sections: markdown.split('\n').filter(|line| line.starts_with("## ")).count(),
            words: markdown.split_whitespace().count(),
        }
    }
}

/// Phase 3: turn the synthesis into the final Markdown PRD.
pub struct PlanGenerator {
    model: Arc<dyn TextGenerator>,
    settings: ModelSettings,
}

impl PlanGenerator {
    pub fn new(model: Arc<dyn TextGenerator>) -> Self {
        Self {
            model,
            settings: Self::default_settings(),
        }
    }

    /// Slightly warmer and shorter-capped than the extraction phases.
    pub fn default_settings() -> ModelSettings {
        ModelSettings::new("gpt-5.2", 0.3, 16384)
    }

    /// Generate the plan and write it verbatim to `output_path`.
    pub async fn run(&self, synthesis: &Synthesis, output_path: &Path) -> Result<(String, PlanStats)> {
        let mut request = self.settings.request(prompt::build_plan_prompt(synthesis)?);
        request.system = Some(prompt::SYSTEM_PROMPT.to_string());

        info!("  Streaming from {}...", self.settings.model);
        let fragments = self.model.stream(request).await?;
        let plan = accumulate(fragments, "PRD generation").await?.text;

        tokio::fs::write(output_path, &plan)
            .await
            .context(format!("Failed to write plan: {:?}", output_path))?;
        info!("  Saved: {}", output_path.display());

        let stats = PlanStats::from_markdown(&plan);
        info!(
            "  {} top-level sections, {} words",
            stats.sections,
            format_count(stats.words)
        );

        Ok((plan, stats))
    }
}
