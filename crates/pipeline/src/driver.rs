use anyhow::Result;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use cache::{ArtifactKey, BlobCache};
use extract::{
    format_elapsed, GeminiClient, MediaModel, ModelSettings, Synthesis, Synthesizer,
    TextGenerator, VisualAnalysis, VisualExtractor,
};
use generate::{OpenAiClient, PlanGenerator, PlanStats};

use crate::config::PipelineConfig;
use crate::PipelineError;

const RULE: &str = "============================================================";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Visual = 1,
    Synthesis = 2,
    Plan = 3,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Visual, Phase::Synthesis, Phase::Plan];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(n: u8) -> Option<Phase> {
        Phase::ALL.into_iter().find(|p| p.number() == n)
    }

    pub fn title(self) -> &'static str {
        match self {
            Phase::Visual => "Visual Extraction",
            Phase::Synthesis => "Synthesis",
            Phase::Plan => "PRD Generation",
        }
    }

    /// Cached artifact this phase produces, if any.
    pub fn artifact(self) -> Option<ArtifactKey> {
        match self {
            Phase::Visual => Some(ArtifactKey::VisualAnalysis),
            Phase::Synthesis => Some(ArtifactKey::Synthesis),
            Phase::Plan => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Which phases a run executes. Skipped phases are satisfied from cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseSelection {
    All,
    Only(Phase),
}

impl PhaseSelection {
    pub fn phases(&self) -> Vec<Phase> {
        match self {
            PhaseSelection::All => Phase::ALL.to_vec(),
            PhaseSelection::Only(phase) => vec![*phase],
        }
    }

    pub fn includes(&self, phase: Phase) -> bool {
        match self {
            PhaseSelection::All => true,
            PhaseSelection::Only(only) => *only == phase,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineState {
    NotStarted,
    Phase1Done,
    Phase2Done,
    Phase3Done,
}

impl PipelineState {
    fn after(phase: Phase) -> Self {
        match phase {
            Phase::Visual => PipelineState::Phase1Done,
            Phase::Synthesis => PipelineState::Phase2Done,
            Phase::Plan => PipelineState::Phase3Done,
        }
    }
}

/// Remote providers. `media` serves phases 1-2, `writer` serves phase 3.
#[derive(Clone, Default)]
pub struct Backends {
    pub media: Option<Arc<dyn MediaModel>>,
    pub writer: Option<Arc<dyn TextGenerator>>,
}

impl Backends {
    /// Real HTTP clients for every credential that is present.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let media = config.credentials.gemini.clone().map(|key| {
            let client = match &config.endpoints.gemini {
                Some(url) => GeminiClient::with_base_url(key, url.clone()),
                None => GeminiClient::new(key),
            };
            Arc::new(client) as Arc<dyn MediaModel>
        });

        let writer = config.credentials.openai.clone().map(|key| {
            let client = match &config.endpoints.openai {
                Some(url) => OpenAiClient::with_base_url(key, url.clone()),
                None => OpenAiClient::new(key),
            };
            Arc::new(client) as Arc<dyn TextGenerator>
        });

        Self { media, writer }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub state: PipelineState,
    pub plan_stats: Option<PlanStats>,
    pub elapsed: Duration,
}

pub struct Pipeline {
    config: PipelineConfig,
    backends: Backends,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, backends: Backends) -> Self {
        Self { config, backends }
    }

    pub async fn run(&self) -> Result<RunReport> {
        let config = &self.config;
        let selection = config.selection;
        let phases = selection.phases();

        // Fail on missing keys before touching the filesystem or network.
        config.credentials.validate(&phases)?;

        let cache = BlobCache::open(&config.cache_dir).await?;

        if !config.video.exists() {
            return Err(PipelineError::MissingInput {
                what: "Video file",
                path: config.video.clone(),
            }
            .into());
        }
        if !config.subtitles.exists() {
            return Err(PipelineError::MissingInput {
                what: "Subtitle file",
                path: config.subtitles.clone(),
            }
            .into());
        }

        let (video, transcript) = ingest::ingest_call(&config.video, &config.subtitles).await?;

        let total_start = Instant::now();
        info!("Video:     {}", config.video.display());
        info!("Subtitles: {}", config.subtitles.display());
        info!("Output:    {}", config.output.display());
        info!("Cache:     {}", cache.dir().display());
        info!("Phases:    {:?}", phases.iter().map(|p| p.number()).collect::<Vec<_>>());

        let mut state = PipelineState::NotStarted;

        let visual_analysis = if selection.includes(Phase::Visual) {
            let phase_start = banner(Phase::Visual, &ModelSettings::visual().model);
            let media = self.media(Phase::Visual)?;
            let analysis = VisualExtractor::new(media)
                .run(&video, &transcript, &cache)
                .await?;
            info!("  Phase 1 total: {}", format_elapsed(phase_start.elapsed()));
            state = PipelineState::after(Phase::Visual);
            Some(analysis)
        } else {
            let cached = self.load_cached(&cache, Phase::Visual, "visual analysis").await?;
            if cached.is_some() {
                state = PipelineState::after(Phase::Visual);
            } else if selection.includes(Phase::Synthesis) {
                return Err(self.missing_prerequisite(Phase::Synthesis, Phase::Visual).into());
            }
            cached.map(VisualAnalysis)
        };

        let synthesis = if selection.includes(Phase::Synthesis) {
            let visual_analysis = visual_analysis
                .as_ref()
                .ok_or_else(|| self.missing_prerequisite(Phase::Synthesis, Phase::Visual))?;
            let phase_start = banner(Phase::Synthesis, &ModelSettings::synthesis().model);
            let media = self.media(Phase::Synthesis)?;
            let synthesis = Synthesizer::new(media)
                .run(visual_analysis, &transcript, &cache)
                .await?;
            info!("  Phase 2 total: {}", format_elapsed(phase_start.elapsed()));
            state = PipelineState::after(Phase::Synthesis);
            Some(synthesis)
        } else {
            let cached = self.load_cached(&cache, Phase::Synthesis, "synthesis").await?;
            if cached.is_some() {
                state = PipelineState::after(Phase::Synthesis);
            } else if selection.includes(Phase::Plan) {
                return Err(self.missing_prerequisite(Phase::Plan, Phase::Synthesis).into());
            }
            cached.map(Synthesis)
        };

        let mut plan_stats = None;
        if selection.includes(Phase::Plan) {
            let synthesis = synthesis
                .as_ref()
                .ok_or_else(|| self.missing_prerequisite(Phase::Plan, Phase::Synthesis))?;
            let phase_start = banner(Phase::Plan, &PlanGenerator::default_settings().model);
            let writer = self.writer()?;
            let (_, stats) = PlanGenerator::new(writer)
                .run(synthesis, &config.output)
                .await?;
            info!("  Phase 3 total: {}", format_elapsed(phase_start.elapsed()));
            state = PipelineState::after(Phase::Plan);
            plan_stats = Some(stats);
        }

        let elapsed = total_start.elapsed();
        info!("");
        info!("{}", RULE);
        info!("DONE — total time: {}", format_elapsed(elapsed));
        info!("{}", RULE);
        if plan_stats.is_some() {
            info!("PRD written to: {}", config.output.display());
        }

        Ok(RunReport {
            state,
            plan_stats,
            elapsed,
        })
    }

    async fn load_cached(
        &self,
        cache: &BlobCache,
        phase: Phase,
        label: &str,
    ) -> Result<Option<serde_json::Value>> {
        let Some(key) = phase.artifact() else {
            return Ok(None);
        };

        let cached = cache.read(key).await?;
        if cached.is_some() {
            info!("Loaded cached {}: {}", label, cache.path(key).display());
        }
        Ok(cached)
    }

    fn missing_prerequisite(&self, phase: Phase, prerequisite: Phase) -> PipelineError {
        PipelineError::MissingPrerequisite {
            phase,
            prerequisite,
            artifact: prerequisite
                .artifact()
                .map(|key| key.file_name())
                .unwrap_or_default(),
            cache_dir: self.config.cache_dir.clone(),
        }
    }

    fn media(&self, phase: Phase) -> Result<Arc<dyn MediaModel>, PipelineError> {
        self.backends
            .media
            .clone()
            .ok_or(PipelineError::BackendUnavailable { phase, provider: "Gemini" })
    }

    fn writer(&self) -> Result<Arc<dyn TextGenerator>, PipelineError> {
        self.backends
            .writer
            .clone()
            .ok_or(PipelineError::BackendUnavailable { phase: Phase::Plan, provider: "OpenAI" })
    }
}

fn banner(phase: Phase, model: &str) -> Instant {
    info!("");
    info!("{}", RULE);
    info!("PHASE {}: {} ({})", phase, phase.title(), model);
    info!("{}", RULE);
    Instant::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_numbers() {
        assert_eq!(Phase::from_number(2), Some(Phase::Synthesis));
        assert_eq!(Phase::from_number(4), None);
        assert_eq!(Phase::Plan.to_string(), "3");
        assert_eq!(Phase::Plan.artifact(), None);
    }

    #[test]
    fn test_selection() {
        assert_eq!(PhaseSelection::All.phases(), vec![Phase::Visual, Phase::Synthesis, Phase::Plan]);

        let only = PhaseSelection::Only(Phase::Synthesis);
        assert_eq!(only.phases(), vec![Phase::Synthesis]);
        assert!(only.includes(Phase::Synthesis));
        assert!(!only.includes(Phase::Visual));
    }

    #[test]
    fn test_state_ordering() {
        assert!(PipelineState::NotStarted < PipelineState::Phase1Done);
        assert_eq!(PipelineState::after(Phase::Plan), PipelineState::Phase3Done);
    }
}
