use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::driver::{Phase, PhaseSelection};
use crate::PipelineError;

pub const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";
pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

fn present(key: Option<String>) -> Option<String> {
    key.filter(|k| !k.trim().is_empty())
}

/// API keys, resolved from flags or the environment. Empty strings count as missing.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub gemini: Option<String>,
    pub openai: Option<String>,
}

impl Credentials {
    pub fn new(gemini: Option<String>, openai: Option<String>) -> Self {
        Self {
            gemini: present(gemini),
            openai: present(openai),
        }
    }

    /// A non-blank flag wins; a missing or blank one falls back to `env`.
    pub fn resolve(
        gemini_flag: Option<String>,
        openai_flag: Option<String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let pick = |flag: Option<String>, var: &str| present(flag).or_else(|| env(var));
        Self::new(pick(gemini_flag, GEMINI_KEY_ENV), pick(openai_flag, OPENAI_KEY_ENV))
    }

    /// Check exactly the keys the requested phases need: Gemini for phases 1
    /// and 2, OpenAI for phase 3.
    pub fn validate(&self, phases: &[Phase]) -> Result<(), PipelineError> {
        let needs_gemini = phases.iter().any(|p| matches!(p, Phase::Visual | Phase::Synthesis));
        if needs_gemini && self.gemini.is_none() {
            return Err(PipelineError::MissingCredential {
                provider: "Gemini",
                phases: "phases 1-2",
                env: GEMINI_KEY_ENV,
                flag: "--gemini-key",
            });
        }

        if phases.contains(&Phase::Plan) && self.openai.is_none() {
            return Err(PipelineError::MissingCredential {
                provider: "OpenAI",
                phases: "phase 3",
                env: OPENAI_KEY_ENV,
                flag: "--openai-key",
            });
        }

        Ok(())
    }
}

/// Base URL overrides for the remote providers (proxies, gateways).
#[derive(Debug, Clone, Default)]
pub struct Endpoints {
    pub gemini: Option<String>,
    pub openai: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub video: PathBuf,
    pub subtitles: PathBuf,
    pub output: PathBuf,
    /// Always `<output parent>/.cache`.
    pub cache_dir: PathBuf,
    pub selection: PhaseSelection,
    pub credentials: Credentials,
    pub endpoints: Endpoints,
}

impl PipelineConfig {
    /// Resolve all paths to absolute ones and derive the cache directory.
    pub fn new(
        video: &Path,
        subtitles: &Path,
        output: &Path,
        selection: PhaseSelection,
        credentials: Credentials,
    ) -> Result<Self> {
        let video = absolute(video)?;
        let subtitles = absolute(subtitles)?;
        let output = absolute(output)?;
        let cache_dir = output
            .parent()
            .map(|parent| parent.join(".cache"))
            .context(format!("Output path has no parent directory: {:?}", output))?;

        Ok(Self {
            video,
            subtitles,
            output,
            cache_dir,
            selection,
            credentials,
            endpoints: Endpoints::default(),
        })
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).context(format!("Failed to resolve path: {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(gemini: Option<&str>, openai: Option<&str>) -> Credentials {
        Credentials::new(gemini.map(String::from), openai.map(String::from))
    }

    #[test]
    fn test_gemini_required_for_phases_one_and_two() {
        let creds = keys(None, Some("sk-test"));
        assert!(matches!(
            creds.validate(&[Phase::Visual]),
            Err(PipelineError::MissingCredential { provider: "Gemini", .. })
        ));
        assert!(creds.validate(&[Phase::Synthesis]).is_err());
        assert!(creds.validate(&[Phase::Plan]).is_ok());
    }

    #[test]
    fn test_openai_required_only_for_phase_three() {
        let creds = keys(Some("g-test"), None);
        assert!(creds.validate(&[Phase::Visual, Phase::Synthesis]).is_ok());

        let err = creds.validate(&PhaseSelection::All.phases()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "OpenAI API key required for phase 3. Set OPENAI_API_KEY or use --openai-key."
        );
    }

    #[test]
    fn test_blank_keys_are_missing() {
        let creds = keys(Some("  "), Some(""));
        assert!(creds.gemini.is_none());
        assert!(creds.openai.is_none());
    }

    #[test]
    fn test_blank_flag_falls_back_to_environment() {
        let env = |var: &str| match var {
            GEMINI_KEY_ENV => Some("g-from-env".to_string()),
            _ => None,
        };

        let creds = Credentials::resolve(Some(String::new()), Some(" ".to_string()), env);
        assert_eq!(creds.gemini.as_deref(), Some("g-from-env"));
        assert!(creds.openai.is_none());

        let creds = Credentials::resolve(Some("g-flag".to_string()), None, env);
        assert_eq!(creds.gemini.as_deref(), Some("g-flag"));
    }

    #[test]
    fn test_blank_environment_value_is_missing() {
        let creds = Credentials::resolve(None, None, |_| Some("   ".to_string()));
        assert!(creds.gemini.is_none());
        assert!(creds.openai.is_none());
    }

    #[test]
    fn test_cache_dir_next_to_output() {
        let config = PipelineConfig::new(
            Path::new("/calls/demo.mp4"),
            Path::new("/calls/demo.srt"),
            Path::new("/plans/acme/engineering_plan.md"),
            PhaseSelection::All,
            Credentials::default(),
        )
        .unwrap();

        assert_eq!(config.cache_dir, PathBuf::from("/plans/acme/.cache"));
        assert!(config.video.is_absolute());
    }

    #[test]
    fn test_relative_output_resolves_against_cwd() {
        let config = PipelineConfig::new(
            Path::new("call.mp4"),
            Path::new("call.srt"),
            Path::new("engineering_plan.md"),
            PhaseSelection::Only(Phase::Plan),
            Credentials::default(),
        )
        .unwrap();

        let cwd = std::env::current_dir().unwrap();
        assert_eq!(config.output, cwd.join("engineering_plan.md"));
        assert_eq!(config.cache_dir, cwd.join(".cache"));
    }
}
