pub mod config;
pub mod driver;

pub use config::{Credentials, Endpoints, PipelineConfig};
pub use driver::{Backends, Phase, PhaseSelection, Pipeline, PipelineState, RunReport};

use std::path::PathBuf;

/// Failures reported to the user before or between phases.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{provider} API key required for {phases}. Set {env} or use {flag}.")]
    MissingCredential {
        provider: &'static str,
        phases: &'static str,
        env: &'static str,
        flag: &'static str,
    },

    #[error("{what} not found: {}", .path.display())]
    MissingInput { what: &'static str, path: PathBuf },

    #[error(
        "Phase {phase} requires {artifact} in {}. Run phase {prerequisite} first.",
        .cache_dir.display()
    )]
    MissingPrerequisite {
        phase: Phase,
        prerequisite: Phase,
        artifact: String,
        cache_dir: PathBuf,
    },

    #[error("No {provider} client configured for phase {phase}")]
    BackendUnavailable { phase: Phase, provider: &'static str },
}

/// Install the fmt subscriber used by the binaries. `RUST_LOG` overrides the
/// default `info` level.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}
