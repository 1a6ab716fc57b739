use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use pipeline::{Backends, Credentials, Endpoints, Phase, PhaseSelection, Pipeline, PipelineConfig};

const EXAMPLES: &str = "\
Examples:
  video-to-plan --video call.mp4 --subtitles call.srt
  video-to-plan --video call.mp4 --subtitles call.srt --phase 3
  video-to-plan --video call.mp4 --subtitles call.srt --output my_plan.md";

#[derive(Parser, Debug)]
#[command(
    name = "video-to-plan",
    version,
    about = "Video Understanding → Engineering Plan Generator",
    after_help = EXAMPLES
)]
struct Cli {
    /// Path to video file (e.g. .mp4)
    #[arg(long)]
    video: PathBuf,

    /// Path to SRT subtitle file
    #[arg(long)]
    subtitles: PathBuf,

    /// Output PRD path
    #[arg(long, default_value = "engineering_plan.md")]
    output: PathBuf,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_key: Option<String>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_key: Option<String>,

    /// Re-run a specific phase from cached intermediate output
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=3))]
    phase: Option<u8>,

    #[arg(long, env = "GEMINI_BASE_URL", hide = true)]
    gemini_base_url: Option<String>,

    #[arg(long, env = "OPENAI_BASE_URL", hide = true)]
    openai_base_url: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<PipelineConfig> {
        let selection = match self.phase {
            None => PhaseSelection::All,
            Some(n) => PhaseSelection::Only(
                Phase::from_number(n).context(format!("Unknown phase: {}", n))?,
            ),
        };

        let config = PipelineConfig::new(
            &self.video,
            &self.subtitles,
            &self.output,
            selection,
            Credentials::resolve(self.gemini_key, self.openai_key, |var| std::env::var(var).ok()),
        )?
        .with_endpoints(Endpoints {
            gemini: self.gemini_base_url,
            openai: self.openai_base_url,
        });

        Ok(config)
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.into_config()?;
    let backends = Backends::from_config(&config);

    Pipeline::new(config, backends).run().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Keys may come from a local .env file.
    dotenvy::dotenv().ok();
    pipeline::init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
