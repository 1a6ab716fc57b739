use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

use promote::{promote, resolve, PromoteError, PromotionRequest};

const EXAMPLES: &str = "\
Examples:
  promote-plan my-saas-product
  promote-plan my-saas-product --plan path/to/engineering_plan.md
  promote-plan my-saas-product --output-root ~/projects/plans";

#[derive(Parser, Debug)]
#[command(
    name = "promote-plan",
    version,
    about = "Promote an engineering plan into a git-ready directory",
    after_help = EXAMPLES
)]
struct Cli {
    /// Directory name for the promoted plan (e.g. my-saas-product)
    name: String,

    /// Path to engineering plan
    #[arg(long, default_value = "engineering_plan.md")]
    plan: PathBuf,

    /// Path to .cache directory with artifacts
    #[arg(long, default_value = ".cache")]
    cache: PathBuf,

    /// Parent directory for the promoted plan
    #[arg(long, default_value = ".")]
    output_root: PathBuf,
}

fn run(cli: Cli) -> Result<()> {
    let plan = resolve(&cli.plan)?;
    let cache = resolve(&cli.cache)?;
    let output_root = resolve(&cli.output_root)?;

    if !plan.exists() {
        return Err(PromoteError::PlanNotFound(plan).into());
    }

    // A missing cache is not fatal: the plan is promoted on its own.
    if !cache.exists() {
        for line in missing_cache_warning(&cache) {
            warn!("{}", line);
        }
    }

    println!("Promoting: {}", cli.name);
    let bundle = promote(&PromotionRequest {
        name: cli.name,
        plan,
        cache,
        output_root,
    })?;

    println!("\nDone. Directory ready at: {}", bundle.dest.display());
    println!(
        "\n  cd {} && git init && git add -A && git commit -m 'Initial PRD'",
        bundle.dest.display()
    );
    Ok(())
}

/// The log level already marks these lines as warnings.
fn missing_cache_warning(cache: &Path) -> [String; 2] {
    [
        format!("cache directory not found: {}", cache.display()),
        "  Promoting plan without artifacts.".to_string(),
    ]
}

fn main() -> ExitCode {
    pipeline::init_tracing();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
