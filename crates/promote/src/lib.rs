use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use cache::ArtifactKey;

pub const PLAN_FILE_NAME: &str = "PRD.md";
pub const ARTIFACTS_DIR: &str = "artifacts";
pub const METADATA_FILE_NAME: &str = "metadata.json";
pub const README_FILE_NAME: &str = "README.md";

#[derive(Debug, thiserror::Error)]
pub enum PromoteError {
    #[error("directory already exists: {}\n  Pick a different name or remove it first.", .0.display())]
    DestinationExists(PathBuf),

    #[error("plan not found: {}", .0.display())]
    PlanNotFound(PathBuf),
}

#[derive(Debug, Clone)]
pub struct PromotionRequest {
    pub name: String,
    pub plan: PathBuf,
    /// Pipeline cache directory. A missing directory means no artifacts.
    pub cache: PathBuf,
    pub output_root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromotionMetadata {
    pub name: String,
    pub promoted_at: String,
    pub source_plan: String,
    pub source_cache: String,
    pub artifacts: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PromotedBundle {
    pub dest: PathBuf,
    pub metadata: PromotionMetadata,
}

/// Package a plan and its cached artifacts into `<output_root>/<name>`.
pub fn promote(request: &PromotionRequest) -> Result<PromotedBundle> {
    promote_at(request, Local::now().naive_local())
}

/// Same as [`promote`] with an explicit promotion time.
pub fn promote_at(request: &PromotionRequest, now: NaiveDateTime) -> Result<PromotedBundle> {
    let dest = request.output_root.join(&request.name);
    if dest.exists() {
        return Err(PromoteError::DestinationExists(dest).into());
    }
    if !request.plan.is_file() {
        return Err(PromoteError::PlanNotFound(request.plan.clone()).into());
    }

    let artifacts_dir = dest.join(ARTIFACTS_DIR);
    fs::create_dir_all(&artifacts_dir)
        .context(format!("Failed to create {:?}", artifacts_dir))?;

    let plan_dest = dest.join(PLAN_FILE_NAME);
    fs::copy(&request.plan, &plan_dest)
        .context(format!("Failed to copy plan {:?}", request.plan))?;
    info!("  Copied plan → {}", plan_dest.display());

    let mut copied = Vec::new();
    for key in ArtifactKey::ALL {
        let file_name = key.file_name();
        let src = request.cache.join(&file_name);
        if !src.is_file() {
            continue;
        }

        fs::copy(&src, artifacts_dir.join(&file_name))
            .context(format!("Failed to copy artifact {:?}", src))?;
        info!("  Copied artifact → {}/{}", ARTIFACTS_DIR, file_name);
        copied.push(file_name);
    }

    let metadata = PromotionMetadata {
        name: request.name.clone(),
        promoted_at: now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        source_plan: request.plan.display().to_string(),
        source_cache: request.cache.display().to_string(),
        artifacts: copied,
    };
    let metadata_json = serde_json::to_string_pretty(&metadata)
        .context("Failed to serialize promotion metadata")?;
    fs::write(artifacts_dir.join(METADATA_FILE_NAME), metadata_json + "\n")
        .context("Failed to write promotion metadata")?;

    fs::write(dest.join(README_FILE_NAME), render_readme(&metadata, now))
        .context("Failed to write README")?;
    info!("  Generated → {}", README_FILE_NAME);

    Ok(PromotedBundle { dest, metadata })
}

/// README listing the plan, the artifacts actually copied, and the metadata.
pub fn render_readme(metadata: &PromotionMetadata, now: NaiveDateTime) -> String {
    let has = |key: ArtifactKey| metadata.artifacts.contains(&key.file_name());

    let mut lines = vec![
        format!("# {}", metadata.name),
        String::new(),
        format!("Engineering plan promoted on {}.", now.format("%Y-%m-%d")),
        String::new(),
        "## Contents".to_string(),
        String::new(),
        format!("- **{}** — Product Requirements Document", PLAN_FILE_NAME),
    ];
    if has(ArtifactKey::VisualAnalysis) {
        lines.push(format!(
            "- **{}/{}** — Timestamped visual observations from source video",
            ARTIFACTS_DIR,
            ArtifactKey::VisualAnalysis.file_name()
        ));
    }
    if has(ArtifactKey::Synthesis) {
        lines.push(format!(
            "- **{}/{}** — Synthesized pain points, workflows, and requirements",
            ARTIFACTS_DIR,
            ArtifactKey::Synthesis.file_name()
        ));
    }
    lines.push(format!("- **{}/{}** — Promotion metadata", ARTIFACTS_DIR, METADATA_FILE_NAME));
    lines.push(String::new());

    lines.join("\n")
}

/// Resolve a path against the current directory without touching the filesystem.
pub fn resolve(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).context(format!("Failed to resolve path: {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fixed_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_micro_opt(9, 26, 53, 589_793)
            .unwrap()
    }

    fn metadata(artifacts: &[&str]) -> PromotionMetadata {
        PromotionMetadata {
            name: "acme-ops".to_string(),
            promoted_at: "2026-03-14T09:26:53.589793".to_string(),
            source_plan: "/work/engineering_plan.md".to_string(),
            source_cache: "/work/.cache".to_string(),
            artifacts: artifacts.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn test_readme_with_all_artifacts() {
        let readme = render_readme(&metadata(&["visual_analysis.json", "synthesis.json"]), fixed_time());
        assert_eq!(
            readme,
            "# acme-ops\n\n\
             Engineering plan promoted on 2026-03-14.\n\n\
             ## Contents\n\n\
             - **PRD.md** — Product Requirements Document\n\
             - **artifacts/visual_analysis.json** — Timestamped visual observations from source video\n\
             - **artifacts/synthesis.json** — Synthesized pain points, workflows, and requirements\n\
             - **artifacts/metadata.json** — Promotion metadata\n"
        );
    }

    #[test]
    fn test_readme_skips_missing_artifacts() {
        let readme = render_readme(&metadata(&[]), fixed_time());
        assert!(!readme.contains("visual_analysis.json"));
        assert!(!readme.contains("synthesis.json"));
        assert!(readme.contains("- **artifacts/metadata.json** — Promotion metadata\n"));
    }

    #[test]
    fn test_promote_copies_plan_and_present_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let plan = dir.path().join("engineering_plan.md");
        let cache = dir.path().join(".cache");
        fs::write(&plan, "# Plan\n").unwrap();
        fs::create_dir(&cache).unwrap();
        fs::write(cache.join("visual_analysis.json"), "{\"observations\": []}").unwrap();

        let request = PromotionRequest {
            name: "acme-ops".to_string(),
            plan: plan.clone(),
            cache: cache.clone(),
            output_root: dir.path().join("plans"),
        };
        let bundle = promote_at(&request, fixed_time()).unwrap();

        assert_eq!(bundle.dest, dir.path().join("plans/acme-ops"));
        assert_eq!(fs::read_to_string(bundle.dest.join("PRD.md")).unwrap(), "# Plan\n");
        assert_eq!(
            fs::read_to_string(bundle.dest.join("artifacts/visual_analysis.json")).unwrap(),
            "{\"observations\": []}"
        );
        assert!(!bundle.dest.join("artifacts/synthesis.json").exists());
        assert_eq!(bundle.metadata.artifacts, vec!["visual_analysis.json"]);
        assert_eq!(bundle.metadata.promoted_at, "2026-03-14T09:26:53.589793");

        let written = fs::read_to_string(bundle.dest.join("artifacts/metadata.json")).unwrap();
        assert!(written.starts_with("{\n  \"name\": \"acme-ops\",\n  \"promoted_at\""));
        assert!(written.ends_with("}\n"));
    }

    #[test]
    fn test_missing_plan_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let request = PromotionRequest {
            name: "acme-ops".to_string(),
            plan: dir.path().join("missing.md"),
            cache: dir.path().join(".cache"),
            output_root: dir.path().to_path_buf(),
        };

        let err = promote_at(&request, fixed_time()).unwrap_err();
        assert!(matches!(err.downcast_ref::<PromoteError>(), Some(PromoteError::PlanNotFound(_))));
        assert!(!dir.path().join("acme-ops").exists());
    }
}
