//! Promotion against real directories.

use std::fs;
use std::path::Path;

use promote::{promote, PromoteError, PromotionRequest};

fn snapshot(dir: &Path) -> Vec<String> {
    let mut entries: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    entries.sort();
    entries
}

fn seed(root: &Path, with_synthesis: bool) -> PromotionRequest {
    let plan = root.join("engineering_plan.md");
    let cache = root.join(".cache");
    fs::write(&plan, "# PRD\n\n## Executive Summary\n").unwrap();
    fs::create_dir_all(&cache).unwrap();
    fs::write(cache.join("visual_analysis.json"), "{\n  \"observations\": []\n}").unwrap();
    if with_synthesis {
        fs::write(cache.join("synthesis.json"), "{\n  \"pain_points\": []\n}").unwrap();
    }

    PromotionRequest {
        name: "acme-ops".to_string(),
        plan,
        cache,
        output_root: root.to_path_buf(),
    }
}

#[test]
fn existing_destination_is_rejected_without_changes() {
    let dir = tempfile::tempdir().unwrap();
    let request = seed(dir.path(), true);
    let dest = dir.path().join("acme-ops");
    fs::create_dir(&dest).unwrap();
    fs::write(dest.join("notes.txt"), "keep me").unwrap();

    let before_root = snapshot(dir.path());
    let err = promote(&request).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<PromoteError>(),
        Some(PromoteError::DestinationExists(path)) if path == &dest
    ));
    assert_eq!(snapshot(dir.path()), before_root);
    assert_eq!(snapshot(&dest), vec!["notes.txt"]);
    assert_eq!(fs::read_to_string(dest.join("notes.txt")).unwrap(), "keep me");
}

#[test]
fn missing_synthesis_is_left_out_of_readme_and_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let request = seed(dir.path(), false);

    let bundle = promote(&request).unwrap();

    let readme = fs::read_to_string(bundle.dest.join("README.md")).unwrap();
    assert!(readme.contains("artifacts/visual_analysis.json"));
    assert!(!readme.contains("synthesis.json"));

    let metadata: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(bundle.dest.join("artifacts/metadata.json")).unwrap()).unwrap();
    assert_eq!(metadata["name"], "acme-ops");
    assert_eq!(metadata["artifacts"], serde_json::json!(["visual_analysis.json"]));
    assert_eq!(metadata["source_plan"], request.plan.display().to_string());

    assert_eq!(
        snapshot(&bundle.dest.join("artifacts")),
        vec!["metadata.json", "visual_analysis.json"]
    );
}

#[test]
fn missing_cache_directory_promotes_plan_only() {
    let dir = tempfile::tempdir().unwrap();
    let plan = dir.path().join("engineering_plan.md");
    fs::write(&plan, "# PRD\n").unwrap();

    let bundle = promote(&PromotionRequest {
        name: "solo".to_string(),
        plan,
        cache: dir.path().join("no-such-cache"),
        output_root: dir.path().join("out"),
    })
    .unwrap();

    assert!(bundle.metadata.artifacts.is_empty());
    assert_eq!(snapshot(&bundle.dest), vec!["PRD.md", "README.md", "artifacts"]);
    assert_eq!(snapshot(&bundle.dest.join("artifacts")), vec!["metadata.json"]);
}
