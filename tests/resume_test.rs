//! Incremental runs against an existing report: resume, new directories, validation

use anyhow::Result;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use treescribe::config::ScanConfig;
use treescribe::orchestrator::{FixedChoice, Orchestrator, ResumeChoice, StdinPrompt};
use treescribe::report::{parse_labels, ReportStore, PLACEHOLDER};
use treescribe::walker::DirectoryWalker;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn project(tmp: &TempDir) -> PathBuf {
    let root = tmp.path().join("proj");
    write(&root, "src/auth/session.ts", "export function session() {}\n");
    write(&root, "src/utils/strings.ts", "export const trim = 1;\n");
    write(&root, "docs/index.md", "# Docs\n");
    root
}

fn orchestrator(root: &Path) -> Result<Orchestrator> {
    let config = ScanConfig {
        batch_size: 2,
        ..ScanConfig::default()
    };
    let tree = DirectoryWalker::from_config(&config).enumerate(root)?;
    Ok(Orchestrator::new(tree, &config))
}

fn report(root: &Path) -> String {
    fs::read_to_string(root.join("modules.md")).unwrap()
}

#[test]
fn test_resume_unanalyzed_touches_only_placeholder_line() -> Result<()> {
    let tmp = TempDir::new()?;
    let root = project(&tmp);
    orchestrator(&root)?.generate()?;
    let original = report(&root);
    assert!(original.contains("proj/src/auth/ - Authentication module"));

    let damaged = original.replace(
        "proj/src/auth/ - Authentication module",
        &format!("proj/src/auth/ - {}", PLACEHOLDER),
    );
    fs::write(root.join("modules.md"), &damaged)?;

    let summary =
        orchestrator(&root)?.run(&mut FixedChoice(ResumeChoice::ResumeUnanalyzed))?;
    assert_eq!(summary.directories, 1);
    assert_eq!(summary.leaves, 1);

    let resumed = report(&root);
    let changed: Vec<(&str, &str)> = damaged
        .lines()
        .zip(resumed.lines())
        .filter(|(a, b)| a != b)
        .collect();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].1, "proj/src/auth/ - Authentication module");
    assert_eq!(resumed, original);
    Ok(())
}

#[test]
fn test_resume_unanalyzed_with_nothing_to_do() -> Result<()> {
    let tmp = TempDir::new()?;
    let root = project(&tmp);
    orchestrator(&root)?.generate()?;
    let original = report(&root);

    let summary =
        orchestrator(&root)?.run(&mut FixedChoice(ResumeChoice::ResumeUnanalyzed))?;
    assert_eq!(summary.directories, 0);
    assert_eq!(report(&root), original);
    Ok(())
}

#[test]
fn test_new_directories_are_added() -> Result<()> {
    let tmp = TempDir::new()?;
    let root = project(&tmp);
    orchestrator(&root)?.generate()?;
    let before = parse_labels(&report(&root));

    write(&root, "src/payments/charge.ts", "export function charge() {}\n");
    let summary = orchestrator(&root)?.run(&mut FixedChoice(ResumeChoice::NewDirectories))?;
    assert_eq!(summary.directories, 1);

    let content = report(&root);
    let after = parse_labels(&content);
    assert_eq!(after.len(), before.len() + 1);
    let label = &after["proj/src/payments/"];
    assert!(!label.is_empty() && label != PLACEHOLDER);
    for (path, label) in &before {
        assert_eq!(&after[path], label, "{} changed", path);
    }

    let tree_start = content.find("## Directory Structure").unwrap();
    let desc_start = content.find("## Module Descriptions").unwrap();
    assert!(content[tree_start..desc_start].contains("payments"));
    assert!(!content.contains("<!-- Last Update:"));
    Ok(())
}

#[test]
fn test_cancel_leaves_report_untouched() -> Result<()> {
    let tmp = TempDir::new()?;
    let root = project(&tmp);
    orchestrator(&root)?.generate()?;
    let original = report(&root);

    let mut prompt = StdinPrompt::new(Cursor::new(b"q\n".to_vec()));
    let summary = orchestrator(&root)?.run(&mut prompt)?;
    assert!(summary.cancelled);
    assert_eq!(report(&root), original);
    Ok(())
}

#[test]
fn test_interrupted_run_is_completed_by_resume() -> Result<()> {
    let tmp = TempDir::new()?;
    let root = project(&tmp);
    let orch = orchestrator(&root)?;
    // simulate a crash right after the skeleton was written
    let store = ReportStore::new(root.join("modules.md"));
    store.create_skeleton(orch.tree())?;
    assert!(store.progress_marker()?.is_some());

    let summary = orchestrator(&root)?.run(&mut FixedChoice(ResumeChoice::ResumeUnanalyzed))?;
    assert_eq!(summary.directories, orch.tree().len());

    let labels = parse_labels(&report(&root));
    assert!(labels.values().all(|l| l != PLACEHOLDER));
    assert_eq!(labels["proj/src/"], "Core source code and business logic");
    assert!(store.progress_marker()?.is_none());
    Ok(())
}

#[test]
fn test_validate_repairs_gaps() -> Result<()> {
    let tmp = TempDir::new()?;
    let root = project(&tmp);
    orchestrator(&root)?.generate()?;
    let original = report(&root);

    // drop one line entirely and reset another
    let damaged: Vec<&str> = original
        .lines()
        .filter(|l| !l.starts_with("proj/docs/ - "))
        .collect();
    let damaged = damaged.join("\n").replace(
        "proj/src/utils/ - Utility helpers",
        &format!("proj/src/utils/ - {}", PLACEHOLDER),
    );
    fs::write(root.join("modules.md"), &damaged)?;

    let repaired = orchestrator(&root)?.validate()?;
    assert_eq!(repaired, 2);

    let labels = parse_labels(&report(&root));
    assert_eq!(labels["proj/src/utils/"], "Utility helpers");
    assert_eq!(labels["proj/docs/"], "Documentation directory");

    assert_eq!(orchestrator(&root)?.validate()?, 0);
    Ok(())
}

#[test]
fn test_validate_without_report_fails() -> Result<()> {
    let tmp = TempDir::new()?;
    let root = project(&tmp);
    let err = orchestrator(&root)?.validate().unwrap_err();
    assert!(err.to_string().contains("not found"));
    assert!(!root.join("modules.md").exists());
    Ok(())
}

#[test]
fn test_directory_name_with_separator_stays_unique() -> Result<()> {
    let tmp = TempDir::new()?;
    let root = tmp.path().join("proj");
    write(&root, "v1 - old/a.py", "def handler(): pass\n");
    orchestrator(&root)?.generate()?;
    let generated = report(&root);

    for _ in 0..3 {
        assert_eq!(orchestrator(&root)?.validate()?, 0);
    }

    let content = report(&root);
    assert_eq!(content, generated);
    assert_eq!(content.matches("proj/v1 - old/ - ").count(), 1);
    let labels = parse_labels(&content);
    assert_eq!(labels.len(), 2);
    assert_ne!(labels["proj/v1 - old/"], PLACEHOLDER);
    Ok(())
}
