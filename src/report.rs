//! The on-disk module report.
//!
//! Layout:
//!
//! ```text
//! # Modules
//!
//! ## Directory Structure
//! <tree rendering>
//!
//! ## Module Descriptions
//! project/src/api/ - <label>
//!
//! <!-- Last Update: <timestamp> | Processing: <path or phase> -->
//! ```
//!
//! The descriptions block is authoritative. The tree block is derived and
//! the trailing marker only exists while a run is in progress. Every
//! mutation is a whole-file read-modify-write; callers serialize updates.

use chrono::Local;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, info};

use crate::util::local_timestamp;
use crate::walker::ProjectTree;

pub const PLACEHOLDER: &str = "[unanalyzed]";
pub const TITLE: &str = "# Modules";
pub const TREE_HEADING: &str = "## Directory Structure";
pub const DESCRIPTIONS_HEADING: &str = "## Module Descriptions";
pub const SEPARATOR: &str = " - ";
const KEY_END: &str = "/ - ";
const MARKER_PREFIX: &str = "<!-- Last Update:";

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<!-- Last Update: (.+?) \| Processing: (.*) -->$").expect("valid marker regex")
});

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Report document not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error on report document: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;

/// Parsed progress marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressMarker {
    pub updated_at: String,
    pub processing: String,
}

pub fn marker_line(text: &str) -> String {
    format!("{} {} | Processing: {} -->", MARKER_PREFIX, local_timestamp(), text)
}

fn is_marker(line: &str) -> bool {
    line.trim().starts_with(MARKER_PREFIX)
}

pub fn description_line(full_path: &str, label: &str) -> String {
    format!("{}{}{}", full_path, SEPARATOR, label)
}

/// Full skeleton document: every directory starts at [`PLACEHOLDER`]
pub fn render_skeleton(tree: &ProjectTree) -> String {
    let mut lines = vec![TITLE.to_string(), String::new()];
    lines.push(TREE_HEADING.to_string());
    lines.push(String::new());
    lines.push(tree.render_tree());
    lines.push(String::new());
    lines.push(DESCRIPTIONS_HEADING.to_string());
    lines.push(String::new());
    for node in tree.nodes() {
        lines.push(description_line(&tree.full_path(&node.path), PLACEHOLDER));
    }
    lines.push(String::new());
    lines.push(marker_line("Initializing"));
    lines.join("\n")
}

/// `full_path -> label` pairs from the descriptions block only
pub fn parse_labels(content: &str) -> HashMap<String, String> {
    let mut labels = HashMap::new();
    let mut in_block = false;
    for line in content.lines() {
        let line = line.trim();
        if line == DESCRIPTIONS_HEADING {
            in_block = true;
            continue;
        }
        if !in_block {
            continue;
        }
        if line.starts_with("##") {
            break;
        }
        if line.starts_with("<!--") {
            continue;
        }
        if let Some((path, label)) = split_description(line) {
            labels.insert(path.to_string(), label.to_string());
        }
    }
    labels
}

/// Split `full_path - label` at the end of the slash-terminated path, so a
/// directory name containing the separator stays part of the key.
fn split_description(line: &str) -> Option<(&str, &str)> {
    let at = line.find(KEY_END)?;
    Some((&line[..=at], &line[at + KEY_END.len()..]))
}

/// Replace every line whose `full_path - ` prefix matches an update. Later
/// updates for the same path win. Returns the number of lines replaced.
pub fn apply_updates_to(lines: &mut [String], updates: &[(String, String)]) -> usize {
    let mut latest: Vec<(&str, &str)> = Vec::new();
    for (path, label) in updates.iter().rev() {
        if !latest.iter().any(|(p, _)| *p == path.as_str()) {
            latest.push((path.as_str(), label.as_str()));
        }
    }

    let mut replaced = 0;
    for line in lines.iter_mut() {
        for (path, label) in &latest {
            let matches = line
                .strip_prefix(path)
                .is_some_and(|rest| rest.starts_with(SEPARATOR));
            if matches {
                *line = description_line(path, label);
                replaced += 1;
                break;
            }
        }
    }
    replaced
}

/// Bounds of the descriptions block body: (first line after heading, end exclusive)
fn descriptions_bounds(lines: &[String]) -> Option<(usize, usize)> {
    let start = lines.iter().position(|l| l.trim() == DESCRIPTIONS_HEADING)? + 1;
    let end = lines[start..]
        .iter()
        .position(|l| l.trim().starts_with("##") || is_marker(l))
        .map(|i| start + i)
        .unwrap_or(lines.len());
    Some((start, end))
}

pub struct ReportStore {
    path: PathBuf,
}

impl ReportStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for `<project root>/<file_name>`
    pub fn for_tree(tree: &ProjectTree, file_name: &str) -> Self {
        Self::new(tree.root().join(file_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn read(&self) -> Result<String> {
        if !self.exists() {
            return Err(ReportError::NotFound(self.path.clone()));
        }
        Ok(fs::read_to_string(&self.path)?)
    }

    fn read_lines(&self) -> Result<Vec<String>> {
        Ok(self.read()?.split('\n').map(String::from).collect())
    }

    fn write_lines(&self, lines: &[String]) -> Result<()> {
        fs::write(&self.path, lines.join("\n"))?;
        Ok(())
    }

    /// Write a fresh skeleton, overwriting any existing document
    pub fn create_skeleton(&self, tree: &ProjectTree) -> Result<()> {
        fs::write(&self.path, render_skeleton(tree))?;
        info!(
            "Created {} with {} directories",
            self.path.display(),
            tree.len()
        );
        Ok(())
    }

    pub fn read_labels(&self) -> Result<HashMap<String, String>> {
        Ok(parse_labels(&self.read()?))
    }

    /// Rewrite matching description lines; idempotent and order-preserving
    pub fn apply_updates(&self, updates: &[(String, String)]) -> Result<usize> {
        let mut lines = self.read_lines()?;
        let replaced = apply_updates_to(&mut lines, updates);
        self.write_lines(&lines)?;
        debug!("Applied {} of {} updates", replaced, updates.len());
        Ok(replaced)
    }

    /// Append description lines for paths the document does not list yet.
    /// Paths already present are left alone. Returns how many were added.
    pub fn insert_entries(&self, entries: &[(String, String)]) -> Result<usize> {
        let mut lines = self.read_lines()?;
        let content = lines.join("\n");
        let known = parse_labels(&content);
        let mut seen = HashSet::new();
        let new_lines: Vec<String> = entries
            .iter()
            .filter(|(path, _)| !known.contains_key(path) && seen.insert(path.clone()))
            .map(|(path, label)| description_line(path, label))
            .collect();
        if new_lines.is_empty() {
            return Ok(0);
        }
        let added = new_lines.len();

        match descriptions_bounds(&lines) {
            Some((start, end)) => {
                let at = lines[start..end]
                    .iter()
                    .rposition(|l| !l.trim().is_empty())
                    .map(|i| start + i + 1)
                    .unwrap_or(start);
                let mut insert = new_lines;
                if at == start {
                    insert.insert(0, String::new());
                }
                lines.splice(at..at, insert);
            }
            None => {
                lines.push(String::new());
                lines.push(DESCRIPTIONS_HEADING.to_string());
                lines.push(String::new());
                lines.extend(new_lines);
            }
        }
        self.write_lines(&lines)?;
        Ok(added)
    }

    /// Replace the tree block body with a new rendering
    pub fn refresh_tree(&self, rendering: &str) -> Result<()> {
        let mut lines = self.read_lines()?;
        let Some(heading) = lines.iter().position(|l| l.trim() == TREE_HEADING) else {
            return Ok(());
        };
        let end = lines[heading + 1..]
            .iter()
            .position(|l| l.trim().starts_with("##"))
            .map(|i| heading + 1 + i)
            .unwrap_or(lines.len());
        let mut body = vec![String::new()];
        body.push(rendering.to_string());
        body.push(String::new());
        lines.splice(heading + 1..end, body);
        self.write_lines(&lines)
    }

    /// Replace the progress marker, appending one if absent. Extra markers
    /// are removed so at most one remains.
    /// A missing document is left missing.
    pub fn set_progress_marker(&self, text: &str) -> Result<()> {
        if !self.exists() {
            debug!("No report at {}, skipping progress marker", self.path.display());
            return Ok(());
        }
        let marker = marker_line(text);
        let mut lines = Vec::new();
        let mut found = false;
        for line in self.read_lines()? {
            if !is_marker(&line) {
                lines.push(line);
            } else if !found {
                // first marker is replaced in place, later ones dropped
                lines.push(marker.clone());
                found = true;
            }
        }
        if !found {
            lines.push(String::new());
            lines.push(marker);
        }
        self.write_lines(&lines)
    }

    /// Drop the progress marker and any trailing blank lines
    pub fn clear_progress_marker(&self) -> Result<()> {
        if !self.exists() {
            return Ok(());
        }
        let mut lines: Vec<String> = self
            .read_lines()?
            .into_iter()
            .filter(|l| !is_marker(l))
            .collect();
        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }
        self.write_lines(&lines)
    }

    pub fn progress_marker(&self) -> Result<Option<ProgressMarker>> {
        let content = self.read()?;
        Ok(content.lines().find_map(|line| {
            MARKER_RE.captures(line.trim()).map(|caps| ProgressMarker {
                updated_at: caps[1].to_string(),
                processing: caps[2].to_string(),
            })
        }))
    }

    /// Copy the document to `<stem>_<YYYY-MM-DD_HH-MM-SS>.<ext>` next to it
    pub fn backup(&self) -> Result<Option<PathBuf>> {
        if !self.exists() {
            return Ok(None);
        }
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "modules".to_string());
        let ext = self
            .path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let backup = self.path.with_file_name(format!("{}_{}{}", stem, stamp, ext));
        fs::copy(&self.path, &backup)?;
        info!("Backed up {} -> {}", self.path.display(), backup.display());
        Ok(Some(backup))
    }

    pub fn remove(&self) -> Result<()> {
        if self.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
