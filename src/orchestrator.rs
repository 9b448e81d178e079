//! Two-phase report generation: skeleton first, then a bottom-up fill.
//!
//! Leaves are always labeled before any parent reads them. Parents are
//! processed one depth level at a time, deepest first, using labels computed
//! in the same run. Writes go through [`BatchWriter`], which rewrites the
//! report every `batch_size` labels and moves the progress marker along.

use anyhow::Result;
use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

use crate::classifier::Classifier;
use crate::config::ScanConfig;
use crate::propagator::Propagator;
use crate::report::{ReportStore, PLACEHOLDER};
use crate::walker::{DirectoryNode, ProjectTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    SkeletonCreated,
    LeavesAnalyzing,
    LeavesDone,
    DepthPropagating(usize),
    Finalizing,
    Done,
}

/// How to continue when a report already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeChoice {
    /// Back up, discard and regenerate everything
    FullRebuild,
    /// Only directories still at the placeholder (or missing)
    ResumeUnanalyzed,
    /// Only directories the report does not list at all
    NewDirectories,
}

impl FromStr for ResumeChoice {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "1" | "rebuild" => Ok(ResumeChoice::FullRebuild),
            "2" | "unanalyzed" => Ok(ResumeChoice::ResumeUnanalyzed),
            "3" | "new" => Ok(ResumeChoice::NewDirectories),
            _ => anyhow::bail!("Invalid choice: {} (expected 1, 2 or 3)", s),
        }
    }
}

impl fmt::Display for ResumeChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResumeChoice::FullRebuild => write!(f, "full rebuild"),
            ResumeChoice::ResumeUnanalyzed => write!(f, "continue unanalyzed directories"),
            ResumeChoice::NewDirectories => write!(f, "check new directories"),
        }
    }
}

/// Decision point for an existing report. `Ok(None)` means the user cancelled.
pub trait ResumePrompt {
    fn choose(&mut self) -> Result<Option<ResumeChoice>>;
}

/// Answers without asking (`--choice`)
pub struct FixedChoice(pub ResumeChoice);

impl ResumePrompt for FixedChoice {
    fn choose(&mut self) -> Result<Option<ResumeChoice>> {
        Ok(Some(self.0))
    }
}

/// Line-based prompt. End of input selects a full rebuild; `q` cancels.
pub struct StdinPrompt<R> {
    reader: R,
}

impl<R: BufRead> StdinPrompt<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> ResumePrompt for StdinPrompt<R> {
    fn choose(&mut self) -> Result<Option<ResumeChoice>> {
        println!("Please choose an option:");
        println!("  1. Full overwrite (backup existing, regenerate from scratch)");
        println!("  2. Continue unanalyzed directories ({} only)", PLACEHOLDER);
        println!("  3. Check new directories only (not in existing list)");
        println!("  q. Cancel");
        println!();

        loop {
            print!("Your choice (1/2/3): ");
            std::io::stdout().flush()?;

            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                println!();
                println!("Non-interactive mode detected. Using option 1 (full overwrite)...");
                return Ok(Some(ResumeChoice::FullRebuild));
            }
            match line.trim() {
                "q" | "quit" => return Ok(None),
                answer => match answer.parse::<ResumeChoice>() {
                    Ok(choice) => return Ok(Some(choice)),
                    Err(_) => println!("Invalid choice. Please enter 1, 2, or 3."),
                },
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub directories: usize,
    pub leaves: usize,
    pub parents: usize,
    /// Directories repaired by the gap-fill pass
    pub repaired: usize,
    pub cancelled: bool,
}

/// Buffers `(full_path, label)` pairs and rewrites the report every `batch_size`.
struct BatchWriter<'a> {
    store: &'a ReportStore,
    batch_size: usize,
    pending: Vec<(String, String)>,
}

impl<'a> BatchWriter<'a> {
    fn new(store: &'a ReportStore, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
            pending: Vec::new(),
        }
    }

    /// Returns the number of labels written if this push filled a batch
    fn push(&mut self, full_path: String, label: String) -> Result<Option<usize>> {
        self.pending.push((full_path, label));
        if self.pending.len() < self.batch_size {
            return Ok(None);
        }
        let last = self.pending[self.pending.len() - 1].0.clone();
        let written = self.flush()?;
        self.store.set_progress_marker(&last)?;
        Ok(Some(written))
    }

    fn flush(&mut self) -> Result<usize> {
        if self.pending.is_empty() {
            return Ok(0);
        }
        self.store.apply_updates(&self.pending)?;
        let written = self.pending.len();
        self.pending.clear();
        Ok(written)
    }
}

fn is_real_label(label: &str) -> bool {
    !label.is_empty() && label != PLACEHOLDER
}

pub struct Orchestrator {
    tree: ProjectTree,
    store: ReportStore,
    classifier: Classifier,
    propagator: Propagator,
    batch_size: usize,
    phase: Cell<Phase>,
}

impl Orchestrator {
    pub fn new(tree: ProjectTree, config: &ScanConfig) -> Self {
        let store = ReportStore::for_tree(&tree, &config.report_file);
        Self {
            tree,
            store,
            classifier: Classifier::from_config(config),
            propagator: Propagator::from_config(config),
            batch_size: config.batch_size,
            phase: Cell::new(Phase::Idle),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    pub fn tree(&self) -> &ProjectTree {
        &self.tree
    }

    pub fn store(&self) -> &ReportStore {
        &self.store
    }

    fn enter(&self, phase: Phase) {
        debug!("Phase {:?} -> {:?}", self.phase.get(), phase);
        self.phase.set(phase);
    }

    /// Generate the report, asking `prompt` how to proceed if one already exists
    pub fn run(&mut self, prompt: &mut dyn ResumePrompt) -> Result<RunSummary> {
        if !self.store.exists() {
            return self.generate();
        }

        println!("{}", "=".repeat(60));
        println!("Existing {} detected!", self.store.path().display());
        println!("{}", "=".repeat(60));
        if let Some(marker) = self.store.progress_marker()? {
            println!(
                "Previous run was interrupted at {} ({})",
                marker.processing, marker.updated_at
            );
        }
        println!();

        let Some(choice) = prompt.choose()? else {
            println!("Operation cancelled.");
            return Ok(RunSummary {
                cancelled: true,
                ..RunSummary::default()
            });
        };
        info!("Resume strategy: {}", choice);

        match choice {
            ResumeChoice::FullRebuild => {
                self.store.backup()?;
                self.store.remove()?;
                self.generate()
            }
            ResumeChoice::ResumeUnanalyzed => {
                let existing = self.store.read_labels()?;
                let targets: HashSet<PathBuf> = self
                    .tree
                    .nodes()
                    .iter()
                    .filter(|n| {
                        existing
                            .get(&self.tree.full_path(&n.path))
                            .is_none_or(|l| !is_real_label(l))
                    })
                    .map(|n| n.path.clone())
                    .collect();
                if targets.is_empty() {
                    println!("No unanalyzed directories found. All directories are already analyzed!");
                    return Ok(RunSummary::default());
                }
                println!("Found {} unanalyzed directories to process.", targets.len());
                self.insert_absent(&targets, &existing)?;
                self.resume(&targets, &existing, "Processing unanalyzed directories")
            }
            ResumeChoice::NewDirectories => {
                let existing = self.store.read_labels()?;
                let targets: HashSet<PathBuf> = self
                    .tree
                    .nodes()
                    .iter()
                    .filter(|n| !existing.contains_key(&self.tree.full_path(&n.path)))
                    .map(|n| n.path.clone())
                    .collect();
                if targets.is_empty() {
                    println!("No new directories found. All directories are already in the list!");
                    return Ok(RunSummary::default());
                }
                println!("Found {} new directories to process.", targets.len());
                self.insert_absent(&targets, &existing)?;
                self.store.refresh_tree(&self.tree.render_tree())?;
                self.resume(&targets, &existing, "Processing new directories")
            }
        }
    }

    /// Add placeholder lines for targets the report does not list, so the
    /// batched line rewrites have something to replace.
    fn insert_absent(
        &self,
        targets: &HashSet<PathBuf>,
        existing: &HashMap<String, String>,
    ) -> Result<()> {
        let absent: Vec<(String, String)> = self
            .tree
            .nodes()
            .iter()
            .filter(|n| targets.contains(&n.path))
            .map(|n| self.tree.full_path(&n.path))
            .filter(|full| !existing.contains_key(full))
            .map(|full| (full, PLACEHOLDER.to_string()))
            .collect();
        if !absent.is_empty() {
            let added = self.store.insert_entries(&absent)?;
            debug!("Inserted {} new description lines", added);
        }
        Ok(())
    }

    /// Full two-phase run: skeleton, leaves, depth-by-depth propagation, gap fill
    pub fn generate(&mut self) -> Result<RunSummary> {
        println!("Generating {}", self.store.path().display());
        self.enter(Phase::Idle);

        self.store.create_skeleton(&self.tree)?;
        self.enter(Phase::SkeletonCreated);

        let leaves: Vec<DirectoryNode> = self.tree.leaves().into_iter().cloned().collect();
        let parents = self.tree.len() - leaves.len();
        println!(
            "Found {} directories, {} leaf directories",
            self.tree.len(),
            leaves.len()
        );

        let mut labels: HashMap<PathBuf, String> = HashMap::new();
        {
            self.enter(Phase::LeavesAnalyzing);
            println!("Analyzing {} leaf directories...", leaves.len());
            let mut writer = BatchWriter::new(&self.store, self.batch_size);
            for (i, leaf) in leaves.iter().enumerate() {
                let label = self.classifier.classify(&self.tree, leaf);
                labels.insert(leaf.path.clone(), label.clone());
                if let Some(n) = writer.push(self.tree.full_path(&leaf.path), label)? {
                    println!("  [{}/{}] Updated {} leaf directories", i + 1, leaves.len(), n);
                }
            }
            let n = writer.flush()?;
            if n > 0 {
                println!("  [{}/{}] Updated {} leaf directories", leaves.len(), leaves.len(), n);
            }
        }
        self.enter(Phase::LeavesDone);

        println!("Propagating summaries upward (by depth)...");
        let by_depth = self.tree.by_depth();
        for depth in (0..self.tree.max_depth()).rev() {
            self.enter(Phase::DepthPropagating(depth));
            let Some(nodes) = by_depth.get(&depth) else {
                continue;
            };
            let parents_here: Vec<&&DirectoryNode> = nodes.iter().filter(|n| !n.is_leaf).collect();
            println!("  Depth {}: processing {} directories...", depth, parents_here.len());

            let mut writer = BatchWriter::new(&self.store, self.batch_size);
            for node in parents_here {
                let child_labels: Vec<String> = node
                    .children
                    .iter()
                    .filter_map(|c| labels.get(c).cloned())
                    .collect();
                let label = self.propagator.propagate(&self.tree, node, &child_labels);
                labels.insert(node.path.clone(), label.clone());
                writer.push(self.tree.full_path(&node.path), label)?;
            }
            writer.flush()?;
        }

        let repaired = self.finalize()?;
        println!(
            "[OK] Generated {} ({} directories, {} leaves analyzed, {} parents propagated)",
            self.store.path().display(),
            self.tree.len(),
            leaves.len(),
            parents
        );

        Ok(RunSummary {
            directories: self.tree.len(),
            leaves: leaves.len(),
            parents,
            repaired,
            cancelled: false,
        })
    }

    /// Reduced single pass over `targets`, deepest first. Non-target children
    /// contribute their existing real labels.
    fn resume(
        &mut self,
        targets: &HashSet<PathBuf>,
        existing: &HashMap<String, String>,
        marker: &str,
    ) -> Result<RunSummary> {
        self.store.set_progress_marker(marker)?;
        let mut labels: HashMap<PathBuf, String> = HashMap::new();
        let mut summary = RunSummary {
            directories: targets.len(),
            ..RunSummary::default()
        };

        let by_depth = self.tree.by_depth();
        let mut writer = BatchWriter::new(&self.store, self.batch_size);
        for depth in (0..=self.tree.max_depth()).rev() {
            self.enter(Phase::DepthPropagating(depth));
            let Some(nodes) = by_depth.get(&depth) else {
                continue;
            };
            for node in nodes.iter().filter(|n| targets.contains(&n.path)) {
                let label = if node.is_leaf {
                    summary.leaves += 1;
                    self.classifier.classify(&self.tree, node)
                } else {
                    summary.parents += 1;
                    let child_labels = self.available_child_labels(node, &labels, existing);
                    self.propagator.propagate(&self.tree, node, &child_labels)
                };
                labels.insert(node.path.clone(), label.clone());
                if let Some(n) = writer.push(self.tree.full_path(&node.path), label)? {
                    println!("  Updated {} directories", n);
                }
            }
        }
        let n = writer.flush()?;
        if n > 0 {
            println!("  Updated {} directories", n);
        }

        self.store.clear_progress_marker()?;
        self.enter(Phase::Done);
        println!("[OK] Incremental update completed! Directories processed: {}", targets.len());
        Ok(summary)
    }

    fn available_child_labels(
        &self,
        node: &DirectoryNode,
        fresh: &HashMap<PathBuf, String>,
        existing: &HashMap<String, String>,
    ) -> Vec<String> {
        node.children
            .iter()
            .filter_map(|child| {
                fresh.get(child).cloned().or_else(|| {
                    existing
                        .get(&self.tree.full_path(child))
                        .filter(|l| is_real_label(l))
                        .cloned()
                })
            })
            .collect()
    }

    fn finalize(&mut self) -> Result<usize> {
        self.enter(Phase::Finalizing);
        self.store.clear_progress_marker()?;
        let repaired = self.fill_gaps()?;
        self.enter(Phase::Done);
        Ok(repaired)
    }

    /// Finalizing pass on its own: clear any marker, then label every
    /// directory that is missing or still at the placeholder.
    /// Fails if the report does not exist.
    pub fn validate(&mut self) -> Result<usize> {
        self.store.read_labels()?;
        self.finalize()
    }

    fn fill_gaps(&mut self) -> Result<usize> {
        println!("Validating module descriptions...");
        let existing = self.store.read_labels()?;
        println!(
            "Found {} directories in filesystem, {} descriptions in report.",
            self.tree.len(),
            existing.len()
        );

        let mut missing: Vec<&DirectoryNode> = self
            .tree
            .nodes()
            .iter()
            .filter(|n| {
                existing
                    .get(&self.tree.full_path(&n.path))
                    .is_none_or(|l| !is_real_label(l))
            })
            .collect();
        if missing.is_empty() {
            println!("[OK] All directories have valid descriptions!");
            return Ok(0);
        }
        println!("Found {} directories without valid descriptions.", missing.len());

        let targets: HashSet<PathBuf> = missing.iter().map(|n| n.path.clone()).collect();
        self.insert_absent(&targets, &existing)?;

        // deepest first so repaired children feed their parents
        missing.sort_by(|a, b| b.depth.cmp(&a.depth));

        let mut fixed: HashMap<PathBuf, String> = HashMap::new();
        let mut writer = BatchWriter::new(&self.store, self.batch_size);
        for node in &missing {
            let label = if node.is_leaf {
                self.classifier.classify(&self.tree, node)
            } else {
                let child_labels = self.available_child_labels(node, &fixed, &existing);
                self.propagator.propagate(&self.tree, node, &child_labels)
            };
            fixed.insert(node.path.clone(), label.clone());
            if let Some(n) = writer.push(self.tree.full_path(&node.path), label)? {
                println!("  Fixed {} missing descriptions", n);
            }
        }
        let n = writer.flush()?;
        if n > 0 {
            println!("  Fixed {} missing descriptions", n);
        }
        // a full batch moved the marker; the pass itself is complete
        self.store.clear_progress_marker()?;

        println!("[OK] Validation and fix completed!");
        Ok(missing.len())
    }
}
