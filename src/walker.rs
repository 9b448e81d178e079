//! Directory enumeration for a project tree.
//!
//! The walk is the only place the file system layout is read. Everything
//! downstream (classification, propagation, report rendering) works on the
//! immutable [`ProjectTree`] snapshot it produces.

use anyhow::{bail, Context, Result};
use ignore::WalkBuilder;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

use crate::config::ScanConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    pub path: PathBuf,
    /// Distance from the project root (root = 0)
    pub depth: usize,
    pub parent: Option<PathBuf>,
    /// Direct subdirectories, in walk order
    pub children: Vec<PathBuf>,
    pub is_leaf: bool,
}

impl DirectoryNode {
    pub fn name(&self) -> &str {
        self.path.file_name().and_then(|n| n.to_str()).unwrap_or("")
    }
}

/// Snapshot of every non-ignored directory under a project root, sorted by path.
#[derive(Debug, Clone)]
pub struct ProjectTree {
    root: PathBuf,
    name: String,
    nodes: Vec<DirectoryNode>,
    index: HashMap<PathBuf, usize>,
}

impl ProjectTree {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Project name: the root directory's own name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[DirectoryNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, path: &Path) -> Option<&DirectoryNode> {
        self.index.get(path).map(|&i| &self.nodes[i])
    }

    pub fn leaves(&self) -> Vec<&DirectoryNode> {
        self.nodes.iter().filter(|n| n.is_leaf).collect()
    }

    pub fn children_of(&self, node: &DirectoryNode) -> Vec<&DirectoryNode> {
        node.children.iter().filter_map(|c| self.get(c)).collect()
    }

    pub fn by_depth(&self) -> BTreeMap<usize, Vec<&DirectoryNode>> {
        let mut map: BTreeMap<usize, Vec<&DirectoryNode>> = BTreeMap::new();
        for node in &self.nodes {
            map.entry(node.depth).or_default().push(node);
        }
        map
    }

    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Path segments below the root (empty for the root itself)
    pub fn segments(&self, path: &Path) -> Vec<String> {
        path.strip_prefix(&self.root)
            .map(|rel| {
                rel.components()
                    .filter_map(|c| match c {
                        Component::Normal(s) => Some(s.to_string_lossy().to_string()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Report key for a directory: `project/`, `project/src/api/`, always slash-terminated
    pub fn full_path(&self, path: &Path) -> String {
        let segments = self.segments(path);
        if segments.is_empty() {
            format!("{}/", self.name)
        } else {
            format!("{}/{}/", self.name, segments.join("/"))
        }
    }

    /// ASCII tree of everything below the root. First-level entries carry no connector.
    pub fn render_tree(&self) -> String {
        let mut lines = Vec::new();
        if let Some(root) = self.nodes.first() {
            self.render_children(root, "", true, &mut lines);
        }
        lines.join("\n")
    }

    fn render_children(
        &self,
        node: &DirectoryNode,
        prefix: &str,
        top_level: bool,
        lines: &mut Vec<String>,
    ) {
        let children = self.children_of(node);
        for (i, child) in children.iter().enumerate() {
            let is_last = i == children.len() - 1;
            if top_level {
                lines.push(child.name().to_string());
            } else {
                let connector = if is_last { "└── " } else { "├── " };
                lines.push(format!("{}{}{}", prefix, connector, child.name()));
            }
            if !child.children.is_empty() {
                let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
                self.render_children(child, &child_prefix, false, lines);
            }
        }
    }
}

pub struct DirectoryWalker {
    ignored: HashSet<String>,
}

impl DirectoryWalker {
    pub fn new<S: AsRef<str>>(ignored: &[S]) -> Self {
        Self {
            ignored: ignored.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(&config.ignored_dirs)
    }

    /// Enumerate all non-ignored directories under `root`, sorted by path.
    ///
    /// Ignored names are pruned before descent, so nothing beneath them is
    /// visited. Unreadable subdirectories are skipped.
    pub fn enumerate(&self, root: &Path) -> Result<ProjectTree> {
        if !root.is_dir() {
            bail!("Not a directory: {}", root.display());
        }
        let root = root
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", root.display()))?;
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "project".to_string());

        let ignored = self.ignored.clone();
        let mut builder = WalkBuilder::new(&root);
        builder.standard_filters(false).follow_links(false);
        builder.filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            !(is_dir && ignored.contains(entry.file_name().to_string_lossy().as_ref()))
        });

        let mut paths = Vec::new();
        for result in builder.build() {
            match result {
                Ok(entry) => {
                    if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                        paths.push(entry.into_path());
                    }
                }
                Err(e) => debug!("Skipping unreadable entry: {}", e),
            }
        }
        paths.sort();

        let mut nodes: Vec<DirectoryNode> = paths
            .into_iter()
            .map(|path| {
                let depth = path
                    .strip_prefix(&root)
                    .map(|rel| rel.components().count())
                    .unwrap_or(0);
                let parent = if depth == 0 {
                    None
                } else {
                    path.parent().map(Path::to_path_buf)
                };
                DirectoryNode {
                    path,
                    depth,
                    parent,
                    children: Vec::new(),
                    is_leaf: true,
                }
            })
            .collect();

        let index: HashMap<PathBuf, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.path.clone(), i))
            .collect();

        for i in 0..nodes.len() {
            let Some(parent) = nodes[i].parent.clone() else {
                continue;
            };
            if let Some(&p) = index.get(&parent) {
                let child = nodes[i].path.clone();
                nodes[p].children.push(child);
                nodes[p].is_leaf = false;
            }
        }

        info!(
            "Found {} directories under {} ({} leaves)",
            nodes.len(),
            root.display(),
            nodes.iter().filter(|n| n.is_leaf).count()
        );

        Ok(ProjectTree {
            root,
            name,
            nodes,
            index,
        })
    }
}

/// Source files directly inside `dir` whose extension is in `extensions`, sorted.
/// A missing or unreadable directory yields an empty list.
pub fn code_files<S: AsRef<str>>(dir: &Path, extensions: &[S]) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|ext| extensions.iter().any(|x| x.as_ref() == ext))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;
    use tempfile::TempDir;

    fn walker() -> DirectoryWalker {
        DirectoryWalker::from_config(&ScanConfig::default())
    }

    fn make_tree(tmp: &TempDir, dirs: &[&str]) {
        for d in dirs {
            fs::create_dir_all(tmp.path().join(d)).unwrap();
        }
    }

    #[test]
    fn test_enumerate_sorted_with_depths() {
        let tmp = TempDir::new().unwrap();
        make_tree(&tmp, &["src/b", "src/a", "docs"]);
        let tree = walker().enumerate(tmp.path()).unwrap();

        let rel: Vec<String> = tree
            .nodes()
            .iter()
            .map(|n| tree.segments(&n.path).join("/"))
            .collect();
        assert_eq!(rel, vec!["", "docs", "src", "src/a", "src/b"]);
        assert_eq!(tree.nodes()[0].depth, 0);
        assert_eq!(tree.nodes()[3].depth, 2);
        assert_eq!(tree.max_depth(), 2);
    }

    #[test]
    fn test_leaf_partition() {
        let tmp = TempDir::new().unwrap();
        make_tree(&tmp, &["src/api", "src/core", "docs"]);
        let tree = walker().enumerate(tmp.path()).unwrap();

        for node in tree.nodes() {
            let has_child = tree
                .nodes()
                .iter()
                .any(|other| other.parent.as_deref() == Some(node.path.as_path()));
            assert_eq!(node.is_leaf, !has_child, "{}", node.path.display());
        }
        let leaves: Vec<&str> = tree.leaves().iter().map(|n| n.name()).collect();
        assert_eq!(leaves, vec!["docs", "api", "core"]);
    }

    #[test]
    fn test_ignored_dirs_pruned_before_descent() {
        let tmp = TempDir::new().unwrap();
        make_tree(
            &tmp,
            &[".git/objects/ab", "node_modules/pkg/lib", "src/target/x", "src/app"],
        );
        let tree = walker().enumerate(tmp.path()).unwrap();
        for node in tree.nodes() {
            let segs = tree.segments(&node.path);
            assert!(!segs.iter().any(|s| s == ".git" || s == "node_modules" || s == "target"));
        }
        // src loses its ignored child, so app is its only child
        let src = tree.get(&tree.root().join("src")).unwrap();
        assert_eq!(src.children.len(), 1);
    }

    #[test]
    fn test_root_named_like_ignored_dir_still_walked() {
        let tmp = TempDir::new().unwrap();
        make_tree(&tmp, &["build/src"]);
        let tree = walker().enumerate(&tmp.path().join("build")).unwrap();
        assert_eq!(tree.name(), "build");
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_full_path_format() {
        let tmp = TempDir::new().unwrap();
        make_tree(&tmp, &["myproject/src/api"]);
        let tree = walker().enumerate(&tmp.path().join("myproject")).unwrap();
        assert_eq!(tree.full_path(tree.root()), "myproject/");
        assert_eq!(
            tree.full_path(&tree.root().join("src").join("api")),
            "myproject/src/api/"
        );
    }

    #[test]
    fn test_render_tree() {
        let tmp = TempDir::new().unwrap();
        make_tree(&tmp, &["docs", "src/api/v1", "src/core"]);
        let tree = walker().enumerate(tmp.path()).unwrap();
        let expected = "docs\nsrc\n    ├── api\n    │   └── v1\n    └── core";
        assert_eq!(tree.render_tree(), expected);
    }

    #[test]
    fn test_render_tree_no_subdirs() {
        let tmp = TempDir::new().unwrap();
        let tree = walker().enumerate(tmp.path()).unwrap();
        assert_eq!(tree.len(), 1);
        assert!(tree.nodes()[0].is_leaf);
        assert_eq!(tree.render_tree(), "");
    }

    #[test]
    fn test_enumerate_nonexistent_root() {
        let result = walker().enumerate(Path::new("/nonexistent/treescribe/root"));
        assert!(result.is_err());
    }

    #[test]
    fn test_code_files_filters_and_sorts() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.py"), "").unwrap();
        fs::write(tmp.path().join("a.rs"), "").unwrap();
        fs::write(tmp.path().join("notes.md"), "").unwrap();
        fs::create_dir(tmp.path().join("sub.py")).unwrap();

        let files = code_files(tmp.path(), &ScanConfig::default().code_extensions);
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.rs", "b.py"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdirectory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        make_tree(&tmp, &["src/locked/inner", "src/open"]);
        let locked = tmp.path().join("src/locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // permissions are not enforced (running as root)
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = walker().enumerate(tmp.path());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        let tree = result.unwrap();

        let names: Vec<&str> = tree.nodes().iter().map(|n| n.name()).collect();
        assert!(names.contains(&"open"));
        assert!(names.contains(&"locked"));
        assert!(!names.contains(&"inner"));
        assert!(tree.get(&tree.root().join("src/locked")).unwrap().is_leaf);
    }

    #[test]
    fn test_code_files_missing_dir() {
        assert!(code_files(Path::new("/nonexistent/dir"), &["py"]).is_empty());
    }
}
