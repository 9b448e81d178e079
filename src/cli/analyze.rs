use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::config::Config;
use crate::walker::{code_files, DirectoryNode, DirectoryWalker, ProjectTree};

/// Print the directory tree and leaf summary without writing anything
pub fn run(path: &str, config_path: Option<String>) -> Result<()> {
    let config = Config::load_with_path(config_path)?;
    let tree = DirectoryWalker::from_config(&config.scan).enumerate(Path::new(path))?;
    info!("Enumerated {} directories under {}", tree.len(), tree.root().display());

    let leaves = tree.leaves();
    println!("Project: {}", tree.name());
    println!("Root: {}", tree.root().display());
    println!(
        "Directories: {} ({} leaves, max depth {})",
        tree.len(),
        leaves.len(),
        tree.max_depth()
    );
    println!();
    println!("{}", tree.render_tree());
    println!();
    println!("Leaf directories:");
    for leaf in leaves {
        println!("  {}", leaf_line(&tree, leaf, &config.scan.code_extensions));
    }
    Ok(())
}

/// `project/dir/ - a.py, b.py`, or `No code files`
fn leaf_line(tree: &ProjectTree, leaf: &DirectoryNode, extensions: &[String]) -> String {
    let names: Vec<String> = code_files(&leaf.path, extensions)
        .iter()
        .filter_map(|f| f.file_name().map(|n| n.to_string_lossy().to_string()))
        .collect();
    let files = if names.is_empty() {
        "No code files".to_string()
    } else {
        names.join(", ")
    };
    format!("{} - {}", tree.full_path(&leaf.path), files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;
    use std::fs;

    #[test]
    fn test_run_nonexistent_path() {
        let result = run("/tmp/nonexistent-treescribe-dir-xyz", None);
        assert!(result.is_err());
    }

    #[test]
    fn test_leaf_line_lists_code_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path().join("app");
        fs::create_dir_all(root.join("api")).unwrap();
        fs::create_dir_all(root.join("assets")).unwrap();
        fs::write(root.join("api/routes.py"), "x = 1\n").unwrap();
        fs::write(root.join("api/app.ts"), "let x = 1;\n").unwrap();
        fs::write(root.join("api/notes.txt"), "n\n").unwrap();
        fs::write(root.join("assets/logo.png"), [0u8]).unwrap();

        let config = ScanConfig::default();
        let tree = DirectoryWalker::from_config(&config).enumerate(&root).unwrap();
        let line = |rel: &str| {
            let node = tree.get(&tree.root().join(rel)).unwrap();
            leaf_line(&tree, node, &config.code_extensions)
        };
        assert_eq!(line("api"), "app/api/ - app.ts, routes.py");
        assert_eq!(line("assets"), "app/assets/ - No code files");
    }

    #[test]
    fn test_run_writes_nothing() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("src/auth")).unwrap();
        fs::write(tmp.path().join("src/auth/login.py"), "def login(): pass\n").unwrap();

        run(tmp.path().to_str().unwrap(), None).unwrap();
        assert!(!tmp.path().join("modules.md").exists());
    }
}
