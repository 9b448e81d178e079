use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::orchestrator::Orchestrator;
use crate::walker::DirectoryWalker;

/// Repair a report so every enumerated directory has a real label
pub fn run(path: &str, config_path: Option<String>) -> Result<()> {
    let config = Config::load_with_path(config_path)?;
    let tree = DirectoryWalker::from_config(&config.scan).enumerate(Path::new(path))?;
    let mut orchestrator = Orchestrator::new(tree, &config.scan);

    let repaired = orchestrator.validate()?;
    if repaired == 0 {
        println!("[OK] All directories have descriptions");
    } else {
        println!("[OK] Repaired {} directories", repaired);
    }
    Ok(())
}
