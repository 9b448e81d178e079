use anyhow::Result;
use std::io;
use std::path::Path;
use tracing::info;

use crate::config::Config;
use crate::orchestrator::{FixedChoice, Orchestrator, ResumeChoice, StdinPrompt};
use crate::walker::DirectoryWalker;

pub fn run(
    path: &str,
    batch_size_override: Option<usize>,
    choice: Option<String>,
    config_path: Option<String>,
) -> Result<()> {
    let mut config = Config::load_with_path(config_path)?;
    if let Some(batch_size) = batch_size_override {
        info!("CLI override: batch_size = {}", batch_size);
        config.scan.batch_size = batch_size;
    }

    let tree = DirectoryWalker::from_config(&config.scan).enumerate(Path::new(path))?;
    info!("Project root: {}", tree.root().display());

    let mut orchestrator = Orchestrator::new(tree, &config.scan);

    let summary = match choice {
        Some(choice) => {
            let choice: ResumeChoice = choice.parse()?;
            info!("CLI override: resume choice = {}", choice);
            orchestrator.run(&mut FixedChoice(choice))?
        }
        None => {
            let stdin = io::stdin();
            let mut prompt = StdinPrompt::new(stdin.lock());
            orchestrator.run(&mut prompt)?
        }
    };

    if !summary.cancelled {
        println!("Report: {}", orchestrator.store().path().display());
    }
    Ok(())
}
