use anyhow::{bail, Result};
use std::path::Path;

use crate::config::Config;
use crate::skillcheck::SkillChecker;

pub fn run(dir: &str, config_path: Option<String>) -> Result<()> {
    let path = Path::new(dir);
    if !path.is_dir() {
        bail!("Skill directory not found: {}", dir);
    }

    let config = Config::load_with_path(config_path)?;
    let checker = SkillChecker::new(config.skill);
    let results = checker.check(path);
    checker.print_results(&results);

    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        bail!("{} skill check(s) failed", failed);
    }
    Ok(())
}
