//! Structural checks for a skill package directory (SKILL.md plus scripts).

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::config::SkillConfig;

pub const SKILL_FILE: &str = "SKILL.md";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    fn pass(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            detail: detail.into(),
        }
    }

    fn fail(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            detail: detail.into(),
        }
    }
}

pub struct SkillChecker {
    config: SkillConfig,
}

impl Default for SkillChecker {
    fn default() -> Self {
        Self::new(SkillConfig::default())
    }
}

impl SkillChecker {
    pub fn new(config: SkillConfig) -> Self {
        Self { config }
    }

    /// Run every check. A missing SKILL.md short-circuits the content checks.
    pub fn check(&self, dir: &Path) -> Vec<CheckResult> {
        let skill_path = dir.join(SKILL_FILE);
        let content = match fs::read_to_string(&skill_path) {
            Ok(content) => content,
            Err(e) => {
                return vec![CheckResult::fail(
                    "skill file",
                    format!("{} not readable: {}", skill_path.display(), e),
                )];
            }
        };

        let mut results = vec![CheckResult::pass("skill file", format!("{} exists", SKILL_FILE))];
        results.extend(self.check_frontmatter(&content));
        results.extend(self.check_sections(&content));
        results.extend(self.check_scripts(dir));
        results.push(self.check_length(&content));
        results.push(self.check_forbidden_files(dir));
        results
    }

    fn check_frontmatter(&self, content: &str) -> Vec<CheckResult> {
        let Some(block) = frontmatter_block(content) else {
            return vec![CheckResult::fail("frontmatter", "Missing frontmatter (---...---)")];
        };

        let mut results = Vec::new();
        let fields = parse_fields(&block);
        match fields.get("name") {
            Some(name) if *name == self.config.name => {
                results.push(CheckResult::pass("frontmatter name", format!("name: {}", name)));
            }
            Some(name) => results.push(CheckResult::fail(
                "frontmatter name",
                format!("expected name '{}', found '{}'", self.config.name, name),
            )),
            None => results.push(CheckResult::fail(
                "frontmatter name",
                format!("missing 'name: {}'", self.config.name),
            )),
        }

        let lower = block.to_lowercase();
        let missing: Vec<&str> = self
            .config
            .triggers
            .iter()
            .filter(|t| !lower.contains(&t.to_lowercase()))
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            results.push(CheckResult::pass("trigger keywords", "all present"));
        } else {
            results.push(CheckResult::fail(
                "trigger keywords",
                format!("missing: {}", missing.join(", ")),
            ));
        }
        results
    }

    fn check_sections(&self, content: &str) -> Vec<CheckResult> {
        let headings: Vec<&str> = content
            .lines()
            .map(str::trim_end)
            .filter(|l| l.starts_with('#'))
            .collect();

        let mut results = Vec::new();
        let missing: Vec<&str> = self
            .config
            .required_sections
            .iter()
            .filter(|s| !headings.iter().any(|h| h.starts_with(s.as_str())))
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            results.push(CheckResult::pass(
                "required sections",
                format!("{} found", self.config.required_sections.len()),
            ));
        } else {
            results.push(CheckResult::fail(
                "required sections",
                format!("missing: {}", missing.join(", ")),
            ));
        }

        let present: Vec<&str> = self
            .config
            .forbidden_sections
            .iter()
            .filter(|s| headings.iter().any(|h| h.starts_with(s.as_str())))
            .map(String::as_str)
            .collect();
        if present.is_empty() {
            results.push(CheckResult::pass("forbidden sections", "none present"));
        } else {
            results.push(CheckResult::fail(
                "forbidden sections",
                format!("present: {}", present.join(", ")),
            ));
        }
        results
    }

    fn check_scripts(&self, dir: &Path) -> Vec<CheckResult> {
        self.config
            .scripts
            .iter()
            .map(|script| {
                let name = format!("script {}", script);
                if dir.join(script).is_file() {
                    CheckResult::pass(&name, "exists")
                } else {
                    CheckResult::fail(&name, "not found")
                }
            })
            .collect()
    }

    fn check_length(&self, content: &str) -> CheckResult {
        let lines = content.lines().count();
        let detail = format!("{} lines (max {})", lines, self.config.max_lines);
        if lines <= self.config.max_lines {
            CheckResult::pass("length", detail)
        } else {
            CheckResult::fail("length", detail)
        }
    }

    fn check_forbidden_files(&self, dir: &Path) -> CheckResult {
        let present: Vec<&str> = self
            .config
            .forbidden_files
            .iter()
            .filter(|f| dir.join(f).exists())
            .map(String::as_str)
            .collect();
        if present.is_empty() {
            CheckResult::pass("auxiliary files", "none present")
        } else {
            CheckResult::fail("auxiliary files", format!("remove: {}", present.join(", ")))
        }
    }

    /// Print results in a human-readable format
    pub fn print_results(&self, results: &[CheckResult]) {
        println!("\nSkill package check:\n");
        for result in results {
            let mark = if result.passed { "✅" } else { "❌" };
            println!("  {} {}: {}", mark, result.name, result.detail);
        }
        let failed = results.iter().filter(|r| !r.passed).count();
        println!();
        println!(
            "Summary: {} passed, {} failed",
            results.len() - failed,
            failed
        );
    }
}

/// Text between the leading `---` fence and the next one
fn frontmatter_block(content: &str) -> Option<String> {
    let mut lines = content.lines();
    if lines.next()?.trim() != "---" {
        return None;
    }
    let mut block = Vec::new();
    for line in lines {
        if line.trim() == "---" {
            return Some(block.join("\n"));
        }
        block.push(line);
    }
    None
}

fn parse_fields(block: &str) -> HashMap<String, String> {
    block
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}
