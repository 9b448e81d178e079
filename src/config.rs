use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub skill: SkillConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Directory names pruned before descent (build outputs, caches, VCS metadata)
    #[serde(default = "default_ignored_dirs")]
    pub ignored_dirs: Vec<String>,

    /// File extensions (without the dot) treated as source code
    #[serde(default = "default_code_extensions")]
    pub code_extensions: Vec<String>,

    /// Report file name, relative to the project root (default: "modules.md")
    #[serde(default = "default_report_file")]
    pub report_file: String,

    /// Number of labels buffered before the report is rewritten (default: 5)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Max source files read per leaf during the content scan (default: 5)
    #[serde(default = "default_max_files_scanned")]
    pub max_files_scanned: usize,

    /// Max label length in characters (default: 50)
    #[serde(default = "default_max_label_len")]
    pub max_label_len: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            ignored_dirs: default_ignored_dirs(),
            code_extensions: default_code_extensions(),
            report_file: default_report_file(),
            batch_size: default_batch_size(),
            max_files_scanned: default_max_files_scanned(),
            max_label_len: default_max_label_len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Cache location. Defaults to the user cache dir.
    #[serde(default)]
    pub cache_file: Option<PathBuf>,

    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_projects")]
    pub projects: Vec<ProjectConfig>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            cache_file: None,
            cache_ttl_secs: default_cache_ttl(),
            timeout_secs: default_timeout(),
            projects: default_projects(),
        }
    }
}

impl FetchConfig {
    /// Resolve the cache path: explicit config value, else `<cache_dir>/treescribe/fetch_cache.json`
    pub fn cache_path(&self) -> PathBuf {
        if let Some(path) = &self.cache_file {
            return path.clone();
        }
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("treescribe")
            .join("fetch_cache.json")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Key used in fetcher output (e.g. "opencode")
    pub key: String,
    /// GitHub "owner/name"
    pub repo: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub faq: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillConfig {
    #[serde(default = "default_skill_name")]
    pub name: String,
    /// Keywords that must appear in the frontmatter (case-insensitive)
    #[serde(default = "default_triggers")]
    pub triggers: Vec<String>,
    #[serde(default = "default_required_sections")]
    pub required_sections: Vec<String>,
    #[serde(default = "default_forbidden_sections")]
    pub forbidden_sections: Vec<String>,
    /// Script paths, relative to the skill directory, that must exist
    #[serde(default = "default_scripts")]
    pub scripts: Vec<String>,
    #[serde(default = "default_forbidden_files")]
    pub forbidden_files: Vec<String>,
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
}

impl Default for SkillConfig {
    fn default() -> Self {
        Self {
            name: default_skill_name(),
            triggers: default_triggers(),
            required_sections: default_required_sections(),
            forbidden_sections: default_forbidden_sections(),
            scripts: default_scripts(),
            forbidden_files: default_forbidden_files(),
            max_lines: default_max_lines(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_ignored_dirs() -> Vec<String> {
    strings(&[
        "node_modules",
        ".git",
        "__pycache__",
        ".venv",
        "venv",
        "env",
        "dist",
        "build",
        ".next",
        ".nuxt",
        "target",
        "bin",
        "obj",
        ".pytest_cache",
        "coverage",
        ".mypy_cache",
    ])
}

fn default_code_extensions() -> Vec<String> {
    strings(&[
        "py", "js", "ts", "tsx", "jsx", "java", "go", "rs", "cpp", "c", "cs", "rb", "php",
        "swift", "kt", "scala", "sh", "bash", "zsh",
    ])
}

fn default_report_file() -> String {
    "modules.md".to_string()
}

fn default_batch_size() -> usize {
    5
}

fn default_max_files_scanned() -> usize {
    5
}

fn default_max_label_len() -> usize {
    50
}

fn default_api_base() -> String {
    "https://api.github.com/repos".to_string()
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_timeout() -> u64 {
    10
}

fn default_projects() -> Vec<ProjectConfig> {
    vec![
        ProjectConfig {
            key: "opencode".to_string(),
            repo: "anomalyco/opencode".to_string(),
            description: "Open source AI coding agent for Terminal, Desktop, and IDE".to_string(),
            features: strings(&[
                "Multi-model support (Claude, OpenAI, Google, local models via Ollama)",
                "LSP-Intelligence Engine for type-safe, definition-aware suggestions",
                "Parallel agent sessions",
                "Local-first architecture",
                "Plan mode (suggests implementation) and Build mode (direct changes)",
                "Multiple interfaces: TUI, Desktop App, VS Code Extension",
            ]),
            faq: strings(&[
                "Q: How do I update OpenCode?",
                "A: Run the install script: curl -fsSL https://opencode.ai/install | bash",
                "Q: How do I configure API keys?",
                "A: Run /connect in the TUI or set OPENCODE_API_KEY",
                "Q: Can I use local models?",
                "A: Yes. Connect to Ollama or any local LLM provider via config",
                "Q: What's the difference between Plan and Build mode?",
                "A: Plan mode suggests changes without applying them. Build mode modifies files.",
            ]),
        },
        ProjectConfig {
            key: "oh-my-opencode".to_string(),
            repo: "code-yeongyu/oh-my-opencode".to_string(),
            description: "Agent harness with batteries-included orchestration".to_string(),
            features: strings(&[
                "Specialized agents: oracle, librarian, explore, frontend-ui-ux",
                "Category-based delegation routing",
                "Built-in agents and skills",
                "Curated LSP tools, MCP servers, and workflows",
            ]),
            faq: strings(&[
                "Q: How do I install oh-my-opencode?",
                "A: Run: npm install -g oh-my-opencode@latest",
                "Q: How do I update from v2 to v3?",
                "A: See the migration guide in the repository. Major config changes required.",
            ]),
        },
    ]
}

fn default_skill_name() -> String {
    "opencodedoc".to_string()
}

fn default_triggers() -> Vec<String> {
    strings(&["opencode"])
}

fn default_required_sections() -> Vec<String> {
    strings(&[
        "## Overview",
        "## Supported Query Types",
        "### 1. Version Information",
        "### 2. Core Features",
        "### 3. Latest Updates",
        "### 4. FAQ",
        "## Data Sources",
        "## Usage",
        "## Output Format",
    ])
}

fn default_forbidden_sections() -> Vec<String> {
    strings(&["### Installation Guide"])
}

fn default_scripts() -> Vec<String> {
    strings(&["scripts/fetch_info.py"])
}

fn default_forbidden_files() -> Vec<String> {
    strings(&[
        "README.md",
        "INSTALLATION_GUIDE.md",
        "QUICK_REFERENCE.md",
        "CHANGELOG.md",
    ])
}

fn default_max_lines() -> usize {
    500
}

impl Config {
    /// Load config from the working directory or user config directory
    pub fn load() -> Result<Self> {
        Self::load_with_path(None)
    }

    /// Load configuration from a specific path, or use default search paths
    pub fn load_with_path(path: Option<String>) -> Result<Self> {
        // An explicit path must load; a broken one is the caller's problem
        if let Some(config_path) = path {
            debug!("Loading config from explicit path: {}", config_path);
            return Self::load_from_path(&config_path);
        }

        if let Ok(config) = Self::load_from_path("treescribe.toml") {
            debug!("Loaded config from ./treescribe.toml");
            return Ok(config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("treescribe").join("config.toml");
            if let Ok(config) = Self::load_from_path(&config_path) {
                debug!("Loaded config from {:?}", config_path);
                return Ok(config);
            }
        }

        debug!("Using default config");
        Ok(Self::default())
    }

    fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scan.report_file, "modules.md");
        assert_eq!(config.scan.batch_size, 5);
        assert_eq!(config.scan.max_label_len, 50);
        assert!(config.scan.ignored_dirs.contains(&".git".to_string()));
        assert_eq!(config.fetch.cache_ttl_secs, 3600);
        assert_eq!(config.fetch.projects.len(), 2);
        assert_eq!(config.skill.max_lines, 500);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("report_file = \"modules.md\""));
        assert!(toml_str.contains("anomalyco/opencode"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str("[scan]\nbatch_size = 2\n").unwrap();
        assert_eq!(config.scan.batch_size, 2);
        assert_eq!(config.scan.max_files_scanned, 5);
        assert_eq!(config.fetch.api_base, "https://api.github.com/repos");
        assert_eq!(config.skill.name, "opencodedoc");
    }

    #[test]
    fn test_load_with_explicit_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("custom.toml");
        fs::write(&path, "[scan]\nreport_file = \"MAP.md\"\n").unwrap();
        let config = Config::load_with_path(Some(path.to_string_lossy().to_string())).unwrap();
        assert_eq!(config.scan.report_file, "MAP.md");
    }

    #[test]
    fn test_load_with_missing_explicit_path_fails() {
        let result = Config::load_with_path(Some("/nonexistent/treescribe.toml".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_cache_path_explicit() {
        let mut fetch = FetchConfig::default();
        fetch.cache_file = Some(PathBuf::from("/tmp/cache.json"));
        assert_eq!(fetch.cache_path(), PathBuf::from("/tmp/cache.json"));
    }

    #[test]
    fn test_cache_path_default_file_name() {
        let fetch = FetchConfig::default();
        assert!(fetch.cache_path().ends_with("treescribe/fetch_cache.json"));
    }
}
