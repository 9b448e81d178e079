//! Heuristic capability labels for leaf directories.
//!
//! Classification is first-match-wins over four tiers:
//! 1. position rules (root and first-level directory names, metadata only)
//! 2. path rules (path segments, then name keywords, then common names)
//! 3. file enumeration (no source files => resource label, nothing is read)
//! 4. content scan over a bounded sample of source files
//!
//! and finally a name-based fallback. Every tier is a plain table so rule
//! coverage can be enumerated directly.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::ScanConfig;
use crate::util::truncate_chars;
use crate::walker::{code_files, DirectoryNode, ProjectTree};

/// Label for directories without any source files
pub const NON_CODE_LABEL: &str = "Configuration or resource directory";
/// Label when source files exist but none could be read
pub const UNREADABLE_LABEL: &str = "No readable code files";

const FALLBACK_NAME_LEN: usize = 10;

/// What a path rule looks at. Names and segments are compared lowercased.
#[derive(Debug, Clone, Copy)]
pub enum Matcher {
    /// Directory name equals one of
    NameIs(&'static [&'static str]),
    /// Directory name contains one of
    NameContains(&'static [&'static str]),
    /// Any path segment equals one of
    Segment(&'static [&'static str]),
    /// A segment from the first set and a segment from the second set
    SegmentWith(&'static [&'static str], &'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct PathRule {
    pub matcher: Matcher,
    pub label: &'static str,
}

const fn rule(matcher: Matcher, label: &'static str) -> PathRule {
    PathRule { matcher, label }
}

use Matcher::{NameContains, NameIs, Segment, SegmentWith};

const API: &[&str] = &["api", "apis", "rpc"];

/// Root and first-level directories
pub const POSITION_RULES: &[PathRule] = &[
    rule(NameIs(&["api", "apis"]), "API definition layer"),
    rule(NameIs(&["service", "services"]), "Business service layer"),
    rule(NameIs(&["platform", "core"]), "Platform core module"),
    rule(
        NameContains(&["common", "shared", "util"]),
        "Shared utilities and components",
    ),
    rule(
        NameIs(&["config", "conf", "settings"]),
        "System configuration management",
    ),
    rule(NameIs(&["test", "tests"]), "Test cases"),
    rule(NameIs(&["doc", "docs"]), "Documentation directory"),
    rule(NameIs(&["run", "dist", "build", "bin"]), "Runtime output directory"),
    rule(NameIs(&["tmp", "temp", "cache"]), "Temporary files directory"),
    rule(NameIs(&["vendor", "third_party"]), "Third-party dependencies"),
    rule(NameIs(&["scripts", "script"]), "Scripts and tooling"),
    rule(NameIs(&["modules", "mod"]), "Feature module collection"),
    rule(NameIs(&["assets"]), "Static assets directory"),
    rule(
        NameIs(&["references", "ref", "refs"]),
        "Reference materials directory",
    ),
    rule(NameIs(&["lib", "libs"]), "Library dependencies directory"),
    rule(NameIs(&["include", "includes"]), "Header files directory"),
    rule(NameIs(&["src", "source"]), "Source code directory"),
];

/// Any depth. Segment rules first (earlier entries shadow later ones),
/// then keywords inside the directory's own name, then common names.
pub const PATH_RULES: &[PathRule] = &[
    rule(SegmentWith(API, &["plat"]), "Platform API interface"),
    rule(SegmentWith(API, &["agent"]), "Agent API interface"),
    rule(Segment(API), "RESTful API interface"),
    rule(SegmentWith(&["service"], &["manage"]), "Management service"),
    rule(SegmentWith(&["service"], &["dashboard"]), "Dashboard service"),
    rule(SegmentWith(&["service"], &["agent"]), "Agent service"),
    rule(SegmentWith(&["service"], &["public"]), "Public service"),
    rule(Segment(&["service"]), "Business service"),
    rule(Segment(&["hr"]), "Human resources module"),
    rule(Segment(&["enterprise"]), "Enterprise management module"),
    rule(Segment(&["pay"]), "Payment service module"),
    rule(Segment(&["mail"]), "Mail service module"),
    rule(Segment(&["sms"]), "SMS service module"),
    rule(Segment(&["video"]), "Video processing module"),
    rule(Segment(&["file"]), "File management module"),
    rule(Segment(&["user"]), "User management module"),
    rule(Segment(&["auth"]), "Authentication module"),
    rule(Segment(&["ai"]), "AI service module"),
    rule(Segment(&["search"]), "Search service module"),
    rule(Segment(&["recruitment"]), "Recruitment management module"),
    rule(Segment(&["resume"]), "Resume management module"),
    rule(Segment(&["course"]), "Course management module"),
    rule(Segment(&["tex"]), "Exam assessment module"),
    rule(Segment(&["workorder"]), "Work order module"),
    rule(Segment(&["notice"]), "Notification module"),
    rule(Segment(&["invoice"]), "Invoice management module"),
    rule(Segment(&["contract"]), "Contract management module"),
    rule(Segment(&["order"]), "Order management module"),
    rule(Segment(&["product"]), "Product management module"),
    rule(Segment(&["resource"]), "Resource management module"),
    rule(Segment(&["cluster"]), "Cluster management module"),
    rule(Segment(&["container"]), "Container management module"),
    rule(Segment(&["gpu"]), "GPU resource module"),
    rule(Segment(&["hardware"]), "Hardware management module"),
    rule(Segment(&["network"]), "Network management module"),
    rule(Segment(&["log", "logger"]), "Logging module"),
    rule(Segment(&["cache", "redis"]), "Cache service module"),
    rule(Segment(&["db", "database"]), "Database module"),
    rule(Segment(&["mq", "queue"]), "Message queue module"),
    rule(Segment(&["event"]), "Event handling module"),
    rule(Segment(&["driver"]), "Driver adaptation layer"),
    rule(Segment(&["adapter"]), "Adapter layer"),
    rule(Segment(&["middleware"]), "Middleware layer"),
    rule(Segment(&["controller", "handler"]), "Controller layer"),
    rule(Segment(&["model", "entity"]), "Data model layer"),
    rule(Segment(&["common", "util"]), "Common utilities module"),
    rule(Segment(&["security"]), "Security module"),
    rule(Segment(&["test"]), "Test module"),
    // keywords inside the directory's own name
    rule(NameContains(&["api"]), "API interface"),
    rule(NameContains(&["service"]), "Business service"),
    rule(NameContains(&["controller", "handler"]), "Request controller"),
    rule(NameContains(&["model"]), "Data model"),
    rule(NameContains(&["adapter"]), "Adapter layer"),
    rule(NameContains(&["driver"]), "Driver layer"),
    rule(NameContains(&["middleware"]), "Middleware layer"),
    rule(NameContains(&["auth"]), "Authentication logic"),
    rule(NameContains(&["config"]), "Configuration management"),
    rule(NameContains(&["util", "common"]), "Utility helpers"),
    // common directory names
    rule(NameIs(&["conf", "configs"]), "Configuration files directory"),
    rule(NameIs(&["certs", "certificates"]), "Certificate files directory"),
    rule(NameIs(&["example", "examples", "demo"]), "Example code"),
    rule(NameIs(&["test", "tests", "spec"]), "Test cases"),
    rule(NameIs(&["doc", "docs", "readme"]), "Documentation directory"),
    rule(NameIs(&["log", "logs"]), "Log directory"),
];

/// Keywords tested against the directory name, then file names, then file contents
pub const CONTENT_KEYWORDS: &[(&str, &str)] = &[
    ("auth", "Authentication module"),
    ("config", "Configuration management"),
    ("util", "Utility helpers"),
    ("api", "API interface"),
    ("model", "Data model"),
    ("service", "Business service"),
    ("test", "Test cases"),
    ("controller", "Request controller"),
    ("middleware", "Middleware layer"),
    ("client", "Client library"),
    ("server", "Server runtime"),
    ("cache", "Caching layer"),
    ("log", "Logging support"),
    ("security", "Security module"),
    ("event", "Event handling"),
    ("task", "Task scheduling"),
    ("socket", "Socket communication"),
    ("storage", "Storage module"),
    ("driver", "Driver layer"),
    ("adapter", "Adapter layer"),
];

/// Lowercased view of a directory's position in the tree
#[derive(Debug, Clone)]
pub struct PathContext {
    pub name: String,
    pub segments: Vec<String>,
}

impl PathContext {
    pub fn new(name: &str, segments: &[String]) -> Self {
        Self {
            name: name.to_lowercase(),
            segments: segments.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    fn has_segment(&self, set: &[&str]) -> bool {
        self.segments.iter().any(|s| set.contains(&s.as_str()))
    }
}

impl Matcher {
    pub fn matches(&self, ctx: &PathContext) -> bool {
        match self {
            Matcher::NameIs(names) => names.contains(&ctx.name.as_str()),
            Matcher::NameContains(keys) => keys.iter().any(|k| ctx.name.contains(k)),
            Matcher::Segment(set) => ctx.has_segment(set),
            Matcher::SegmentWith(a, b) => ctx.has_segment(a) && ctx.has_segment(b),
        }
    }
}

pub fn first_match(rules: &[PathRule], ctx: &PathContext) -> Option<&'static str> {
    rules.iter().find(|r| r.matcher.matches(ctx)).map(|r| r.label)
}

fn keyword_label(text: &str) -> Option<&'static str> {
    CONTENT_KEYWORDS
        .iter()
        .find(|(key, _)| text.contains(key))
        .map(|(_, label)| *label)
}

/// `<name, at most 10 chars> related module`
pub fn fallback_label(name: &str) -> String {
    format!("{} related module", truncate_chars(name, FALLBACK_NAME_LEN))
}

#[derive(Debug, Clone)]
pub struct Classifier {
    code_extensions: Vec<String>,
    max_files_scanned: usize,
    max_label_len: usize,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}

impl Classifier {
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            code_extensions: config.code_extensions.clone(),
            max_files_scanned: config.max_files_scanned,
            max_label_len: config.max_label_len,
        }
    }

    /// Label a directory. Never fails: unreadable files are skipped and an
    /// inconclusive scan degrades to [`fallback_label`]. The result is cut to
    /// the configured label length.
    pub fn classify(&self, tree: &ProjectTree, node: &DirectoryNode) -> String {
        let label = self.raw_label(tree, node);
        truncate_chars(&label, self.max_label_len).trim_end().to_string()
    }

    fn raw_label(&self, tree: &ProjectTree, node: &DirectoryNode) -> String {
        let ctx = PathContext::new(node.name(), &tree.segments(&node.path));

        if node.depth <= 1 {
            if let Some(label) = first_match(POSITION_RULES, &ctx) {
                return label.to_string();
            }
        }
        if let Some(label) = first_match(PATH_RULES, &ctx) {
            return label.to_string();
        }

        let files = code_files(&node.path, &self.code_extensions);
        if files.is_empty() {
            return NON_CODE_LABEL.to_string();
        }
        self.scan_contents(&node.path, &ctx, &files)
    }

    fn scan_contents(&self, dir: &Path, ctx: &PathContext, files: &[PathBuf]) -> String {
        let mut content = String::new();
        let mut read_any = false;
        for file in files.iter().take(self.max_files_scanned) {
            match fs::read(file) {
                Ok(bytes) if bytes.is_empty() => {}
                Ok(bytes) => {
                    content.push_str(&String::from_utf8_lossy(&bytes).to_lowercase());
                    content.push('\n');
                    read_any = true;
                }
                Err(e) => warn!("Skipping unreadable file {}: {}", file.display(), e),
            }
        }
        if !read_any {
            return UNREADABLE_LABEL.to_string();
        }

        if let Some(label) = keyword_label(&ctx.name) {
            return label.to_string();
        }
        for file in files {
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if let Some(label) = keyword_label(&file_name) {
                return label.to_string();
            }
        }
        if let Some(label) = keyword_label(&content) {
            return label.to_string();
        }

        debug!("No keyword match for {}, using fallback", dir.display());
        let name = dir.file_name().and_then(|n| n.to_str()).unwrap_or(&ctx.name);
        fallback_label(name)
    }
}
