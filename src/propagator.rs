//! Bottom-up merging of child labels into a parent label.

use crate::classifier::Classifier;
use crate::config::ScanConfig;
use crate::util::truncate_chars;
use crate::walker::{DirectoryNode, ProjectTree};

const FALLBACK_NAME_LEN: usize = 15;
const MIN_THEME_LEN: usize = 4;

/// Well-known directory roles. Exact, case-sensitive names; first entry wins.
pub const OVERRIDES: &[(&[&str], &str)] = &[
    (
        &["src", "lib", "core", "source"],
        "Core source code and business logic",
    ),
    (
        &["test", "tests", "__tests__", "spec"],
        "Unit and integration test suites",
    ),
    (&["api", "apis", "routes"], "RESTful API and routing layer"),
    (
        &["components", "ui", "views", "pages"],
        "Frontend components and views",
    ),
    (&["hooks", "composables"], "Reusable hooks and composables"),
    (&["store", "state", "redux", "vuex"], "Global state management"),
    (
        &["styles", "css", "scss", "less"],
        "Stylesheets and theme configuration",
    ),
    (&["assets", "static", "public"], "Static assets and public files"),
    (
        &["vendor", "node_modules", "third_party"],
        "Third-party libraries and packages",
    ),
    (
        &["config", "settings", "env"],
        "System configuration and environment",
    ),
    (
        &["utils", "helpers", "commons"],
        "Shared utility functions and helpers",
    ),
    (&["services", "business"], "Business logic and service layer"),
    (
        &["models", "entities", "schemas"],
        "Data models and entity definitions",
    ),
    (&["controllers", "handlers"], "Controllers and request handling"),
    (
        &["middleware", "interceptors"],
        "Middleware and request interception",
    ),
    (&["client", "http", "request"], "HTTP client and request wrappers"),
    (&["server", "app", "main"], "Application bootstrap and server setup"),
    (
        &["database", "db", "repositories"],
        "Database access and persistence",
    ),
    (&["cache", "redis", "session"], "Cache and session management"),
    (&["logs", "logging", "monitor"], "Logging and monitoring"),
    (&["exceptions", "errors"], "Exception and error handling"),
    (
        &["events", "listeners", "observers"],
        "Event publishing and subscription",
    ),
    (
        &["tasks", "jobs", "queues", "workers"],
        "Async tasks and scheduled jobs",
    ),
    (
        &["socket", "websocket", "ws", "io"],
        "WebSocket and realtime communication",
    ),
    (
        &["storage", "files", "uploads"],
        "File storage and upload management",
    ),
    (
        &["security", "auth", "permission"],
        "Security and access protection",
    ),
    (
        &["locale", "i18n", "translations"],
        "Internationalization and localization",
    ),
    (&["platform", "kernel"], "Platform core and infrastructure"),
    (
        &["cluster", "distributed"],
        "Cluster management and distributed coordination",
    ),
    (
        &["communication", "comm", "interfaces"],
        "Platform communication and shared interfaces",
    ),
    (
        &["plugins", "extensions", "addons"],
        "Plugin extensions and modular loading",
    ),
    (
        &["documentation", "docs", "readme"],
        "Project documentation and usage guides",
    ),
];

pub fn override_label(name: &str) -> Option<&'static str> {
    OVERRIDES
        .iter()
        .find(|(names, _)| names.contains(&name))
        .map(|(_, label)| *label)
}

#[derive(Debug, Clone)]
pub struct Propagator {
    classifier: Classifier,
    max_len: usize,
}

impl Default for Propagator {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}

impl Propagator {
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            classifier: Classifier::from_config(config),
            max_len: config.max_label_len,
        }
    }

    /// Label a parent from its children's labels. With no child labels the
    /// directory is classified as if it were a leaf.
    pub fn propagate(
        &self,
        tree: &ProjectTree,
        node: &DirectoryNode,
        child_labels: &[String],
    ) -> String {
        if child_labels.is_empty() {
            return self.classifier.classify(tree, node);
        }
        self.merge(node.name(), child_labels)
    }

    /// Pure merge step: override table, homogeneous collapse, theme merge,
    /// then a name-keyword fallback. The result is cut to the label length.
    pub fn merge(&self, name: &str, child_labels: &[String]) -> String {
        let label = self.raw_merge(name, child_labels);
        truncate_chars(&label, self.max_len).trim_end().to_string()
    }

    fn raw_merge(&self, name: &str, child_labels: &[String]) -> String {
        if let Some(label) = override_label(name) {
            return label.to_string();
        }

        let mut unique: Vec<&str> = Vec::new();
        for label in child_labels {
            if !unique.contains(&label.as_str()) {
                unique.push(label);
            }
        }

        if unique.len() == 1 {
            return unique[0].to_string();
        }

        let themes: Vec<String> = unique
            .iter()
            .filter_map(|label| {
                let words: Vec<&str> = label.split_whitespace().collect();
                if words.len() < 2 {
                    return None;
                }
                let theme = words[..2].join(" ");
                (theme.chars().count() >= MIN_THEME_LEN).then_some(theme)
            })
            .collect();
        if themes.len() >= 2 {
            let combined = format!("{} and {}", themes[0], themes[1]);
            if combined.chars().count() <= self.max_len {
                return combined;
            }
        }

        let display = truncate_chars(name, FALLBACK_NAME_LEN);
        if name.contains("config") {
            format!("{} configuration management", display)
        } else if name.contains("test") {
            format!("{} test suite", display)
        } else if name.contains("api") {
            format!("{} interface module", display)
        } else {
            format!("{} feature module group", display)
        }
    }
}
