//! Project release and metadata fetcher with a TTL-bounded file cache.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{FetchConfig, ProjectConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    Versions,
    Changelog,
    Features,
    Faq,
}

impl QueryType {
    pub const ALL: [QueryType; 4] = [
        QueryType::Versions,
        QueryType::Changelog,
        QueryType::Features,
        QueryType::Faq,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QueryType::Versions => "versions",
            QueryType::Changelog => "changelog",
            QueryType::Features => "features",
            QueryType::Faq => "faq",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        match QueryType::ALL.iter().find(|q| q.as_str() == wanted) {
            Some(q) => Ok(*q),
            None => {
                let valid: Vec<&str> = QueryType::ALL.iter().map(|q| q.as_str()).collect();
                bail!("Unknown query type '{}'. Valid types: {}", s, valid.join(", "))
            }
        }
    }
}

// ============================================================================
// Cache
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    timestamp: DateTime<Utc>,
    data: Value,
}

/// JSON file mapping query type to its last result. Entries older than the
/// TTL are ignored; a corrupt file reads as empty.
pub struct FetchCache {
    path: PathBuf,
    ttl: ChronoDuration,
}

impl FetchCache {
    pub fn new(path: impl Into<PathBuf>, ttl_secs: u64) -> Self {
        let secs = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        Self {
            path: path.into(),
            ttl: ChronoDuration::try_seconds(secs).unwrap_or(ChronoDuration::MAX),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> HashMap<String, CacheEntry> {
        let Ok(content) = fs::read_to_string(&self.path) else {
            return HashMap::new();
        };
        match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Ignoring unreadable cache {}: {}", self.path.display(), e);
                HashMap::new()
            }
        }
    }

    pub fn get(&self, query: QueryType) -> Option<Value> {
        self.get_at(query, Utc::now())
    }

    pub fn get_at(&self, query: QueryType, now: DateTime<Utc>) -> Option<Value> {
        let entry = self.load().remove(query.as_str())?;
        (now - entry.timestamp < self.ttl).then_some(entry.data)
    }

    pub fn put(&self, query: QueryType, data: &Value) -> Result<()> {
        self.put_at(query, data, Utc::now())
    }

    pub fn put_at(&self, query: QueryType, data: &Value, now: DateTime<Utc>) -> Result<()> {
        let mut entries = self.load();
        entries.insert(
            query.as_str().to_string(),
            CacheEntry {
                timestamp: now,
                data: data.clone(),
            },
        );
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&entries)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write cache {}", self.path.display()))?;
        Ok(())
    }
}

// ============================================================================
// GitHub client
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Release {
    pub tag_name: String,
    pub name: Option<String>,
    pub published_at: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RepoInfo {
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub license: Option<License>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct License {
    pub name: String,
}

pub struct GitHubClient {
    api_base: String,
    client: Client,
}

impl GitHubClient {
    pub fn new(api_base: &str, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .user_agent(concat!("treescribe/", env!("CARGO_PKG_VERSION")))
                .build()
                .context("failed to build HTTP client")?,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header("accept", "application/vnd.github+json")
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            bail!("GitHub API error {}: {}", status, error_text);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }

    pub async fn latest_release(&self, repo: &str) -> Result<Release> {
        self.get_json(&format!("{}/{}/releases/latest", self.api_base, repo))
            .await
    }

    pub async fn repo_info(&self, repo: &str) -> Result<RepoInfo> {
        self.get_json(&format!("{}/{}", self.api_base, repo)).await
    }
}

// ============================================================================
// Fetcher
// ============================================================================

pub struct Fetcher {
    projects: Vec<ProjectConfig>,
    client: GitHubClient,
    cache: FetchCache,
    use_cache: bool,
}

impl Fetcher {
    pub fn from_config(config: &FetchConfig, use_cache: bool) -> Result<Self> {
        Ok(Self {
            projects: config.projects.clone(),
            client: GitHubClient::new(&config.api_base, config.timeout_secs)?,
            cache: FetchCache::new(config.cache_path(), config.cache_ttl_secs),
            use_cache,
        })
    }

    /// Answer a query, from the cache when fresh. Network failures for a
    /// single project degrade to empty fields instead of failing the query.
    pub async fn query(&self, query: QueryType) -> Result<Value> {
        if self.use_cache {
            if let Some(data) = self.cache.get(query) {
                info!("Using cached {} data", query);
                return Ok(data);
            }
        }

        info!("Fetching {} data", query);
        let data = match query {
            QueryType::Versions => self.versions().await,
            QueryType::Changelog => self.changelog().await,
            QueryType::Features => self.features(),
            QueryType::Faq => self.faq(),
        };

        if let Err(e) = self.cache.put(query, &data) {
            warn!("Failed to save cache: {:#}", e);
        }
        Ok(data)
    }

    async fn release_or_default(&self, project: &ProjectConfig) -> Release {
        match self.client.latest_release(&project.repo).await {
            Ok(release) => release,
            Err(e) => {
                warn!("Failed to fetch release for {}: {:#}", project.repo, e);
                Release::default()
            }
        }
    }

    async fn versions(&self) -> Value {
        let mut out = Map::new();
        for project in &self.projects {
            let release = self.release_or_default(project).await;
            let (stars, forks, license) = match self.client.repo_info(&project.repo).await {
                Ok(info) => (
                    info.stargazers_count,
                    info.forks_count,
                    info.license
                        .map(|l| l.name)
                        .unwrap_or_else(|| "Unknown".to_string()),
                ),
                Err(e) => {
                    warn!("Failed to fetch repo info for {}: {:#}", project.repo, e);
                    (0, 0, String::new())
                }
            };
            out.insert(
                project.key.clone(),
                json!({
                    "version": release.tag_name,
                    "release_name": release.name.unwrap_or_default(),
                    "released_at": release.published_at.unwrap_or_default(),
                    "stars": stars,
                    "forks": forks,
                    "license": license,
                }),
            );
        }
        Value::Object(out)
    }

    async fn changelog(&self) -> Value {
        let mut out = Map::new();
        for project in &self.projects {
            let release = self.release_or_default(project).await;
            out.insert(
                project.key.clone(),
                json!({
                    "version": release.tag_name,
                    "changes": release.body.unwrap_or_default(),
                }),
            );
        }
        Value::Object(out)
    }

    fn features(&self) -> Value {
        let out: Map<String, Value> = self
            .projects
            .iter()
            .map(|p| {
                (
                    p.key.clone(),
                    json!({ "description": p.description, "key_features": p.features }),
                )
            })
            .collect();
        Value::Object(out)
    }

    fn faq(&self) -> Value {
        let out: Map<String, Value> = self
            .projects
            .iter()
            .map(|p| (p.key.clone(), json!({ "common_questions": p.faq })))
            .collect();
        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project(key: &str, repo: &str) -> ProjectConfig {
        ProjectConfig {
            key: key.to_string(),
            repo: repo.to_string(),
            description: format!("{} description", key),
            features: vec!["Feature A".to_string()],
            faq: vec!["How to start?".to_string()],
        }
    }

    fn fetch_config(api_base: &str, cache_file: PathBuf) -> FetchConfig {
        FetchConfig {
            api_base: api_base.to_string(),
            cache_file: Some(cache_file),
            cache_ttl_secs: 3600,
            timeout_secs: 5,
            projects: vec![project("demo", "acme/demo")],
        }
    }

    #[test]
    fn test_query_type_parse() {
        assert_eq!("versions".parse::<QueryType>().unwrap(), QueryType::Versions);
        assert_eq!("FAQ".parse::<QueryType>().unwrap(), QueryType::Faq);
        let err = "bogus".parse::<QueryType>().unwrap_err().to_string();
        assert!(err.contains("bogus"));
        assert!(err.contains("versions, changelog, features, faq"));
    }

    #[test]
    fn test_cache_ttl_boundary() {
        let tmp = TempDir::new().unwrap();
        let cache = FetchCache::new(tmp.path().join("cache.json"), 3600);
        let stored_at = Utc::now();
        cache
            .put_at(QueryType::Features, &json!({"k": 1}), stored_at)
            .unwrap();

        let fresh = stored_at + ChronoDuration::seconds(3599);
        assert_eq!(cache.get_at(QueryType::Features, fresh), Some(json!({"k": 1})));

        let stale = stored_at + ChronoDuration::seconds(3600);
        assert_eq!(cache.get_at(QueryType::Features, stale), None);
        assert_eq!(cache.get_at(QueryType::Faq, fresh), None);
    }

    #[test]
    fn test_cache_keeps_other_entries() {
        let tmp = TempDir::new().unwrap();
        let cache = FetchCache::new(tmp.path().join("nested/cache.json"), 60);
        let now = Utc::now();
        cache.put_at(QueryType::Faq, &json!(1), now).unwrap();
        cache.put_at(QueryType::Features, &json!(2), now).unwrap();
        assert_eq!(cache.get_at(QueryType::Faq, now), Some(json!(1)));
        assert_eq!(cache.get_at(QueryType::Features, now), Some(json!(2)));
    }

    #[test]
    fn test_corrupt_cache_reads_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cache.json");
        fs::write(&path, "{ not json").unwrap();
        let cache = FetchCache::new(&path, 60);
        assert_eq!(cache.get(QueryType::Versions), None);
        cache.put(QueryType::Versions, &json!("ok")).unwrap();
        assert_eq!(cache.get(QueryType::Versions), Some(json!("ok")));
    }

    #[tokio::test]
    async fn test_versions_query() {
        let mut server = mockito::Server::new_async().await;
        let release = server
            .mock("GET", "/acme/demo/releases/latest")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"tag_name":"v1.2.0","name":"Spring","published_at":"2026-01-02T00:00:00Z","body":"- fixes"}"#,
            )
            .create_async()
            .await;
        let info = server
            .mock("GET", "/acme/demo")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"stargazers_count":42,"forks_count":7,"license":{"name":"MIT License"}}"#)
            .create_async()
            .await;

        let tmp = TempDir::new().unwrap();
        let config = fetch_config(&server.url(), tmp.path().join("cache.json"));
        let fetcher = Fetcher::from_config(&config, true).unwrap();
        let data = fetcher.query(QueryType::Versions).await.unwrap();

        assert_eq!(data["demo"]["version"], "v1.2.0");
        assert_eq!(data["demo"]["release_name"], "Spring");
        assert_eq!(data["demo"]["stars"], 42);
        assert_eq!(data["demo"]["forks"], 7);
        assert_eq!(data["demo"]["license"], "MIT License");
        release.assert_async().await;
        info.assert_async().await;
    }

    #[tokio::test]
    async fn test_network_failure_degrades() {
        let mut server = mockito::Server::new_async().await;
        let _release = server
            .mock("GET", "/acme/demo/releases/latest")
            .with_status(404)
            .create_async()
            .await;

        let tmp = TempDir::new().unwrap();
        let config = fetch_config(&server.url(), tmp.path().join("cache.json"));
        let fetcher = Fetcher::from_config(&config, false).unwrap();
        let data = fetcher.query(QueryType::Changelog).await.unwrap();

        assert_eq!(data["demo"]["version"], "");
        assert_eq!(data["demo"]["changes"], "");
    }

    #[tokio::test]
    async fn test_cached_query_skips_network() {
        let mut server = mockito::Server::new_async().await;
        let release = server
            .mock("GET", "/acme/demo/releases/latest")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"tag_name":"v2.0.0","body":"notes"}"#)
            .expect(1)
            .create_async()
            .await;

        let tmp = TempDir::new().unwrap();
        let config = fetch_config(&server.url(), tmp.path().join("cache.json"));
        let fetcher = Fetcher::from_config(&config, true).unwrap();
        let first = fetcher.query(QueryType::Changelog).await.unwrap();
        let second = fetcher.query(QueryType::Changelog).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second["demo"]["changes"], "notes");
        release.assert_async().await;
    }

    #[tokio::test]
    async fn test_static_queries() {
        let tmp = TempDir::new().unwrap();
        let config = fetch_config("http://127.0.0.1:9", tmp.path().join("cache.json"));
        let fetcher = Fetcher::from_config(&config, false).unwrap();

        let features = fetcher.query(QueryType::Features).await.unwrap();
        assert_eq!(features["demo"]["description"], "demo description");
        assert_eq!(features["demo"]["key_features"][0], "Feature A");

        let faq = fetcher.query(QueryType::Faq).await.unwrap();
        assert_eq!(faq["demo"]["common_questions"][0], "How to start?");
    }
}
