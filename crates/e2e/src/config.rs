//! Suite configuration
//!
//! Defaults, then an optional YAML file, then `DOCSEARCH_E2E_*` environment
//! variables. The harness applies its CLI flags last.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::playwright::{Browser, PlaywrightConfig};
use crate::server::ServerConfig;

/// Suite configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// The documentation site under test
    pub site: SiteConfig,

    /// Browser settings
    pub browser: PlaywrightConfig,

    /// Serve the site locally before running (None = already running)
    pub server: Option<ServerConfig>,

    /// Scenarios run concurrently, each in its own browser
    pub workers: usize,

    /// Where results and failure screenshots go
    pub output_dir: PathBuf,

    /// Extra YAML scenarios
    pub scenarios_dir: Option<PathBuf>,

    /// Node project providing `playwright` and `@playwright/test`
    pub project_dir: PathBuf,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            browser: PlaywrightConfig::default(),
            server: None,
            workers: 1,
            output_dir: PathBuf::from("test-results"),
            scenarios_dir: None,
            project_dir: PathBuf::from("."),
        }
    }
}

/// Site-specific settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Base URL of the documentation site
    pub base_url: String,

    /// Page the scenarios start from
    pub root_path: String,

    /// Regex matched against response URLs to detect a finished search
    pub search_host_pattern: String,

    /// Extra settle time after `networkidle` before pressing `/`
    pub listener_settle_ms: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            root_path: "/".to_string(),
            search_host_pattern: r"-dsn\.algolia\.net".to_string(),
            listener_settle_ms: 1000,
        }
    }
}

impl SuiteConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    /// Defaults, overlaid with `path` when given, then the environment
    pub fn load(path: Option<&Path>) -> E2eResult<Self> {
        let mut config = match path {
            Some(path) => {
                debug!("Loading config from {}", path.display());
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        config.apply_env_from(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply `DOCSEARCH_E2E_*` overrides read through `lookup`
    pub fn apply_env_from<F>(&mut self, lookup: F) -> E2eResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name).and_then(|v| {
                let v = v.trim().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        if let Some(url) = var("DOCSEARCH_E2E_BASE_URL") {
            self.site.base_url = url;
        }
        if let Some(pattern) = var("DOCSEARCH_E2E_SEARCH_HOST_PATTERN") {
            self.site.search_host_pattern = pattern;
        }
        if let Some(headless) = var("DOCSEARCH_E2E_HEADLESS") {
            self.browser.headless = !matches!(headless.as_str(), "0" | "false" | "no");
        }
        if let Some(workers) = var("DOCSEARCH_E2E_WORKERS") {
            self.workers = workers.parse().map_err(|_| {
                E2eError::Config(format!("DOCSEARCH_E2E_WORKERS is not a number: {}", workers))
            })?;
        }
        if let Some(browser) = var("DOCSEARCH_E2E_BROWSER") {
            self.browser.browser = browser.parse()?;
        }
        Ok(())
    }

    /// Reject settings that cannot produce a working run
    pub fn validate(&self) -> E2eResult<()> {
        if self.site.base_url.trim().is_empty() {
            return Err(E2eError::Config("base_url is empty".to_string()));
        }
        if self.workers == 0 {
            return Err(E2eError::Config("workers must be at least 1".to_string()));
        }
        if !self.site.root_path.starts_with('/') {
            return Err(E2eError::Config(format!(
                "root_path must start with '/': {}",
                self.site.root_path
            )));
        }
        regex::Regex::new(&self.site.search_host_pattern)?;
        if let Some(server) = &self.server {
            if server.command.is_empty() {
                return Err(E2eError::Config("server.command is empty".to_string()));
            }
        }
        Ok(())
    }

    /// Root page URL
    pub fn root_url(&self) -> String {
        format!(
            "{}{}",
            self.site.base_url.trim_end_matches('/'),
            self.site.root_path
        )
    }
}

impl std::str::FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" | "safari" => Ok(Browser::Webkit),
            other => Err(E2eError::Config(format!("unknown browser: {}", other))),
        }
    }
}
