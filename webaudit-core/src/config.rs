// Run configuration (pure data) and runtime collaborators

use crate::data::AuditStore;
use crate::error::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use webaudit_scanner::{AnalyzerSelection, AuditUrl, Fetcher};

fn default_max_updates() -> usize {
    500
}

fn default_cache_folder() -> PathBuf {
    PathBuf::from("./cache")
}

fn default_rapports_folder() -> PathBuf {
    PathBuf::from(".")
}

fn default_content_type() -> String {
    "audit".to_string()
}

fn default_link_check_concurrency() -> usize {
    8
}

/// Everything an audit run needs to know, built once at the program boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    pub base_url: String,
    #[serde(default)]
    pub continue_run: bool,
    #[serde(default)]
    pub dry_run: bool,
    /// Pages audited per invocation when `continue_run` is set.
    #[serde(default = "default_max_updates")]
    pub max_updates: usize,
    #[serde(default = "default_cache_folder")]
    pub cache_folder: PathBuf,
    #[serde(default = "default_rapports_folder")]
    pub rapports_folder: PathBuf,
    /// Defaults to `<cache_folder>/audit.db`.
    #[serde(default)]
    pub database: Option<PathBuf>,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default)]
    pub ignore_regex: Option<String>,
    #[serde(default)]
    pub analyzers: AnalyzerSelection,
    #[serde(default = "default_link_check_concurrency")]
    pub link_check_concurrency: usize,
    #[serde(default)]
    pub show_progress: bool,
}

impl AuditConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            continue_run: false,
            dry_run: false,
            max_updates: default_max_updates(),
            cache_folder: default_cache_folder(),
            rapports_folder: default_rapports_folder(),
            database: None,
            content_type: default_content_type(),
            ignore_regex: None,
            analyzers: AnalyzerSelection::default(),
            link_check_concurrency: default_link_check_concurrency(),
            show_progress: false,
        }
    }

    pub fn seed_url(&self) -> Result<AuditUrl> {
        Ok(AuditUrl::parse(&self.base_url, None)?)
    }

    /// `<cache_folder>/<seed host>.json`
    pub fn checkpoint_path(&self) -> Result<PathBuf> {
        let seed = self.seed_url()?;
        Ok(self.cache_folder.join(format!("{}.json", seed.host())))
    }

    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.cache_folder.join("audit.db"))
    }

    pub fn ignore_pattern(&self) -> Result<Option<Regex>> {
        match self.ignore_regex.as_deref() {
            Some(pattern) if !pattern.is_empty() => Ok(Some(Regex::new(pattern)?)),
            _ => Ok(None),
        }
    }
}

/// Runtime collaborators passed next to an [`AuditConfig`]. Never serialised.
pub struct AuditContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub store: Box<dyn AuditStore>,
}

impl AuditContext {
    pub fn new(fetcher: Arc<dyn Fetcher>, store: Box<dyn AuditStore>) -> Self {
        Self { fetcher, store }
    }
}
