//! External analysis tools, each run as a short-lived subprocess.
//!
//! Analyzers are selected through [`AnalyzerConfig`], a closed set of
//! variants each carrying its own configuration. Nothing is looked up by
//! name at runtime besides [`AnalyzerConfig::from_key`] for CLI flags.

pub mod lighthouse;
pub mod pa11y;
pub mod process;
pub mod tika;

pub use lighthouse::{InlineImage, LighthouseConfig, LighthouseSummary};
pub use pa11y::Pa11yConfig;
pub use process::{ToolCommand, run_tool};
pub use tika::{TextExtraction, TikaConfig};

use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalyzerKind {
    Accessibility,
    Performance,
    TextExtraction,
}

impl AnalyzerKind {
    /// Whether the analyzer only understands HTML-family documents.
    pub fn html_only(&self) -> bool {
        matches!(self, AnalyzerKind::Accessibility)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalyzerConfig {
    Pa11y(Pa11yConfig),
    Lighthouse(LighthouseConfig),
    Tika(TikaConfig),
}

impl AnalyzerConfig {
    pub fn kind(&self) -> AnalyzerKind {
        match self {
            AnalyzerConfig::Pa11y(_) => AnalyzerKind::Accessibility,
            AnalyzerConfig::Lighthouse(_) => AnalyzerKind::Performance,
            AnalyzerConfig::Tika(_) => AnalyzerKind::TextExtraction,
        }
    }

    /// Default configuration for a tool name as given on the command line.
    pub fn from_key(key: &str, cache_folder: &Path) -> Result<Self> {
        match key.to_ascii_lowercase().as_str() {
            "pa11y" => Ok(AnalyzerConfig::Pa11y(Pa11yConfig::default())),
            "lighthouse" => Ok(AnalyzerConfig::Lighthouse(LighthouseConfig::default())),
            "tika" => Ok(AnalyzerConfig::Tika(TikaConfig::in_cache_folder(cache_folder))),
            other => Err(ScanError::Other(format!("Unknown analyzer: {other}"))),
        }
    }
}

/// The analyzers requested for a run, at most one per kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerSelection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessibility: Option<Pa11yConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<LighthouseConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TikaConfig>,
}

impl AnalyzerSelection {
    pub fn all(cache_folder: &Path) -> Self {
        Self {
            accessibility: Some(Pa11yConfig::default()),
            performance: Some(LighthouseConfig::default()),
            text: Some(TikaConfig::in_cache_folder(cache_folder)),
        }
    }

    /// Enable an analyzer, replacing any earlier configuration of its kind.
    pub fn enable(&mut self, config: AnalyzerConfig) {
        match config {
            AnalyzerConfig::Pa11y(c) => self.accessibility = Some(c),
            AnalyzerConfig::Lighthouse(c) => self.performance = Some(c),
            AnalyzerConfig::Tika(c) => self.text = Some(c),
        }
    }

    pub fn from_configs(configs: impl IntoIterator<Item = AnalyzerConfig>) -> Self {
        let mut selection = Self::default();
        for config in configs {
            selection.enable(config);
        }
        selection
    }

    /// Replace the configuration of already enabled kinds, leaving the
    /// others disabled.
    pub fn override_enabled(&mut self, configs: impl IntoIterator<Item = AnalyzerConfig>) {
        for config in configs {
            let enabled = match config.kind() {
                AnalyzerKind::Accessibility => self.accessibility.is_some(),
                AnalyzerKind::Performance => self.performance.is_some(),
                AnalyzerKind::TextExtraction => self.text.is_some(),
            };
            if enabled {
                self.enable(config);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.accessibility.is_none() && self.performance.is_none() && self.text.is_none()
    }

    pub fn kinds(&self) -> Vec<AnalyzerKind> {
        let mut kinds = Vec::new();
        if self.accessibility.is_some() {
            kinds.push(AnalyzerKind::Accessibility);
        }
        if self.performance.is_some() {
            kinds.push(AnalyzerKind::Performance);
        }
        if self.text.is_some() {
            kinds.push(AnalyzerKind::TextExtraction);
        }
        kinds
    }
}
