// Cross-page audit rapport and its CSV artefact

use crate::error::Result;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use webaudit_scanner::{AuditUrl, UrlReport};

pub const IGNORED_BY_REGEX: &str = "Ignored by regex";
pub const NON_CRAWLABLE: &str = "non-crawlable";
pub const FRAGMENT_ONLY: &str = "Fragment-only link";
pub const REDIRECT_WITHOUT_LOCATION: &str = "Redirect without Location header";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokenLinkRow {
    pub referer: Option<String>,
    pub url: String,
    pub status_code: u16,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IgnoredLinkRow {
    pub referer: Option<String>,
    pub url: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningRow {
    pub referer: Option<String>,
    pub url: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessibilityRow {
    pub url: String,
    pub issues: usize,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityRow {
    pub url: String,
    pub missing_headers: usize,
    pub score: Option<f64>,
}

/// Append-only tables accumulated over a whole run, possibly spanning
/// several invocations through the checkpoint file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rapport {
    /// `YYYYmmdd-HHMMSS` of the run start; names the artefact folder.
    started: String,
    #[serde(default)]
    pub broken_links: Vec<BrokenLinkRow>,
    #[serde(default)]
    pub ignored_links: Vec<IgnoredLinkRow>,
    #[serde(default)]
    pub warnings: Vec<WarningRow>,
    #[serde(default)]
    pub accessibility_errors: Vec<AccessibilityRow>,
    #[serde(default)]
    pub security_errors: Vec<SecurityRow>,
}

impl Default for Rapport {
    fn default() -> Self {
        Self::new()
    }
}

impl Rapport {
    pub fn new() -> Self {
        Self::started_at(Local::now().format("%Y%m%d-%H%M%S").to_string())
    }

    pub fn started_at(started: impl Into<String>) -> Self {
        Self {
            started: started.into(),
            broken_links: Vec::new(),
            ignored_links: Vec::new(),
            warnings: Vec::new(),
            accessibility_errors: Vec::new(),
            security_errors: Vec::new(),
        }
    }

    pub fn started(&self) -> &str {
        &self.started
    }

    pub fn add_broken_link(&mut self, report: &UrlReport) {
        self.broken_links.push(BrokenLinkRow {
            referer: report.referer.clone(),
            url: report.url.clone(),
            status_code: report.status_code,
            message: report.message.clone(),
        });
    }

    pub fn add_ignored_url(&mut self, url: &AuditUrl, message: &str) {
        self.add_ignored_link(url.referer(), &url.url_string(), message);
    }

    pub fn add_ignored_link(&mut self, referer: Option<&str>, url: &str, message: &str) {
        self.ignored_links.push(IgnoredLinkRow {
            referer: referer.map(str::to_string),
            url: url.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_warnings<I, S>(&mut self, url: &AuditUrl, warnings: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for warning in warnings {
            self.warnings.push(WarningRow {
                referer: url.referer().map(str::to_string),
                url: url.url_string(),
                message: warning.into(),
            });
        }
    }

    pub fn add_accessibility_error(&mut self, url: &str, issues: usize, score: Option<f64>) {
        self.accessibility_errors.push(AccessibilityRow {
            url: url.to_string(),
            issues,
            score,
        });
    }

    pub fn add_security_error(&mut self, url: &str, missing_headers: usize, score: Option<f64>) {
        self.security_errors.push(SecurityRow {
            url: url.to_string(),
            missing_headers,
            score,
        });
    }

    pub fn folder_name(&self) -> String {
        format!("Audit-Rapport-{}", self.started)
    }

    /// Write one CSV per sheet into `<folder>/Audit-Rapport-<started>/`.
    ///
    /// Rewrites the same files on every call.
    pub fn save(&self, folder: &Path) -> Result<PathBuf> {
        let target = folder.join(self.folder_name());
        fs::create_dir_all(&target)?;

        write_sheet(
            &target.join("broken-links.csv"),
            &["Referer", "URL", "Status Code", "Error message"],
            self.broken_links.iter().map(|row| {
                vec![
                    row.referer.clone().unwrap_or_default(),
                    row.url.clone(),
                    row.status_code.to_string(),
                    row.message.clone().unwrap_or_default(),
                ]
            }),
        )?;
        write_sheet(
            &target.join("ignored-links.csv"),
            &["Referer", "URL", "Error message"],
            self.ignored_links.iter().map(|row| {
                vec![
                    row.referer.clone().unwrap_or_default(),
                    row.url.clone(),
                    row.message.clone(),
                ]
            }),
        )?;
        write_sheet(
            &target.join("warnings.csv"),
            &["Referer", "URL", "Warning message"],
            self.warnings.iter().map(|row| {
                vec![
                    row.referer.clone().unwrap_or_default(),
                    row.url.clone(),
                    row.message.clone(),
                ]
            }),
        )?;
        write_sheet(
            &target.join("accessibility.csv"),
            &["URL", "WCAG2AA", "Accessibility's score"],
            self.accessibility_errors.iter().map(|row| {
                vec![row.url.clone(), row.issues.to_string(), format_score(row.score)]
            }),
        )?;
        write_sheet(
            &target.join("security.csv"),
            &["URL", "Missing headers", "Best practice's score"],
            self.security_errors.iter().map(|row| {
                vec![
                    row.url.clone(),
                    row.missing_headers.to_string(),
                    format_score(row.score),
                ]
            }),
        )?;

        Ok(target)
    }
}

fn write_sheet<I>(path: &Path, header: &[&str], rows: I) -> Result<()>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

fn format_score(score: Option<f64>) -> String {
    score.map(|s| s.to_string()).unwrap_or_default()
}
