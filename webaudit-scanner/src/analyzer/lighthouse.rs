// Performance analyzer (lighthouse)

use super::process::{ToolCommand, parse_json_output, run_tool};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const TOOL: &str = "lighthouse";

/// Audits removed from the stored report: inline base64 images.
const BINARY_AUDITS: [&str; 3] = [
    "full-page-screenshot",
    "screenshot-thumbnails",
    "final-screenshot",
];

/// Top-level sections removed from the stored report.
const VERBOSE_SECTIONS: [&str; 2] = ["i18n", "timing"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LighthouseConfig {
    pub program: String,
    pub preset: String,
    pub chrome_flags: String,
    pub timeout_secs: u64,
}

impl Default for LighthouseConfig {
    fn default() -> Self {
        Self {
            program: "./node_modules/lighthouse/lighthouse-cli/index.js".to_string(),
            preset: "desktop".to_string(),
            chrome_flags: "--headless --disable-gpu --no-sandbox".to_string(),
            timeout_secs: 300,
        }
    }
}

impl LighthouseConfig {
    pub fn command(&self, url: &str) -> ToolCommand {
        ToolCommand::new(TOOL, &self.program, Duration::from_secs(self.timeout_secs)).args([
            url.to_string(),
            "--output=json".to_string(),
            format!("--preset={}", self.preset),
            "--quiet".to_string(),
            "--only-categories=accessibility,best-practices,performance,seo".to_string(),
            format!("--chrome-flags={}", self.chrome_flags),
        ])
    }
}

/// A screenshot carried inline as a `data:` URI.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub mimetype: String,
    pub base64: String,
}

impl InlineImage {
    pub fn from_data_uri(data: &str) -> Option<Self> {
        let rest = data.strip_prefix("data:")?;
        let (mimetype, base64) = rest.split_once(";base64,")?;
        let (kind, subtype) = mimetype.split_once('/')?;
        if kind.is_empty() || subtype.is_empty() || base64.is_empty() {
            return None;
        }
        Some(Self {
            mimetype: mimetype.to_string(),
            base64: base64.to_string(),
        })
    }
}

/// The parts of a lighthouse report the auditor keeps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LighthouseSummary {
    pub performance: Option<f64>,
    pub accessibility: Option<f64>,
    pub best_practices: Option<f64>,
    pub seo: Option<f64>,
    pub run_warnings: Vec<String>,
    pub screenshot: Option<InlineImage>,
    /// The report without screenshots, i18n and timing sections.
    pub report: Value,
}

impl LighthouseSummary {
    pub fn from_report(mut report: Value) -> Self {
        let score = |category: &str| report["categories"][category]["score"].as_f64();
        let performance = score("performance");
        let accessibility = score("accessibility");
        let best_practices = score("best-practices");
        let seo = score("seo");

        let screenshot = report["audits"]["final-screenshot"]["details"]["data"]
            .as_str()
            .and_then(InlineImage::from_data_uri);

        let run_warnings: Vec<String> = report["runWarnings"]
            .as_array()
            .map(|warnings| {
                warnings
                    .iter()
                    .map(|w| match w {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        if let Some(object) = report.as_object_mut() {
            for section in VERBOSE_SECTIONS {
                object.remove(section);
            }
            if let Some(Value::Array(warnings)) = object.get_mut("runWarnings") {
                warnings.truncate(1);
            }
        }
        if let Some(audits) = report.get_mut("audits").and_then(Value::as_object_mut) {
            for audit in BINARY_AUDITS {
                audits.remove(audit);
            }
        }

        Self {
            performance,
            accessibility,
            best_practices,
            seo,
            run_warnings,
            screenshot,
            report,
        }
    }
}

/// Run lighthouse against `url`. `Ok(None)` when the tool printed nothing.
pub async fn run(config: &LighthouseConfig, url: &str) -> Result<Option<LighthouseSummary>> {
    let output = run_tool(&config.command(url), None).await?;
    Ok(parse_json_output(TOOL, &output)?.map(LighthouseSummary::from_report))
}
