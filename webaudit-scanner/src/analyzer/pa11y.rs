// Accessibility analyzer (pa11y)

use super::process::{ToolCommand, parse_json_output, run_tool};
use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const TOOL: &str = "pa11y";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pa11yConfig {
    pub program: String,
    /// Accessibility standard passed with `-s`.
    pub standard: String,
    pub timeout_secs: u64,
}

impl Default for Pa11yConfig {
    fn default() -> Self {
        Self {
            program: "./node_modules/pa11y/bin/pa11y.js".to_string(),
            standard: "WCAG2AA".to_string(),
            timeout_secs: 180,
        }
    }
}

impl Pa11yConfig {
    pub fn command(&self, url: &str) -> ToolCommand {
        ToolCommand::new(TOOL, &self.program, Duration::from_secs(self.timeout_secs))
            .args(["-s", self.standard.as_str(), "-r", "json", url])
            // pa11y exits with 2 when it found issues
            .with_success_codes(vec![0, 2])
    }
}

/// Run pa11y against `url` and return the reported issues.
pub async fn run(config: &Pa11yConfig, url: &str) -> Result<Vec<Value>> {
    let output = run_tool(&config.command(url), None).await?;
    issues_from_output(&output)
}

pub fn issues_from_output(output: &str) -> Result<Vec<Value>> {
    match parse_json_output(TOOL, output)? {
        None => Ok(Vec::new()),
        Some(Value::Array(issues)) => Ok(issues),
        Some(Value::Object(mut report)) => match report.remove("issues") {
            Some(Value::Array(issues)) => Ok(issues),
            _ => Err(ScanError::MalformedOutput {
                tool: TOOL.to_string(),
                reason: "report object without an issues array".to_string(),
            }),
        },
        Some(other) => Err(ScanError::MalformedOutput {
            tool: TOOL.to_string(),
            reason: format!("unexpected JSON value: {other}"),
        }),
    }
}
