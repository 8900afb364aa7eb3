use crate::error::{Result, ScanError};
use bytes::Bytes;
use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// One invocation of an external helper tool.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    pub tool: String,
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
    /// Exit codes that still carry a usable report on stdout.
    pub success_codes: Vec<i32>,
}

impl ToolCommand {
    pub fn new(tool: &str, program: &str, timeout: Duration) -> Self {
        Self {
            tool: tool.to_string(),
            program: program.to_string(),
            args: Vec::new(),
            timeout,
            success_codes: vec![0],
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_success_codes(mut self, codes: Vec<i32>) -> Self {
        self.success_codes = codes;
        self
    }
}

/// Spawn the tool, feed `input` on stdin, and collect stdout.
///
/// The child is killed if the timeout elapses first.
pub async fn run_tool(command: &ToolCommand, input: Option<Bytes>) -> Result<String> {
    debug!("Starting {} ({} {:?})", command.tool, command.program, command.args);

    let mut child = Command::new(&command.program)
        .args(&command.args)
        .env("LANG", "en_US.utf-8")
        .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let writer = match (child.stdin.take(), input) {
        (Some(mut stdin), Some(input)) => Some(tokio::spawn(async move {
            // Ignore a broken pipe when the tool exits without reading stdin
            let _ = stdin.write_all(&input).await;
            let _ = stdin.shutdown().await;
        })),
        _ => None,
    };

    let output = match tokio::time::timeout(command.timeout, child.wait_with_output()).await {
        Ok(output) => output?,
        Err(_) => {
            return Err(ScanError::AnalyzerTimeout {
                tool: command.tool.clone(),
                seconds: command.timeout.as_secs(),
            });
        }
    };
    if let Some(writer) = writer {
        writer.await?;
    }

    let code = output.status.code();
    if !code.is_some_and(|c| command.success_codes.contains(&c)) {
        return Err(ScanError::AnalyzerFailed {
            tool: command.tool.clone(),
            code,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    debug!("{} finished ({} bytes of output)", command.tool, output.stdout.len());
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Decode a JSON report. Empty or `null` output means "no result".
pub fn parse_json_output(tool: &str, output: &str) -> Result<Option<Value>> {
    let trimmed = output.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|e| ScanError::MalformedOutput {
            tool: tool.to_string(),
            reason: e.to_string(),
        })
}
