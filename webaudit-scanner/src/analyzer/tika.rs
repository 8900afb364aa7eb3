// Text, locale and link extraction (Apache Tika app jar)

use super::process::{ToolCommand, run_tool};
use crate::error::{Result, ScanError};
use crate::html::anchor_hrefs;
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const TOOL: &str = "tika";

pub const DEFAULT_JAR_URL: &str = "https://dlcdn.apache.org/tika/2.6.0/tika-app-2.6.0.jar";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TikaConfig {
    pub java: String,
    pub jar: PathBuf,
    pub download_url: String,
    pub timeout_secs: u64,
}

impl Default for TikaConfig {
    fn default() -> Self {
        Self {
            java: "java".to_string(),
            jar: PathBuf::from("./cache/tika.jar"),
            download_url: DEFAULT_JAR_URL.to_string(),
            timeout_secs: 120,
        }
    }
}

impl TikaConfig {
    /// Default configuration with the jar stored in `cache_folder`.
    pub fn in_cache_folder(cache_folder: &Path) -> Self {
        Self {
            jar: cache_folder.join("tika.jar"),
            ..Self::default()
        }
    }

    pub fn command(&self, option: &str) -> ToolCommand {
        ToolCommand::new(TOOL, &self.java, Duration::from_secs(self.timeout_secs)).args([
            "-jar".to_string(),
            self.jar.to_string_lossy().into_owned(),
            option.to_string(),
        ])
    }

    /// Download the jar unless it is already present.
    pub async fn ensure_jar(&self, client: &Client) -> Result<()> {
        if tokio::fs::try_exists(&self.jar).await? {
            return Ok(());
        }
        info!("Downloading {} to {}", self.download_url, self.jar.display());

        let response = client.get(&self.download_url).send().await?;
        if !response.status().is_success() {
            return Err(ScanError::Other(format!(
                "Downloading {} failed with HTTP {}",
                self.download_url,
                response.status()
            )));
        }
        let bytes = response.bytes().await?;

        if let Some(parent) = self.jar.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Written aside, renamed once complete
        let partial = self.jar.with_extension("jar.part");
        tokio::fs::write(&partial, &bytes).await?;
        tokio::fs::rename(&partial, &self.jar).await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextExtraction {
    pub locale: Option<String>,
    pub content: Option<String>,
    /// Raw anchor hrefs found in the HTML rendition.
    pub links: Vec<String>,
}

/// Run the three extractions concurrently over the same buffered body.
pub async fn extract(config: &TikaConfig, body: Bytes) -> Result<TextExtraction> {
    let language = config.command("--language");
    let text = config.command("--text");
    let html = config.command("--html");
    let (locale, content, html) = tokio::try_join!(
        run_tool(&language, Some(body.clone())),
        run_tool(&text, Some(body.clone())),
        run_tool(&html, Some(body)),
    )?;

    Ok(TextExtraction {
        locale: non_empty(locale.trim()),
        content: non_empty(&content),
        links: anchor_hrefs(&html),
    })
}

fn non_empty(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
