// Checkpoint file: frontier snapshot plus the rapport of an unfinished run

use crate::error::{CoreError, Result};
use crate::frontier::CrawlFrontier;
use crate::rapport::Rapport;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

pub const CHECKPOINT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointFile {
    pub version: u32,
    pub frontier: CrawlFrontier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rapport: Option<Rapport>,
}

impl CheckpointFile {
    /// Snapshot `frontier` (marking its resume point) and write it to `path`.
    pub fn write(path: &Path, frontier: &mut CrawlFrontier, rapport: Option<&Rapport>) -> Result<()> {
        frontier.mark_checkpoint();
        let file = CheckpointFile {
            version: CHECKPOINT_VERSION,
            frontier: frontier.clone(),
            rapport: rapport.cloned(),
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        // Written aside, renamed once complete
        let partial = path.with_extension("json.part");
        fs::write(&partial, serde_json::to_vec_pretty(&file)?)?;
        fs::rename(&partial, path)?;
        debug!(
            "Checkpoint written to {} ({} URLs, cursor {:?})",
            path.display(),
            frontier.len(),
            frontier.cursor()
        );
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let file: CheckpointFile = serde_json::from_slice(&bytes)
            .map_err(|e| CoreError::CheckpointCorrupt(format!("{}: {}", path.display(), e)))?;
        if file.version != CHECKPOINT_VERSION {
            return Err(CoreError::CheckpointCorrupt(format!(
                "{}: unsupported version {}",
                path.display(),
                file.version
            )));
        }
        Ok(CheckpointFile {
            frontier: file.frontier.reindex()?,
            ..file
        })
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    /// Remove the checkpoint once the frontier is exhausted.
    pub fn clear(path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
