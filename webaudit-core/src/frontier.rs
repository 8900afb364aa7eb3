// Resumable crawl frontier

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use webaudit_scanner::AuditUrl;

/// Discovered URLs in discovery order, the host allow-list and a cursor.
///
/// The cursor is the identity of the last URL handed out by [`next`](Self::next);
/// everything after it in discovery order is still pending. Only the crawl loop
/// mutates a frontier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlFrontier {
    urls: Vec<AuditUrl>,
    hosts: Vec<String>,
    cursor: Option<String>,

    #[serde(skip)]
    checkpoint_cursor: Option<String>,
    #[serde(skip)]
    position: Option<usize>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontierState {
    Empty,
    Seeded,
    Iterating,
    Exhausted,
}

impl Default for CrawlFrontier {
    fn default() -> Self {
        Self::empty()
    }
}

impl CrawlFrontier {
    pub fn empty() -> Self {
        Self {
            urls: Vec::new(),
            hosts: Vec::new(),
            cursor: None,
            checkpoint_cursor: None,
            position: None,
            index: HashMap::new(),
        }
    }

    pub fn new(seed: AuditUrl) -> Self {
        let mut frontier = Self::empty();
        frontier.add_url(seed);
        frontier
    }

    /// Insert `url` unless its identity is already known. Returns whether it
    /// was added. The URL's host joins the allow-list.
    pub fn add_url(&mut self, url: AuditUrl) -> bool {
        let id = url.id();
        if self.index.contains_key(&id) {
            return false;
        }
        if !self.in_allowed_hosts(url.host()) {
            self.hosts.push(url.host().to_string());
        }
        self.index.insert(id, self.urls.len());
        self.urls.push(url);
        true
    }

    pub fn has_next(&self) -> bool {
        self.next_position() < self.urls.len()
    }

    /// Advance the cursor and return the URL it now points at.
    pub fn next(&mut self) -> Result<AuditUrl> {
        let position = self.next_position();
        let url = self
            .urls
            .get(position)
            .cloned()
            .ok_or(CoreError::FrontierExhausted)?;
        self.position = Some(position);
        self.cursor = Some(url.id());
        Ok(url)
    }

    /// Rewind the cursor to where the last checkpoint left it.
    pub fn reset(&mut self) {
        self.cursor = self.checkpoint_cursor.clone();
        self.position = self
            .cursor
            .as_ref()
            .and_then(|id| self.index.get(id).copied());
    }

    /// Record the current cursor as the resume point.
    pub fn mark_checkpoint(&mut self) {
        self.checkpoint_cursor = self.cursor.clone();
    }

    pub fn checkpoint(&mut self) -> Result<Vec<u8>> {
        self.mark_checkpoint();
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn restore(bytes: &[u8]) -> Result<Self> {
        let frontier: CrawlFrontier = serde_json::from_slice(bytes)
            .map_err(|e| CoreError::CheckpointCorrupt(e.to_string()))?;
        frontier.reindex()
    }

    /// Rebuild the derived lookup state after deserialisation.
    pub(crate) fn reindex(mut self) -> Result<Self> {
        self.index.clear();
        for (position, url) in self.urls.iter().enumerate() {
            if self.index.insert(url.id(), position).is_some() {
                return Err(CoreError::CheckpointCorrupt(format!(
                    "duplicate URL {}",
                    url
                )));
            }
        }
        self.position = match &self.cursor {
            Some(id) => Some(self.index.get(id).copied().ok_or_else(|| {
                CoreError::CheckpointCorrupt(format!("cursor {id} is not a known URL"))
            })?),
            None => None,
        };
        self.checkpoint_cursor = self.cursor.clone();
        Ok(self)
    }

    pub fn in_allowed_hosts(&self, host: &str) -> bool {
        self.hosts.iter().any(|h| h.eq_ignore_ascii_case(host))
    }

    pub fn state(&self) -> FrontierState {
        if self.urls.is_empty() {
            FrontierState::Empty
        } else if !self.has_next() {
            FrontierState::Exhausted
        } else if self.cursor.is_none() {
            FrontierState::Seeded
        } else {
            FrontierState::Iterating
        }
    }

    pub fn contains(&self, url: &AuditUrl) -> bool {
        self.index.contains_key(&url.id())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Number of URLs already handed out.
    pub fn visited(&self) -> usize {
        self.position.map_or(0, |p| p + 1)
    }

    pub fn urls(&self) -> &[AuditUrl] {
        &self.urls
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    fn next_position(&self) -> usize {
        self.position.map_or(0, |p| p + 1)
    }
}

impl PartialEq for CrawlFrontier {
    fn eq(&self, other: &Self) -> bool {
        self.urls == other.urls && self.hosts == other.hosts && self.cursor == other.cursor
    }
}
