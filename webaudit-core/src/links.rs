// Classification of the links discovered on an audited page

use crate::audit::AuditResult;
use crate::frontier::CrawlFrontier;
use crate::rapport::{IGNORED_BY_REGEX, Rapport};
use futures::stream::{self, StreamExt};
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use webaudit_scanner::{AuditUrl, Fetcher, UrlReport};

/// Existence check for a link outside the allow-list: HEAD first, GET when
/// the server refuses HEAD with 405.
pub async fn check_link(fetcher: &dyn Fetcher, url: &AuditUrl) -> UrlReport {
    let target = url.canonical();
    let mut result = fetcher.head(&target).await;
    if result.status_code == Some(405) {
        debug!("HEAD not allowed on {}, retrying with GET", target);
        result = fetcher.get(&target).await;
    }

    UrlReport {
        url: url.url_string(),
        referer: url.referer().map(str::to_string),
        status_code: result.status_code.unwrap_or(0),
        message: result.error,
    }
}

/// Routes each discovered link to the frontier, the link-health check or
/// the ignored sheet.
pub struct LinkClassifier {
    fetcher: Arc<dyn Fetcher>,
    ignore: Option<Regex>,
    concurrency: usize,
    /// Reports by canonical URL, kept for the whole run.
    cache: HashMap<String, UrlReport>,
}

impl LinkClassifier {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            ignore: None,
            concurrency: 8,
            cache: HashMap::new(),
        }
    }

    pub fn with_ignore_pattern(mut self, ignore: Option<Regex>) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn is_ignored(&self, url: &AuditUrl) -> bool {
        self.ignore
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(url.path()))
    }

    /// Classify the links of `audit`.
    ///
    /// Internal links are in `frontier` when this returns. External links
    /// are checked concurrently, at most `concurrency` at a time.
    pub async fn classify(
        &mut self,
        audit: &mut AuditResult,
        frontier: &mut CrawlFrontier,
        rapport: &mut Rapport,
    ) {
        for ignored in audit.ignored_links() {
            rapport.add_ignored_link(ignored.referer.as_deref(), &ignored.url, &ignored.reason);
        }

        let mut external = Vec::new();
        for link in audit.links().to_vec() {
            if self.is_ignored(&link) {
                rapport.add_ignored_url(&link, IGNORED_BY_REGEX);
                continue;
            }
            if frontier.in_allowed_hosts(link.host()) {
                frontier.add_url(link.clone());
                audit.add_internal_link(link);
            } else {
                external.push(link);
            }
        }

        let pending: Vec<AuditUrl> = external
            .iter()
            .filter(|link| !self.cache.contains_key(&link.canonical()))
            .cloned()
            .collect();
        let fetcher = self.fetcher.clone();
        let checked: Vec<(String, UrlReport)> = stream::iter(pending)
            .map(|link| {
                let fetcher = fetcher.clone();
                async move {
                    let report = check_link(fetcher.as_ref(), &link).await;
                    (link.canonical(), report)
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;
        self.cache.extend(checked);

        for link in external {
            let Some(cached) = self.cache.get(&link.canonical()) else {
                continue;
            };
            let report = UrlReport {
                url: link.url_string(),
                referer: link.referer().map(str::to_string),
                ..cached.clone()
            };
            if !report.is_valid() {
                warn!(
                    "Broken link {} on {} ({}{})",
                    report.url,
                    audit.url(),
                    report.status_code,
                    report
                        .message
                        .as_deref()
                        .map(|m| format!(": {m}"))
                        .unwrap_or_default()
                );
                rapport.add_broken_link(&report);
            }
            audit.add_external_link(report);
        }
    }

    pub fn cached_reports(&self) -> usize {
        self.cache.len()
    }
}
