use crate::audit::{AuditResult, content_hash};
use crate::checkpoint::CheckpointFile;
use crate::config::{AuditConfig, AuditContext};
use crate::data::{AuditStore, SaveMode};
use crate::error::Result;
use crate::frontier::CrawlFrontier;
use crate::links::LinkClassifier;
use crate::orchestrator::AuditOrchestrator;
use crate::rapport::{IGNORED_BY_REGEX, REDIRECT_WITHOUT_LOCATION, Rapport};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Map;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use webaudit_scanner::{AuditUrl, Fetcher, UrlReport};

/// Callback for reporting audit progress
pub type AuditProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Totals of a run, as returned by [`execute_audit`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditSummary {
    pub pages_audited: usize,
    pub broken_links: usize,
    pub ignored_links: usize,
    pub warnings: usize,
    pub accessibility_errors: usize,
    pub security_errors: usize,
    /// False when the run stopped on the batch limit with URLs still pending.
    pub finished: bool,
    pub rapport_folder: Option<PathBuf>,
}

impl AuditSummary {
    fn new(pages_audited: usize, rapport: &Rapport, finished: bool) -> Self {
        Self {
            pages_audited,
            broken_links: rapport.broken_links.len(),
            ignored_links: rapport.ignored_links.len(),
            warnings: rapport.warnings.len(),
            accessibility_errors: rapport.accessibility_errors.len(),
            security_errors: rapport.security_errors.len(),
            finished,
            rapport_folder: None,
        }
    }
}

/// What happened to one URL popped from the frontier
#[derive(Debug)]
pub enum PageOutcome {
    /// Matched the ignore pattern; not fetched
    Ignored,
    /// No response, or a redirect that could not be followed
    Broken,
    /// Redirect recorded as a warning
    Redirect,
    Audited(Box<AuditResult>),
}

/// Fetches, audits and classifies single pages on behalf of the crawl loop.
pub struct PageAuditor {
    fetcher: Arc<dyn Fetcher>,
    orchestrator: AuditOrchestrator,
    classifier: LinkClassifier,
}

impl PageAuditor {
    pub fn new(config: &AuditConfig, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        let classifier = LinkClassifier::new(fetcher.clone())
            .with_ignore_pattern(config.ignore_pattern()?)
            .with_concurrency(config.link_check_concurrency);
        Ok(Self {
            fetcher,
            orchestrator: AuditOrchestrator::new(config.analyzers.clone()),
            classifier,
        })
    }

    /// Run the full pipeline for `url`. Every frontier addition it causes is
    /// applied before this returns.
    pub async fn audit_url(
        &mut self,
        url: &AuditUrl,
        frontier: &mut CrawlFrontier,
        rapport: &mut Rapport,
    ) -> PageOutcome {
        if self.classifier.is_ignored(url) {
            rapport.add_ignored_url(url, IGNORED_BY_REGEX);
            return PageOutcome::Ignored;
        }

        let result = self.fetcher.get(&url.canonical()).await;
        let Some(status_code) = result.status_code else {
            warn!(
                "No response from {}: {}",
                url,
                result.error.as_deref().unwrap_or("unknown error")
            );
            rapport.add_broken_link(&UrlReport {
                url: url.url_string(),
                referer: url.referer().map(str::to_string),
                status_code: 0,
                message: result.error.clone(),
            });
            return PageOutcome::Broken;
        };

        if result.is_redirect() {
            return self.follow_redirect(url, status_code, result.location(), frontier, rapport);
        }

        let hash = content_hash(&result.body);
        let mut audit = self.orchestrator.analyze(url, &result, &hash).await;

        if !audit.is_valid() {
            warn!("Broken page {} ({})", url, status_code);
            rapport.add_broken_link(&audit.url_report());
        }
        if !audit.pa11y().is_empty() {
            rapport.add_accessibility_error(
                &url.url_string(),
                audit.pa11y().len(),
                audit.accessibility(),
            );
        }
        if !audit.security_warnings().is_empty() {
            rapport.add_security_error(
                &url.url_string(),
                audit.security_warnings().len(),
                audit.best_practices(),
            );
        }
        if !audit.warnings().is_empty() {
            rapport.add_warnings(url, audit.warnings().to_vec());
        }

        self.classifier.classify(&mut audit, frontier, rapport).await;
        PageOutcome::Audited(Box::new(audit))
    }

    fn follow_redirect(
        &self,
        url: &AuditUrl,
        status_code: u16,
        location: Option<&str>,
        frontier: &mut CrawlFrontier,
        rapport: &mut Rapport,
    ) -> PageOutcome {
        let broken = |message: String| UrlReport {
            url: url.url_string(),
            referer: url.referer().map(str::to_string),
            status_code,
            message: Some(message),
        };

        let Some(location) = location else {
            rapport.add_broken_link(&broken(REDIRECT_WITHOUT_LOCATION.to_string()));
            return PageOutcome::Broken;
        };
        let target = match AuditUrl::parse(location, Some(&url.url_string())) {
            Ok(target) => target,
            Err(e) => {
                warn!("Unresolvable redirect from {} to {}: {}", url, location, e);
                rapport.add_broken_link(&broken(e.to_string()));
                return PageOutcome::Broken;
            }
        };

        if target.is_crawlable() && frontier.in_allowed_hosts(target.host()) {
            frontier.add_url(target);
            rapport.add_warnings(url, [format!("Redirect ({status_code}) to {location}")]);
        } else {
            rapport.add_warnings(
                url,
                [format!("External redirect ({status_code}) to {location}")],
            );
        }
        PageOutcome::Redirect
    }
}

/// Persist one audited page. Failures are logged, never returned.
fn persist(config: &AuditConfig, store: &mut dyn AuditStore, audit: &AuditResult) {
    let extra = if config.dry_run {
        Map::new()
    } else {
        match audit.upload_assets(&mut *store) {
            Ok(fields) => fields,
            Err(e) => {
                error!("Uploading assets of {} failed: {}", audit.url(), e);
                Map::new()
            }
        }
    };

    let record = audit.get_raw_data(extra);
    if let Err(e) = store.save(&audit.url().id(), &record, SaveMode::Replace) {
        error!("Saving audit of {} failed: {}", audit.url(), e);
    }
}

fn save_rapport(rapport: &Rapport, folder: &Path) -> Option<PathBuf> {
    match rapport.save(folder) {
        Ok(path) => Some(path),
        Err(e) => {
            error!("Saving rapport to {} failed: {}", folder.display(), e);
            None
        }
    }
}

/// Load the frontier and rapport to start from.
///
/// With `continue_run` an existing checkpoint is restored, re-seeded and
/// rewound; otherwise the run starts from the seed alone.
fn load_state(config: &AuditConfig, checkpoint_path: &Path) -> Result<(CrawlFrontier, Rapport)> {
    let seed = config.seed_url()?;
    if config.continue_run && CheckpointFile::exists(checkpoint_path) {
        let checkpoint = CheckpointFile::load(checkpoint_path)?;
        let mut frontier = checkpoint.frontier;
        frontier.add_url(seed);
        frontier.reset();
        info!(
            "Resuming audit from {} ({} of {} URLs done)",
            checkpoint_path.display(),
            frontier.visited(),
            frontier.len()
        );
        return Ok((frontier, checkpoint.rapport.unwrap_or_default()));
    }
    Ok((CrawlFrontier::new(seed), Rapport::new()))
}

/// Execute an audit run with the given configuration
///
/// Only checkpoint problems (corrupt file, I/O) are returned as errors.
/// Fetch, analyzer and persistence failures end up in the logs and the rapport.
pub async fn execute_audit(
    config: &AuditConfig,
    context: &mut AuditContext,
    progress_callback: Option<AuditProgressCallback>,
) -> Result<AuditSummary> {
    let checkpoint_path = config.checkpoint_path()?;
    let (mut frontier, mut rapport) = load_state(config, &checkpoint_path)?;
    let mut auditor = PageAuditor::new(config, context.fetcher.clone())?;

    if let Some(ref callback) = progress_callback {
        callback(format!("Starting auditing {}", config.base_url));
    }

    let progress_bar = if config.show_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Starting audit...");
        Some(pb)
    } else {
        None
    };

    let mut counter = 0;
    let mut rapport_folder = None;
    while frontier.has_next() {
        let url = frontier.next()?;
        debug!("Auditing {}", url);

        let audit = match auditor.audit_url(&url, &mut frontier, &mut rapport).await {
            PageOutcome::Audited(audit) => audit,
            other => {
                debug!("{} not audited: {:?}", url, other);
                continue;
            }
        };

        persist(config, context.store.as_mut(), &audit);
        CheckpointFile::write(&checkpoint_path, &mut frontier, Some(&rapport))?;
        rapport_folder = save_rapport(&rapport, &config.rapports_folder).or(rapport_folder);
        counter += 1;
        debug!(
            "Audited {} ({} internal, {} external links)",
            url,
            audit.internal_links().len(),
            audit.external_links().len()
        );

        if let Some(ref pb) = progress_bar {
            pb.set_message(format!(
                "Auditing... {}/{} URLs ({} audited)",
                frontier.visited(),
                frontier.len(),
                counter
            ));
            pb.tick();
        }
        if let Some(ref callback) = progress_callback {
            callback(format!("[{}/{}] {}", frontier.visited(), frontier.len(), url));
        }

        if config.continue_run && counter >= config.max_updates {
            info!("Batch limit of {} pages reached", config.max_updates);
            break;
        }
    }

    let finished = !frontier.has_next();
    if finished {
        CheckpointFile::clear(&checkpoint_path)?;
    } else {
        CheckpointFile::write(&checkpoint_path, &mut frontier, Some(&rapport))?;
    }
    rapport_folder = save_rapport(&rapport, &config.rapports_folder).or(rapport_folder);

    if let Some(ref pb) = progress_bar {
        pb.finish_with_message(format!("Audit complete! {} pages audited", counter));
    }

    Ok(AuditSummary {
        rapport_folder,
        ..AuditSummary::new(counter, &rapport, finished)
    })
}

/// Generate the end-of-run text report
pub fn generate_audit_report(summary: &AuditSummary) -> String {
    let count = |n: usize| {
        if n == 0 {
            n.to_string().green().to_string()
        } else {
            n.to_string().yellow().to_string()
        }
    };

    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Pages audited: {}\n", summary.pages_audited));
    report.push_str(&format!("  Broken links: {}\n", count(summary.broken_links)));
    report.push_str(&format!("  Ignored links: {}\n", summary.ignored_links));
    report.push_str(&format!("  Warnings: {}\n", count(summary.warnings)));
    report.push_str(&format!(
        "  Accessibility errors: {}\n",
        count(summary.accessibility_errors)
    ));
    report.push_str(&format!(
        "  Security errors: {}\n",
        count(summary.security_errors)
    ));
    report.push('\n');

    if summary.finished {
        report.push_str("  All discovered URLs have been audited.\n");
    } else {
        report.push_str(&format!(
            "  {} Run again with --continue to resume.\n",
            "Batch limit reached.".cyan()
        ));
    }
    if let Some(ref folder) = summary.rapport_folder {
        report.push_str(&format!("  Rapport: {}\n", folder.display()));
    }

    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    report
}
