// Per-resource audit pipeline

use crate::audit::AuditResult;
use crate::rapport::FRAGMENT_ONLY;
use crate::security::check_security_headers;
use bytes::Bytes;
use tracing::{error, info};
use webaudit_scanner::analyzer::{lighthouse, pa11y, tika};
use webaudit_scanner::html::{anchor_hrefs, is_fragment_only};
use webaudit_scanner::{AnalyzerKind, AnalyzerSelection, AuditUrl, FetchResult};

/// Runs the header audit and link extraction, then the requested external
/// analyzers concurrently, and merges everything into an [`AuditResult`].
///
/// Holds configuration only. Frontier and rapport updates happen in the
/// caller once `analyze` has returned.
#[derive(Debug, Clone, Default)]
pub struct AuditOrchestrator {
    analyzers: AnalyzerSelection,
}

impl AuditOrchestrator {
    pub fn new(analyzers: AnalyzerSelection) -> Self {
        Self { analyzers }
    }

    pub async fn analyze(&self, url: &AuditUrl, result: &FetchResult, hash: &str) -> AuditResult {
        let mut audit = AuditResult::new(url.clone(), hash);
        audit.set_error_message(result.error.clone());

        let Some(status_code) = result.status_code else {
            audit.set_valid(false);
            return audit;
        };
        audit.set_status_code(status_code);
        audit.set_mimetype(result.mimetype().map(str::to_string));
        for warning in check_security_headers(result) {
            audit.add_security_warning(warning);
        }

        if result.is_html() {
            let html = String::from_utf8_lossy(&result.body);
            add_hrefs(&mut audit, anchor_hrefs(&html));
        } else {
            info!(
                "Mimetype {} not supported to extract links from {}",
                result.mimetype().unwrap_or("unknown"),
                url
            );
        }

        if status_code >= 400 {
            audit.set_valid(false);
            return audit;
        }

        self.run_analyzers(&mut audit, result).await;
        audit
    }

    async fn run_analyzers(&self, audit: &mut AuditResult, result: &FetchResult) {
        let target = audit.url().canonical();
        let body: Bytes = result.body.clone();

        let accessibility = async {
            let config = self.analyzers.accessibility.as_ref()?;
            if !accepts(AnalyzerKind::Accessibility, result, &target) {
                return None;
            }
            Some(pa11y::run(config, &target).await)
        };
        let performance = async {
            let config = self.analyzers.performance.as_ref()?;
            if !accepts(AnalyzerKind::Performance, result, &target) {
                return None;
            }
            Some(lighthouse::run(config, &target).await)
        };
        let text = async {
            let config = self.analyzers.text.as_ref()?;
            if !accepts(AnalyzerKind::TextExtraction, result, &target) {
                return None;
            }
            Some(tika::extract(config, body).await)
        };

        let (accessibility, performance, text) = tokio::join!(accessibility, performance, text);

        match accessibility {
            Some(Ok(issues)) => audit.set_pa11y(issues),
            Some(Err(e)) => error!("Pa11y audit for {} failed: {}", target, e),
            None => {}
        }

        match performance {
            Some(Ok(Some(summary))) => {
                audit.set_scores(
                    summary.performance,
                    summary.accessibility,
                    summary.best_practices,
                    summary.seo,
                );
                for warning in summary.run_warnings {
                    audit.add_warning(warning);
                }
                audit.set_screenshot(summary.screenshot);
                audit.set_lighthouse_report(summary.report);
            }
            Some(Ok(None)) => info!("Lighthouse returned no report for {}", target),
            Some(Err(e)) => error!("Lighthouse audit for {} failed: {}", target, e),
            None => {}
        }

        match text {
            Some(Ok(extraction)) => {
                audit.set_locale(extraction.locale);
                audit.set_content(extraction.content);
                add_hrefs(
                    audit,
                    extraction
                        .links
                        .into_iter()
                        .filter(|href| !is_fragment_only(href))
                        .collect(),
                );
            }
            Some(Err(e)) => error!("Tika audit for {} failed: {}", target, e),
            None => {}
        }
    }
}

/// Whether an analyzer of `kind` can process the fetched document.
fn accepts(kind: AnalyzerKind, result: &FetchResult, target: &str) -> bool {
    if kind.html_only() && !result.is_html() {
        info!(
            "Mimetype {} not supported by the {:?} analyzer, skipping {}",
            result.mimetype().unwrap_or("unknown"),
            kind,
            target
        );
        return false;
    }
    true
}

/// Resolve raw hrefs against the page and record them on `audit`.
fn add_hrefs(audit: &mut AuditResult, hrefs: Vec<String>) {
    let page = audit.url().url_string();
    for href in hrefs {
        if is_fragment_only(&href) {
            audit.add_ignored_link(&href, Some(&page), FRAGMENT_ONLY);
            continue;
        }
        match AuditUrl::parse(&href, Some(&page)) {
            Ok(link) => audit.add_link(link),
            Err(e) => {
                info!("Ignoring link {} on {}: {}", href, page, e);
                audit.add_ignored_link(&href, Some(&page), &e.to_string());
            }
        }
    }
}
