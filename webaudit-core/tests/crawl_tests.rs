// Tests for the crawl loop, link classification and resumption

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, LOCATION};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use webaudit_core::checkpoint::CheckpointFile;
use webaudit_core::crawl::{AuditProgressCallback, PageAuditor, PageOutcome};
use webaudit_core::data::{Database, DryRunSink};
use webaudit_core::frontier::CrawlFrontier;
use webaudit_core::links::{LinkClassifier, check_link};
use webaudit_core::orchestrator::AuditOrchestrator;
use webaudit_core::rapport::{
    FRAGMENT_ONLY, IGNORED_BY_REGEX, NON_CRAWLABLE, REDIRECT_WITHOUT_LOCATION, Rapport,
};
use webaudit_core::{AuditConfig, AuditContext, execute_audit};
use webaudit_scanner::analyzer::{LighthouseConfig, Pa11yConfig, TikaConfig};
use webaudit_scanner::AnalyzerSelection;
use webaudit_scanner::{AuditUrl, FetchResult, Fetcher};

/// Serves canned responses by canonical URL and records every request.
#[derive(Default)]
struct MemoryFetcher {
    pages: HashMap<String, FetchResult>,
    head_pages: HashMap<String, FetchResult>,
    gets: Mutex<Vec<String>>,
    heads: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    fn with(mut self, url: &str, result: FetchResult) -> Self {
        self.pages.insert(url.to_string(), result);
        self
    }

    fn with_head(mut self, url: &str, result: FetchResult) -> Self {
        self.head_pages.insert(url.to_string(), result);
        self
    }

    fn head_count(&self, url: &str) -> usize {
        self.heads.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    fn get_count(&self, url: &str) -> usize {
        self.gets.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn get(&self, url: &str) -> FetchResult {
        self.gets.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| FetchResult::with_error("connection refused"))
    }

    async fn head(&self, url: &str) -> FetchResult {
        self.heads.lock().unwrap().push(url.to_string());
        if let Some(result) = self.head_pages.get(url) {
            return result.clone();
        }
        match self.pages.get(url) {
            Some(result) => FetchResult::new(
                result.status_code.unwrap_or(0),
                result.headers.clone(),
                "",
            ),
            None => FetchResult::with_error("connection refused"),
        }
    }
}

fn html(status_code: u16, body: &str) -> FetchResult {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    FetchResult::new(status_code, headers, body.to_string())
}

fn redirect(status_code: u16, location: Option<&'static str>) -> FetchResult {
    let mut headers = HeaderMap::new();
    if let Some(location) = location {
        headers.insert(LOCATION, HeaderValue::from_static(location));
    }
    FetchResult::new(status_code, headers, "")
}

fn status(status_code: u16) -> FetchResult {
    FetchResult::new(status_code, HeaderMap::new(), "")
}

fn test_config(temp_dir: &TempDir, base_url: &str) -> AuditConfig {
    let mut config = AuditConfig::new(base_url);
    config.cache_folder = temp_dir.path().join("cache");
    config.rapports_folder = temp_dir.path().join("rapports");
    config
}

fn dry_context(fetcher: Arc<MemoryFetcher>) -> AuditContext {
    AuditContext::new(fetcher, Box::new(DryRunSink::new()))
}

fn seed() -> AuditUrl {
    AuditUrl::parse("https://example.com/", None).unwrap()
}

const HOME: &str = r##"
<html><body>
  <a href="/about">About</a>
  <a href="https://other.org">Elsewhere</a>
  <a href="#top">Top</a>
</body></html>
"##;

fn site() -> MemoryFetcher {
    MemoryFetcher::default()
        .with("https://example.com/", html(200, HOME))
        .with("https://example.com/about", html(200, "<p>About us</p>"))
        .with("https://other.org/", status(200))
}

// ============================================================================
// Page Audit Tests
// ============================================================================

#[tokio::test]
async fn test_audit_page_classifies_links() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, "https://example.com/");
    let fetcher = Arc::new(site());
    let mut auditor = PageAuditor::new(&config, fetcher.clone()).unwrap();
    let mut frontier = CrawlFrontier::new(seed());
    let mut rapport = Rapport::new();

    let url = frontier.next().unwrap();
    let outcome = auditor.audit_url(&url, &mut frontier, &mut rapport).await;

    let PageOutcome::Audited(audit) = outcome else {
        panic!("expected an audited page, got {outcome:?}");
    };
    assert_eq!(frontier.len(), 2);
    assert!(frontier.contains(&AuditUrl::parse("https://example.com/about", None).unwrap()));
    assert_eq!(audit.internal_links().len(), 1);
    assert_eq!(audit.external_links().len(), 1);
    assert_eq!(audit.external_links()[0].status_code, 200);
    assert_eq!(audit.security_warnings().len(), 6);

    assert_eq!(rapport.ignored_links.len(), 1);
    assert_eq!(rapport.ignored_links[0].url, "#top");
    assert_eq!(rapport.ignored_links[0].message, FRAGMENT_ONLY);
    assert_eq!(rapport.security_errors.len(), 1);
    assert!(rapport.broken_links.is_empty());

    // External links are checked, never crawled
    assert_eq!(fetcher.head_count("https://other.org/"), 1);
    assert_eq!(fetcher.get_count("https://other.org/"), 0);
}

#[tokio::test]
async fn test_repeated_non_crawlable_link_is_ignored_once() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, "https://example.com/");
    let fetcher = Arc::new(MemoryFetcher::default().with(
        "https://example.com/",
        html(
            200,
            r##"<a href="mailto:a@b.c">x</a><a href="mailto:a@b.c">y</a><a href="#top">1</a><a href="#top">2</a>"##,
        ),
    ));
    let mut auditor = PageAuditor::new(&config, fetcher).unwrap();
    let mut frontier = CrawlFrontier::new(seed());
    let mut rapport = Rapport::new();

    let url = frontier.next().unwrap();
    auditor.audit_url(&url, &mut frontier, &mut rapport).await;

    assert_eq!(rapport.ignored_links.len(), 2);
    assert_eq!(rapport.ignored_links[0].url, "mailto:a@b.c");
    assert_eq!(rapport.ignored_links[0].message, NON_CRAWLABLE);
    assert_eq!(rapport.ignored_links[1].url, "#top");
    assert_eq!(rapport.ignored_links[1].message, FRAGMENT_ONLY);
}

#[tokio::test]
async fn test_audit_page_records_broken_external_link() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, "https://example.com/");
    let fetcher = Arc::new(
        MemoryFetcher::default()
            .with("https://example.com/", html(200, HOME))
            .with("https://other.org/", status(404)),
    );
    let mut auditor = PageAuditor::new(&config, fetcher).unwrap();
    let mut frontier = CrawlFrontier::new(seed());
    let mut rapport = Rapport::new();

    let url = frontier.next().unwrap();
    auditor.audit_url(&url, &mut frontier, &mut rapport).await;

    assert_eq!(rapport.broken_links.len(), 1);
    let row = &rapport.broken_links[0];
    assert_eq!(row.url, "https://other.org/");
    assert_eq!(row.status_code, 404);
    assert_eq!(row.referer.as_deref(), Some("https://example.com/"));
}

#[tokio::test]
async fn test_audit_page_without_response() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, "https://example.com/");
    let mut auditor = PageAuditor::new(&config, Arc::new(MemoryFetcher::default())).unwrap();
    let mut frontier = CrawlFrontier::new(seed());
    let mut rapport = Rapport::new();

    let url = frontier.next().unwrap();
    let outcome = auditor.audit_url(&url, &mut frontier, &mut rapport).await;

    assert!(matches!(outcome, PageOutcome::Broken));
    assert_eq!(rapport.broken_links.len(), 1);
    assert_eq!(rapport.broken_links[0].status_code, 0);
    assert_eq!(
        rapport.broken_links[0].message.as_deref(),
        Some("connection refused")
    );
}

#[tokio::test]
async fn test_audit_page_error_status_still_extracts_links() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, "https://example.com/");
    let fetcher = Arc::new(
        MemoryFetcher::default()
            .with("https://example.com/", html(404, r#"<a href="/home">Home</a>"#)),
    );
    let mut auditor = PageAuditor::new(&config, fetcher).unwrap();
    let mut frontier = CrawlFrontier::new(seed());
    let mut rapport = Rapport::new();

    let url = frontier.next().unwrap();
    let PageOutcome::Audited(audit) = auditor.audit_url(&url, &mut frontier, &mut rapport).await
    else {
        panic!("expected an audited page");
    };

    assert!(!audit.is_valid());
    assert_eq!(rapport.broken_links.len(), 1);
    assert_eq!(rapport.broken_links[0].status_code, 404);
    assert_eq!(frontier.len(), 2);
}

#[tokio::test]
async fn test_audit_page_non_html_has_no_links() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, "https://example.com/");
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    let fetcher = Arc::new(MemoryFetcher::default().with(
        "https://example.com/",
        FetchResult::new(200, headers, r#"<a href="/hidden">x</a>"#),
    ));
    let mut auditor = PageAuditor::new(&config, fetcher).unwrap();
    let mut frontier = CrawlFrontier::new(seed());
    let mut rapport = Rapport::new();

    let url = frontier.next().unwrap();
    let PageOutcome::Audited(audit) = auditor.audit_url(&url, &mut frontier, &mut rapport).await
    else {
        panic!("expected an audited page");
    };

    assert!(audit.links().is_empty());
    assert_eq!(audit.mimetype(), Some("application/pdf"));
    assert_eq!(frontier.len(), 1);
}

// ============================================================================
// Redirect Tests
// ============================================================================

#[tokio::test]
async fn test_redirect_to_same_host_is_queued() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, "https://example.com/");
    let fetcher = Arc::new(
        MemoryFetcher::default()
            .with("https://example.com/", redirect(301, Some("/new")))
            .with("https://example.com/new", html(200, "<p>moved</p>")),
    );
    let mut context = dry_context(fetcher.clone());

    let summary = execute_audit(&config, &mut context, None).await.unwrap();

    assert_eq!(summary.pages_audited, 1);
    assert_eq!(summary.warnings, 1);
    assert!(summary.finished);
    assert_eq!(fetcher.get_count("https://example.com/new"), 1);
}

#[tokio::test]
async fn test_redirect_to_other_host_is_not_followed() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, "https://example.com/");
    let fetcher = Arc::new(
        MemoryFetcher::default().with("https://example.com/", redirect(302, Some("https://other.org/"))),
    );
    let mut auditor = PageAuditor::new(&config, fetcher.clone()).unwrap();
    let mut frontier = CrawlFrontier::new(seed());
    let mut rapport = Rapport::new();

    let url = frontier.next().unwrap();
    let outcome = auditor.audit_url(&url, &mut frontier, &mut rapport).await;

    assert!(matches!(outcome, PageOutcome::Redirect));
    assert_eq!(frontier.len(), 1);
    assert_eq!(
        rapport.warnings[0].message,
        "External redirect (302) to https://other.org/"
    );
    assert_eq!(fetcher.get_count("https://other.org/"), 0);
}

#[tokio::test]
async fn test_redirect_without_location_is_broken() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, "https://example.com/");
    let fetcher = Arc::new(MemoryFetcher::default().with("https://example.com/", redirect(307, None)));
    let mut auditor = PageAuditor::new(&config, fetcher).unwrap();
    let mut frontier = CrawlFrontier::new(seed());
    let mut rapport = Rapport::new();

    let url = frontier.next().unwrap();
    let outcome = auditor.audit_url(&url, &mut frontier, &mut rapport).await;

    assert!(matches!(outcome, PageOutcome::Broken));
    assert_eq!(rapport.broken_links[0].status_code, 307);
    assert_eq!(
        rapport.broken_links[0].message.as_deref(),
        Some(REDIRECT_WITHOUT_LOCATION)
    );
}

// ============================================================================
// Link Classification Tests
// ============================================================================

#[tokio::test]
async fn test_check_link_falls_back_to_get_on_405() {
    let fetcher = MemoryFetcher::default()
        .with("https://other.org/api", status(200))
        .with_head("https://other.org/api", status(405));
    let url = AuditUrl::parse("https://other.org/api", Some("https://example.com/")).unwrap();

    let report = check_link(&fetcher, &url).await;

    assert_eq!(report.status_code, 200);
    assert!(report.is_valid());
    assert_eq!(fetcher.get_count("https://other.org/api"), 1);
}

#[tokio::test]
async fn test_check_link_without_response() {
    let fetcher = MemoryFetcher::default();
    let url = AuditUrl::parse("https://down.example.net/", None).unwrap();

    let report = check_link(&fetcher, &url).await;

    assert_eq!(report.status_code, 0);
    assert!(!report.is_valid());
    assert_eq!(report.message.as_deref(), Some("connection refused"));
}

#[tokio::test]
async fn test_external_links_checked_once_per_run() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, "https://example.com/");
    let fetcher = Arc::new(
        MemoryFetcher::default()
            .with(
                "https://example.com/",
                html(200, r#"<a href="/a">A</a><a href="https://other.org/">X</a>"#),
            )
            .with(
                "https://example.com/a",
                html(200, r#"<a href="https://other.org/#frag">X</a>"#),
            )
            .with("https://other.org/", status(200)),
    );
    let mut context = dry_context(fetcher.clone());

    let summary = execute_audit(&config, &mut context, None).await.unwrap();

    assert_eq!(summary.pages_audited, 2);
    assert_eq!(fetcher.head_count("https://other.org/"), 1);
}

#[tokio::test]
async fn test_classifier_ignores_matching_links() {
    let fetcher = Arc::new(MemoryFetcher::default());
    let mut classifier = LinkClassifier::new(fetcher.clone())
        .with_ignore_pattern(Some(regex::Regex::new("^/private").unwrap()));
    let mut frontier = CrawlFrontier::new(seed());
    let mut rapport = Rapport::new();

    let mut audit = webaudit_core::audit::AuditResult::new(seed(), "hash");
    audit.add_link(AuditUrl::parse("/private/area", Some("https://example.com/")).unwrap());
    audit.add_link(AuditUrl::parse("/public", Some("https://example.com/")).unwrap());

    classifier.classify(&mut audit, &mut frontier, &mut rapport).await;

    assert_eq!(frontier.len(), 2);
    assert_eq!(audit.internal_links().len(), 1);
    assert_eq!(rapport.ignored_links.len(), 1);
    assert_eq!(rapport.ignored_links[0].message, IGNORED_BY_REGEX);
    assert_eq!(classifier.cached_reports(), 0);
}

// ============================================================================
// Crawl Loop Tests
// ============================================================================

#[tokio::test]
async fn test_full_audit_persists_records() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, "https://example.com/");
    let db_path = config.database_path();
    let fetcher = Arc::new(site());
    let store = Database::new(&db_path).unwrap();
    let mut context = AuditContext::new(fetcher, Box::new(store));

    let summary = execute_audit(&config, &mut context, None).await.unwrap();

    assert_eq!(summary.pages_audited, 2);
    assert_eq!(summary.ignored_links, 1);
    assert_eq!(summary.broken_links, 0);
    assert_eq!(summary.security_errors, 2);
    assert!(summary.finished);
    assert!(!CheckpointFile::exists(&config.checkpoint_path().unwrap()));

    let folder = summary.rapport_folder.expect("rapport saved");
    assert!(folder.starts_with(&config.rapports_folder));
    assert!(folder.join("ignored-links.csv").exists());

    let db = Database::new(&db_path).unwrap();
    assert_eq!(db.count_records().unwrap(), 2);
    let record = db.get_record(&seed().id()).unwrap().unwrap();
    assert_eq!(record["url"], "https://example.com/");
    assert_eq!(record["status_code"], 200);
    assert_eq!(record["internal_links"][0], "https://example.com/about");
    assert_eq!(record["links"][0]["url"], "https://other.org/");
}

#[tokio::test]
async fn test_dry_run_writes_no_database() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(&temp_dir, "https://example.com/");
    config.dry_run = true;
    let mut context = dry_context(Arc::new(site()));

    let summary = execute_audit(&config, &mut context, None).await.unwrap();

    assert_eq!(summary.pages_audited, 2);
    assert!(!config.database_path().exists());
}

#[tokio::test]
async fn test_unreachable_seed_finishes_with_broken_link() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, "https://example.com/");
    let mut context = dry_context(Arc::new(MemoryFetcher::default()));

    let summary = execute_audit(&config, &mut context, None).await.unwrap();

    assert_eq!(summary.pages_audited, 0);
    assert_eq!(summary.broken_links, 1);
    assert!(summary.finished);
}

#[tokio::test]
async fn test_ignore_regex_skips_popped_urls() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(&temp_dir, "https://example.com/private/");
    config.ignore_regex = Some("^/private".to_string());
    let fetcher = Arc::new(
        MemoryFetcher::default().with("https://example.com/private/", html(200, "<p>secret</p>")),
    );
    let mut context = dry_context(fetcher.clone());

    let summary = execute_audit(&config, &mut context, None).await.unwrap();

    assert_eq!(summary.pages_audited, 0);
    assert_eq!(summary.ignored_links, 1);
    assert_eq!(fetcher.get_count("https://example.com/private/"), 0);
}

#[tokio::test]
async fn test_invalid_ignore_regex_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(&temp_dir, "https://example.com/");
    config.ignore_regex = Some("(unclosed".to_string());
    let mut context = dry_context(Arc::new(site()));

    assert!(execute_audit(&config, &mut context, None).await.is_err());
}

#[tokio::test]
async fn test_progress_callback_reports_pages() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, "https://example.com/");
    let mut context = dry_context(Arc::new(site()));
    let messages = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = messages.clone();
    let callback: AuditProgressCallback = Arc::new(move |msg: String| sink.lock().unwrap().push(msg));

    execute_audit(&config, &mut context, Some(callback))
        .await
        .unwrap();

    let messages = messages.lock().unwrap();
    assert_eq!(messages.len(), 3);
    assert!(messages[0].starts_with("Starting auditing"));
    assert!(messages[2].ends_with("https://example.com/about"));
}

// ============================================================================
// Batch Limit and Resume Tests
// ============================================================================

fn wide_site() -> MemoryFetcher {
    MemoryFetcher::default()
        .with(
            "https://example.com/",
            html(200, r#"<a href="/a">A</a><a href="/b">B</a><a href="/c">C</a>"#),
        )
        .with("https://example.com/a", html(200, "<p>a</p>"))
        .with("https://example.com/b", html(200, "<p>b</p>"))
        .with("https://example.com/c", html(200, "<p>c</p>"))
}

#[tokio::test]
async fn test_batch_limit_keeps_checkpoint_and_resumes() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(&temp_dir, "https://example.com/");
    config.continue_run = true;
    config.max_updates = 2;
    let checkpoint_path = config.checkpoint_path().unwrap();
    let fetcher = Arc::new(wide_site());

    let first = execute_audit(&config, &mut dry_context(fetcher.clone()), None)
        .await
        .unwrap();
    assert_eq!(first.pages_audited, 2);
    assert!(!first.finished);
    assert!(CheckpointFile::exists(&checkpoint_path));

    let checkpoint = CheckpointFile::load(&checkpoint_path).unwrap();
    assert_eq!(checkpoint.frontier.len(), 4);
    assert_eq!(checkpoint.frontier.visited(), 2);
    assert!(checkpoint.rapport.is_some());

    let second = execute_audit(&config, &mut dry_context(fetcher.clone()), None)
        .await
        .unwrap();
    assert_eq!(second.pages_audited, 2);
    assert!(second.finished);
    assert!(!CheckpointFile::exists(&checkpoint_path));

    // The rapport carries over between invocations
    assert_eq!(second.security_errors, 4);
    assert_eq!(second.rapport_folder, first.rapport_folder);

    // Nothing was audited twice
    for path in ["", "a", "b", "c"] {
        assert_eq!(fetcher.get_count(&format!("https://example.com/{path}")), 1);
    }
}

#[tokio::test]
async fn test_without_continue_ignores_checkpoint() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(&temp_dir, "https://example.com/");
    config.continue_run = true;
    config.max_updates = 1;
    let fetcher = Arc::new(wide_site());

    execute_audit(&config, &mut dry_context(fetcher.clone()), None)
        .await
        .unwrap();
    assert!(CheckpointFile::exists(&config.checkpoint_path().unwrap()));

    config.continue_run = false;
    let summary = execute_audit(&config, &mut dry_context(fetcher.clone()), None)
        .await
        .unwrap();

    assert_eq!(summary.pages_audited, 4);
    assert!(summary.finished);
    assert_eq!(fetcher.get_count("https://example.com/"), 2);
}

#[tokio::test]
async fn test_corrupt_checkpoint_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(&temp_dir, "https://example.com/");
    config.continue_run = true;
    let checkpoint_path = config.checkpoint_path().unwrap();
    std::fs::create_dir_all(checkpoint_path.parent().unwrap()).unwrap();
    std::fs::write(&checkpoint_path, "not json").unwrap();

    let result = execute_audit(&config, &mut dry_context(Arc::new(site())), None).await;
    assert!(result.is_err());
}

// ============================================================================
// Analyzer Isolation Tests
// ============================================================================

#[cfg(unix)]
fn fake_tool(dir: &TempDir, name: &str, script: &str) -> String {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.path().join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

#[cfg(unix)]
#[tokio::test]
async fn test_failing_analyzer_does_not_stop_audit() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(&temp_dir, "https://example.com/");
    config.analyzers.accessibility = Some(Pa11yConfig {
        program: fake_tool(&temp_dir, "pa11y", "echo boom >&2; exit 1"),
        ..Pa11yConfig::default()
    });
    let mut auditor = PageAuditor::new(&config, Arc::new(site())).unwrap();
    let mut frontier = CrawlFrontier::new(seed());
    let mut rapport = Rapport::new();

    let url = frontier.next().unwrap();
    let PageOutcome::Audited(audit) = auditor.audit_url(&url, &mut frontier, &mut rapport).await
    else {
        panic!("expected an audited page");
    };

    assert!(audit.pa11y().is_empty());
    assert_eq!(audit.security_warnings().len(), 6);
    assert_eq!(audit.links().len(), 2);
    assert_eq!(audit.internal_links().len(), 1);
    assert_eq!(audit.external_links().len(), 1);
    assert!(rapport.accessibility_errors.is_empty());
    assert_eq!(rapport.security_errors.len(), 1);

    let mut context = dry_context(Arc::new(site()));
    let summary = execute_audit(&config, &mut context, None).await.unwrap();
    assert_eq!(summary.pages_audited, 2);
    assert_eq!(summary.accessibility_errors, 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_analyzers_run_concurrently() {
    let temp_dir = TempDir::new().unwrap();
    let selection = AnalyzerSelection {
        accessibility: Some(Pa11yConfig {
            program: fake_tool(&temp_dir, "pa11y", "sleep 1"),
            ..Pa11yConfig::default()
        }),
        performance: Some(LighthouseConfig {
            program: fake_tool(&temp_dir, "lighthouse", "sleep 1"),
            ..LighthouseConfig::default()
        }),
        text: Some(TikaConfig {
            java: fake_tool(&temp_dir, "java", "sleep 1"),
            jar: temp_dir.path().join("tika.jar"),
            ..TikaConfig::default()
        }),
    };
    let orchestrator = AuditOrchestrator::new(selection);
    let result = html(200, HOME);

    let start = Instant::now();
    let audit = orchestrator.analyze(&seed(), &result, "hash").await;
    let elapsed = start.elapsed();

    assert!(
        elapsed < Duration::from_millis(2500),
        "analyzers took {elapsed:?}"
    );
    assert!(audit.is_valid());
    assert_eq!(audit.links().len(), 2);
}

#[cfg(unix)]
#[tokio::test]
async fn test_accessibility_issues_reach_the_rapport() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(&temp_dir, "https://example.com/");
    config.analyzers.accessibility = Some(Pa11yConfig {
        program: fake_tool(
            &temp_dir,
            "pa11y",
            r#"echo '[{"code": "WCAG2AA.H37", "type": "error"}]'; exit 2"#,
        ),
        ..Pa11yConfig::default()
    });
    let fetcher = Arc::new(
        MemoryFetcher::default().with("https://example.com/", html(200, "<img src=x>")),
    );
    let mut auditor = PageAuditor::new(&config, fetcher).unwrap();
    let mut frontier = CrawlFrontier::new(seed());
    let mut rapport = Rapport::new();

    let url = frontier.next().unwrap();
    let PageOutcome::Audited(audit) = auditor.audit_url(&url, &mut frontier, &mut rapport).await
    else {
        panic!("expected an audited page");
    };

    assert_eq!(audit.pa11y().len(), 1);
    assert_eq!(rapport.accessibility_errors.len(), 1);
    assert_eq!(rapport.accessibility_errors[0].issues, 1);
}

#[cfg(unix)]
#[tokio::test]
async fn test_accessibility_skipped_for_non_html() {
    let temp_dir = TempDir::new().unwrap();
    let selection = AnalyzerSelection {
        accessibility: Some(Pa11yConfig {
            program: fake_tool(
                &temp_dir,
                "pa11y",
                r#"echo '[{"code": "WCAG2AA.H37", "type": "error"}]'; exit 2"#,
            ),
            ..Pa11yConfig::default()
        }),
        ..AnalyzerSelection::default()
    };
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    let result = FetchResult::new(200, headers, "%PDF-1.4");

    let audit = AuditOrchestrator::new(selection)
        .analyze(&seed(), &result, "hash")
        .await;

    assert!(audit.is_valid());
    assert!(audit.pa11y().is_empty());
}
