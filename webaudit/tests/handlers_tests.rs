use std::io::Write;
use std::path::Path;
use tempfile::{NamedTempFile, TempDir};
use webaudit::handlers::*;
use webaudit_core::AuditConfig;
use webaudit_scanner::AnalyzerKind;

#[test]
fn test_expand_path_tilde() {
    let expanded = expand_path("~/audits");
    assert!(!expanded.to_string_lossy().starts_with('~'));
    assert!(expanded.ends_with("audits"));
}

#[test]
fn test_expand_path_plain() {
    assert_eq!(expand_path("./cache"), Path::new("./cache"));
}

#[test]
fn test_select_analyzers_none() -> anyhow::Result<()> {
    let selection = select_analyzers(&[], false, Path::new("./cache"))?;
    assert!(selection.is_empty());
    Ok(())
}

#[test]
fn test_select_analyzers_individual() -> anyhow::Result<()> {
    let selection = select_analyzers(&["pa11y", "tika"], false, Path::new("/tmp/cache"))?;
    assert_eq!(
        selection.kinds(),
        vec![AnalyzerKind::Accessibility, AnalyzerKind::TextExtraction]
    );
    let tika = selection.text.expect("tika enabled");
    assert_eq!(tika.jar, Path::new("/tmp/cache/tika.jar"));
    Ok(())
}

#[test]
fn test_select_analyzers_all() -> anyhow::Result<()> {
    let selection = select_analyzers(&[], true, Path::new("./cache"))?;
    assert_eq!(selection.kinds().len(), 3);
    Ok(())
}

#[test]
fn test_select_analyzers_unknown_key() {
    assert!(select_analyzers(&["axe"], false, Path::new("./cache")).is_err());
}

#[test]
fn test_load_analyzer_overrides() -> anyhow::Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(
        file,
        r#"[
            {{"kind": "pa11y", "program": "/usr/local/bin/pa11y", "timeout_secs": 30}},
            {{"kind": "lighthouse", "program": "/opt/lighthouse"}}
        ]"#
    )?;

    let overrides = load_analyzer_overrides(file.path())?;
    assert_eq!(overrides.len(), 2);

    // Only the enabled kind picks up its override
    let mut selection = select_analyzers(&["pa11y"], false, Path::new("./cache"))?;
    selection.override_enabled(overrides);
    let pa11y = selection.accessibility.expect("pa11y enabled");
    assert_eq!(pa11y.program, "/usr/local/bin/pa11y");
    assert_eq!(pa11y.timeout_secs, 30);
    assert_eq!(pa11y.standard, "WCAG2AA");
    assert!(selection.performance.is_none());
    Ok(())
}

#[test]
fn test_load_analyzer_overrides_invalid_json() -> anyhow::Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "{{ not json")?;
    assert!(load_analyzer_overrides(file.path()).is_err());
    Ok(())
}

#[test]
fn test_load_analyzer_overrides_missing_file() {
    assert!(load_analyzer_overrides(Path::new("/nonexistent/analyzers.json")).is_err());
}

#[test]
fn test_open_store_creates_database() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut config = AuditConfig::new("https://example.com/");
    config.cache_folder = dir.path().join("cache");

    let _store = open_store(&config)?;
    assert!(dir.path().join("cache").join("audit.db").exists());
    Ok(())
}

#[test]
fn test_open_store_dry_run_touches_nothing() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut config = AuditConfig::new("https://example.com/");
    config.cache_folder = dir.path().join("cache");
    config.dry_run = true;

    let _store = open_store(&config)?;
    assert!(!dir.path().join("cache").exists());
    Ok(())
}
