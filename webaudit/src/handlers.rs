use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, warn};
use webaudit_core::data::{AuditStore, Database, DryRunSink};
use webaudit_core::{AuditConfig, AuditContext, execute_audit, generate_audit_report};
use webaudit_scanner::{AnalyzerConfig, AnalyzerSelection, HttpFetcher};

/// Analyzer flags of the audit command, in the order they are enabled
pub const ANALYZER_FLAGS: [&str; 3] = ["pa11y", "lighthouse", "tika"];

/// Expand a leading `~` in a path given on the command line
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Install the fmt subscriber. Only the first call has an effect.
pub fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

/// Default configurations for the named analyzers, or for all of them
pub fn select_analyzers(keys: &[&str], all: bool, cache_folder: &Path) -> Result<AnalyzerSelection> {
    if all {
        return Ok(AnalyzerSelection::all(cache_folder));
    }
    let configs = keys
        .iter()
        .map(|key| AnalyzerConfig::from_key(key, cache_folder))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(AnalyzerSelection::from_configs(configs))
}

/// Read a JSON array of analyzer configurations
pub fn load_analyzer_overrides(path: &Path) -> Result<Vec<AnalyzerConfig>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read analyzers config {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid analyzers config {}", path.display()))
}

/// Turn the matches of the audit subcommand into an [`AuditConfig`].
///
/// Fails on an unparsable seed URL or ignore pattern.
pub fn build_audit_config(args: &ArgMatches, quiet: bool) -> Result<AuditConfig> {
    let base_url = args.get_one::<String>("URL").context("Missing URL")?;
    let mut config = AuditConfig::new(base_url.as_str());

    config.continue_run = args.get_flag("continue");
    config.dry_run = args.get_flag("dry-run");
    config.show_progress = !quiet && !args.get_flag("no-progress");
    if let Some(max_updates) = args.get_one::<usize>("max-updates") {
        config.max_updates = *max_updates;
    }
    if let Some(folder) = args.get_one::<String>("cache-folder") {
        config.cache_folder = expand_path(folder);
    }
    if let Some(folder) = args.get_one::<String>("rapports-folder") {
        config.rapports_folder = expand_path(folder);
    }
    config.database = args.get_one::<String>("database").map(|p| expand_path(p));
    if let Some(content_type) = args.get_one::<String>("content-type") {
        config.content_type = content_type.clone();
    }
    config.ignore_regex = args.get_one::<String>("ignore-regex").cloned();

    let keys: Vec<&str> = ANALYZER_FLAGS
        .into_iter()
        .filter(|flag| args.get_flag(flag))
        .collect();
    config.analyzers = select_analyzers(&keys, args.get_flag("all"), &config.cache_folder)?;
    if let Some(path) = args.get_one::<String>("analyzers-config") {
        let overrides = load_analyzer_overrides(&expand_path(path))?;
        config.analyzers.override_enabled(overrides);
    }

    config
        .seed_url()
        .with_context(|| format!("Invalid URL '{}'", config.base_url))?;
    config
        .ignore_pattern()
        .context("Invalid --ignore-regex pattern")?;

    Ok(config)
}

/// The record sink of a run: the database, or a logger in dry-run mode
pub fn open_store(config: &AuditConfig) -> Result<Box<dyn AuditStore>> {
    if config.dry_run {
        return Ok(Box::new(DryRunSink::new()));
    }
    let path = config.database_path();
    let db = Database::new(&path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?
        .with_content_type(&config.content_type);
    Ok(Box::new(db))
}

pub async fn handle_audit(args: &ArgMatches, quiet: bool, verbose: bool) -> Result<()> {
    init_tracing(verbose);

    let config = build_audit_config(args, quiet)?;
    if !quiet {
        println!("\n🔎 Auditing {}", config.base_url.bright_white().bold());
        let kinds = config.analyzers.kinds();
        if kinds.is_empty() {
            println!("Analyzers: none (header audit and link check only)");
        } else {
            println!("Analyzers: {:?}", kinds);
        }
        if config.continue_run {
            println!("Batch limit: {} pages", config.max_updates);
        }
        println!();
    }

    let fetcher = HttpFetcher::new().context("Failed to build the HTTP client")?;
    if let Some(ref tika) = config.analyzers.text
        && let Err(e) = tika.ensure_jar(fetcher.client()).await
    {
        warn!("Tika jar unavailable, text extraction will fail: {}", e);
    }

    let store = open_store(&config)?;
    let mut context = AuditContext::new(Arc::new(fetcher), store);
    let summary = execute_audit(&config, &mut context, None)
        .await
        .context("Audit aborted")?;

    println!("{}", generate_audit_report(&summary));
    Ok(())
}
