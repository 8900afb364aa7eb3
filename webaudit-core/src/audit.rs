// Per-URL audit result and the record persisted for it

use crate::data::AssetStore;
use crate::error::{CoreError, Result};
use crate::security::SecurityWarning;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Local};
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use webaudit_scanner::{AuditUrl, InlineImage, UrlReport, sha256_hex};

pub const SCREENSHOT_FILENAME: &str = "lighthouse-screenshot";

/// SHA-256 (hex) of a fully buffered body.
pub fn content_hash(body: &[u8]) -> String {
    sha256_hex(body)
}

/// A discovered href that will not be followed, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct IgnoredLink {
    pub url: String,
    pub referer: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct AuditResult {
    url: AuditUrl,
    hash: String,
    valid: bool,
    status_code: Option<u16>,
    error_message: Option<String>,
    mimetype: Option<String>,
    security_warnings: Vec<SecurityWarning>,
    links: Vec<AuditUrl>,
    link_ids: HashSet<String>,
    ignored_links: Vec<IgnoredLink>,
    ignored_keys: HashSet<(String, String)>,
    internal_links: Vec<AuditUrl>,
    external_links: Vec<UrlReport>,
    pa11y: Vec<Value>,
    warnings: Vec<String>,
    performance: Option<f64>,
    accessibility: Option<f64>,
    best_practices: Option<f64>,
    seo: Option<f64>,
    lighthouse_report: Option<Value>,
    screenshot: Option<InlineImage>,
    locale: Option<String>,
    content: Option<String>,
    datetime: DateTime<Local>,
}

impl AuditResult {
    pub fn new(url: AuditUrl, hash: impl Into<String>) -> Self {
        Self {
            url,
            hash: hash.into(),
            valid: true,
            status_code: None,
            error_message: None,
            mimetype: None,
            security_warnings: Vec::new(),
            links: Vec::new(),
            link_ids: HashSet::new(),
            ignored_links: Vec::new(),
            ignored_keys: HashSet::new(),
            internal_links: Vec::new(),
            external_links: Vec::new(),
            pa11y: Vec::new(),
            warnings: Vec::new(),
            performance: None,
            accessibility: None,
            best_practices: None,
            seo: None,
            lighthouse_report: None,
            screenshot: None,
            locale: None,
            content: None,
            datetime: Local::now(),
        }
    }

    /// Record a discovered link. Crawlable URLs are kept once per identity,
    /// the others are set aside as ignored.
    pub fn add_link(&mut self, link: AuditUrl) {
        if !link.is_crawlable() {
            self.add_ignored_link(
                &link.url_string(),
                link.referer(),
                crate::rapport::NON_CRAWLABLE,
            );
            return;
        }
        if self.link_ids.insert(link.id()) {
            self.links.push(link);
        }
    }

    /// Set aside an href that will not be followed. Repeats of the same href
    /// with the same reason are dropped.
    pub fn add_ignored_link(&mut self, url: &str, referer: Option<&str>, reason: &str) {
        if !self
            .ignored_keys
            .insert((url.to_string(), reason.to_string()))
        {
            return;
        }
        self.ignored_links.push(IgnoredLink {
            url: url.to_string(),
            referer: referer.map(str::to_string),
            reason: reason.to_string(),
        });
    }

    pub fn add_security_warning(&mut self, warning: SecurityWarning) {
        self.security_warnings.push(warning);
    }

    pub fn add_internal_link(&mut self, link: AuditUrl) {
        self.internal_links.push(link);
    }

    pub fn add_external_link(&mut self, report: UrlReport) {
        self.external_links.push(report);
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn set_scores(
        &mut self,
        performance: Option<f64>,
        accessibility: Option<f64>,
        best_practices: Option<f64>,
        seo: Option<f64>,
    ) {
        self.performance = performance;
        self.accessibility = accessibility;
        self.best_practices = best_practices;
        self.seo = seo;
    }

    pub fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
    }

    pub fn set_status_code(&mut self, status_code: u16) {
        self.status_code = Some(status_code);
    }

    pub fn set_error_message(&mut self, message: Option<String>) {
        self.error_message = message;
    }

    pub fn set_mimetype(&mut self, mimetype: Option<String>) {
        self.mimetype = mimetype;
    }

    pub fn set_pa11y(&mut self, issues: Vec<Value>) {
        self.pa11y = issues;
    }

    pub fn set_lighthouse_report(&mut self, report: Value) {
        self.lighthouse_report = Some(report);
    }

    pub fn set_screenshot(&mut self, screenshot: Option<InlineImage>) {
        self.screenshot = screenshot;
    }

    pub fn set_locale(&mut self, locale: Option<String>) {
        self.locale = locale;
    }

    pub fn set_content(&mut self, content: Option<String>) {
        self.content = content;
    }

    pub fn url(&self) -> &AuditUrl {
        &self.url
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn mimetype(&self) -> Option<&str> {
        self.mimetype.as_deref()
    }

    pub fn security_warnings(&self) -> &[SecurityWarning] {
        &self.security_warnings
    }

    pub fn links(&self) -> &[AuditUrl] {
        &self.links
    }

    pub fn ignored_links(&self) -> &[IgnoredLink] {
        &self.ignored_links
    }

    pub fn internal_links(&self) -> &[AuditUrl] {
        &self.internal_links
    }

    pub fn external_links(&self) -> &[UrlReport] {
        &self.external_links
    }

    pub fn pa11y(&self) -> &[Value] {
        &self.pa11y
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn performance(&self) -> Option<f64> {
        self.performance
    }

    pub fn accessibility(&self) -> Option<f64> {
        self.accessibility
    }

    pub fn best_practices(&self) -> Option<f64> {
        self.best_practices
    }

    pub fn seo(&self) -> Option<f64> {
        self.seo
    }

    pub fn lighthouse_report(&self) -> Option<&Value> {
        self.lighthouse_report.as_ref()
    }

    pub fn screenshot(&self) -> Option<&InlineImage> {
        self.screenshot.as_ref()
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// The page itself as a link-health report, for the broken-links sheet.
    pub fn url_report(&self) -> UrlReport {
        UrlReport {
            url: self.url.url_string(),
            referer: self.url.referer().map(str::to_string),
            status_code: self.status_code.unwrap_or(0),
            message: self.error_message.clone(),
        }
    }

    /// Upload binary artefacts and return the record fields referencing them.
    pub fn upload_assets<S: AssetStore + ?Sized>(&self, store: &mut S) -> Result<Map<String, Value>> {
        let mut fields = Map::new();
        if let Some(ref screenshot) = self.screenshot {
            let bytes = STANDARD
                .decode(screenshot.base64.as_bytes())
                .map_err(|e| CoreError::Persistence(format!("Invalid screenshot payload: {e}")))?;
            let hash = store.upload(&bytes, SCREENSHOT_FILENAME, &screenshot.mimetype)?;
            fields.insert(
                "screenshot".to_string(),
                json!({
                    "hash": hash,
                    "filename": SCREENSHOT_FILENAME,
                    "mimetype": screenshot.mimetype,
                }),
            );
        }
        Ok(fields)
    }

    /// The persisted record: `extra` merged with the computed fields, absent
    /// values dropped. Computed fields win on key collisions.
    pub fn get_raw_data(&self, extra: Map<String, Value>) -> Map<String, Value> {
        let security: Vec<Value> = self
            .security_warnings
            .iter()
            .map(|w| json!({"type": w.kind, "value": w.value}))
            .collect();
        let links: Vec<Value> = self
            .external_links
            .iter()
            .map(|report| {
                json!({
                    "url": report.url,
                    "message": report.message,
                    "status_code": report.status_code,
                })
            })
            .collect();
        let internal_links: Vec<Value> = self
            .internal_links
            .iter()
            .map(|link| Value::String(link.url_string()))
            .collect();

        let computed = [
            ("url", json!(self.url.url_string())),
            ("referer", json!(self.url.referer())),
            ("host", json!(self.url.host())),
            ("hash", json!(self.hash)),
            ("status_code", json!(self.status_code)),
            ("mimetype", json!(self.mimetype)),
            ("error", json!(self.error_message)),
            ("security", Value::Array(security)),
            ("links", Value::Array(links)),
            ("internal_links", Value::Array(internal_links)),
            ("pa11y", Value::Array(self.pa11y.clone())),
            ("warning", json!(self.warnings.first())),
            ("lighthouse_performance", json!(self.performance)),
            ("lighthouse_accessibility", json!(self.accessibility)),
            ("lighthouse_best_practices", json!(self.best_practices)),
            ("lighthouse_seo", json!(self.seo)),
            (
                "lighthouse_report",
                self.lighthouse_report.clone().unwrap_or(Value::Null),
            ),
            ("locale", json!(self.locale)),
            ("content", json!(self.content)),
            ("timestamp", json!(self.datetime.to_rfc3339())),
        ];

        let mut record = extra;
        for (key, value) in computed {
            record.insert(key.to_string(), value);
        }
        record.retain(|_, value| !value.is_null());
        record
    }
}
