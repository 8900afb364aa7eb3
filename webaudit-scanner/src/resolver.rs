// URL parsing, relative resolution and crawl identity

use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;

/// An immutable, resolved URL as seen by the auditor.
///
/// Two values designate the same crawl target when their [`canonical`](Self::canonical)
/// renderings are identical; the fragment and the referer never take part in that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditUrl {
    scheme: String,
    host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fragment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    referer: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    opaque: bool,
}

impl AuditUrl {
    /// Parse `raw`, resolving it against `referer` when it is relative.
    ///
    /// Scheme and host fall back to the referer's. Fails with
    /// [`ScanError::InvalidUrl`] when neither source provides them.
    pub fn parse(raw: &str, referer: Option<&str>) -> Result<Self> {
        let raw = raw.trim();
        let base = match referer {
            Some(referer) => Some(Self::parse(referer, None)?),
            None => None,
        };
        let referer = referer.map(str::to_string);

        match Url::parse(raw) {
            Ok(parsed) => Self::from_absolute(&parsed, base.as_ref(), referer),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = base.ok_or_else(|| {
                    ScanError::InvalidUrl(format!("{raw}: no scheme or host and no referer"))
                })?;
                Self::from_relative(raw, &base, referer)
            }
            Err(e) => Err(ScanError::InvalidUrl(format!("{raw}: {e}"))),
        }
    }

    fn from_absolute(parsed: &Url, base: Option<&AuditUrl>, referer: Option<String>) -> Result<Self> {
        let scheme = parsed.scheme().to_string();
        let fragment = parsed.fragment().map(str::to_string);
        let query = parsed.query().map(str::to_string);

        if parsed.cannot_be_a_base() {
            // mailto:, javascript:, tel: ... keep the literal opaque path
            let host = base.map(|b| b.host.clone()).ok_or_else(|| {
                ScanError::InvalidUrl(format!("{parsed}: no host and no referer"))
            })?;
            return Ok(Self {
                scheme,
                host,
                port: None,
                user: None,
                password: None,
                path: parsed.path().to_string(),
                query,
                fragment,
                referer,
                opaque: true,
            });
        }

        let host = match parsed.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => base
                .map(|b| b.host.clone())
                .ok_or_else(|| ScanError::InvalidUrl(format!("{parsed}: missing host")))?,
        };
        let path = match parsed.path() {
            "" => "/".to_string(),
            path => path.to_string(),
        };

        Ok(Self {
            scheme,
            host,
            port: parsed.port(),
            user: Some(parsed.username())
                .filter(|u| !u.is_empty())
                .map(str::to_string),
            password: parsed.password().map(str::to_string),
            path,
            query,
            fragment,
            referer,
            opaque: false,
        })
    }

    fn from_relative(raw: &str, base: &AuditUrl, referer: Option<String>) -> Result<Self> {
        if raw.starts_with("//") {
            let parsed = Url::parse(&format!("{}:{}", base.scheme, raw))
                .map_err(|e| ScanError::InvalidUrl(format!("{raw}: {e}")))?;
            return Self::from_absolute(&parsed, Some(base), referer);
        }

        let (rest, fragment) = match raw.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment)),
            None => (raw, None),
        };
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };

        // An empty path keeps the page itself, and its query unless a new one is given
        let (path, query) = if path.is_empty() {
            (base.path.clone(), query.or(base.query.as_deref()))
        } else if path.starts_with('/') {
            (path.to_string(), query)
        } else if path.starts_with('.') {
            (format!("{}{}", directory_of(&base.path), path), query)
        } else {
            (format!("{}{}", parent_of(&base.path), path), query)
        };
        let path = collapse_dot_segments(&path);

        // Round-trip through the url crate so every component gets percent-encoded
        let mut resolved = Url::parse(&base.canonical())
            .map_err(|e| ScanError::InvalidUrl(format!("{raw}: {e}")))?;
        resolved.set_path(&path);
        resolved.set_query(query);
        resolved.set_fragment(fragment);

        let mut url = Self::from_absolute(&resolved, Some(base), referer)?;
        url.user = base.user.clone();
        url.password = base.password.clone();
        url.port = base.port;
        Ok(url)
    }

    /// scheme + userinfo + host + port + path [+ ?query], never the fragment.
    pub fn canonical(&self) -> String {
        if self.opaque {
            let mut out = format!("{}:{}", self.scheme, self.path);
            if let Some(ref query) = self.query {
                out.push('?');
                out.push_str(query);
            }
            return out;
        }

        let mut out = format!("{}://", self.scheme);
        if let Some(ref user) = self.user {
            out.push_str(user);
            if let Some(ref password) = self.password {
                out.push(':');
                out.push_str(password);
            }
            out.push('@');
        }
        out.push_str(&self.host);
        if let Some(port) = self.port {
            out.push_str(&format!(":{port}"));
        }
        out.push_str(&self.path);
        if let Some(ref query) = self.query {
            out.push('?');
            out.push_str(query);
        }
        out
    }

    /// Full rendering, fragment included.
    pub fn url_string(&self) -> String {
        match self.fragment {
            Some(ref fragment) => format!("{}#{}", self.canonical(), fragment),
            None => self.canonical(),
        }
    }

    /// Stable crawl identity: SHA-256 (hex) of the canonical rendering.
    pub fn id(&self) -> String {
        sha256_hex(self.canonical().as_bytes())
    }

    /// Last path segment, `index.html` for directory-like paths.
    pub fn filename(&self) -> String {
        match self.path.rsplit('/').next() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => "index.html".to_string(),
        }
    }

    pub fn is_crawlable(&self) -> bool {
        matches!(self.scheme.as_str(), "http" | "https")
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    pub fn referer(&self) -> Option<&str> {
        self.referer.as_deref()
    }
}

impl fmt::Display for AuditUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url_string())
    }
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// The referer's path as a directory: a trailing `/` is appended when missing,
/// so `/aaa` and `/aaa/` resolve `./x` identically.
fn directory_of(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

/// The referer's path trimmed to its last `/`.
fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..=i],
        None => "/",
    }
}

/// Collapse `//`, `/./` and `/x/../` until nothing changes.
fn collapse_dot_segments(path: &str) -> String {
    let mut path = path.to_string();
    if path.ends_with("/.") || path.ends_with("/..") {
        path.push('/');
    }
    loop {
        let next = collapse_once(&path);
        if next == path {
            break;
        }
        path = next;
    }
    while let Some(stripped) = path.strip_prefix("/..") {
        if !stripped.starts_with('/') {
            break;
        }
        path = stripped.to_string();
    }
    path
}

fn collapse_once(path: &str) -> String {
    if let Some(i) = path.find("/./") {
        return format!("{}{}", &path[..i], &path[i + 2..]);
    }
    if let Some(i) = path.find("//") {
        return format!("{}{}", &path[..i], &path[i + 1..]);
    }

    let mut search = 0;
    while let Some(offset) = path[search..].find("/../") {
        let dots = search + offset;
        if let Some(start) = path[..dots].rfind('/') {
            let segment = &path[start + 1..dots];
            if !segment.is_empty() && segment != ".." {
                return format!("{}{}", &path[..start], &path[dots + 3..]);
            }
        }
        search = dots + 1;
    }
    path.to_string()
}
