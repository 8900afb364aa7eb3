// Passive security header checks for fetched resources

use serde::{Deserialize, Serialize};
use webaudit_scanner::FetchResult;

/// Response headers every audited resource is expected to carry.
pub const SECURITY_HEADERS: [&str; 6] = [
    "Strict-Transport-Security",
    "Content-Security-Policy",
    "X-Frame-Options",
    "X-Content-Type-Options",
    "Referrer-Policy",
    "Permissions-Policy",
];

pub const MISSING_HEADER: &str = "missing-header";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityWarning {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl SecurityWarning {
    pub fn missing_header(header: &str) -> Self {
        Self {
            kind: MISSING_HEADER.to_string(),
            value: header.to_string(),
        }
    }
}

/// One warning per tracked header absent from the response, in
/// [`SECURITY_HEADERS`] order. Nothing is reported without a response.
pub fn check_security_headers(result: &FetchResult) -> Vec<SecurityWarning> {
    if !result.has_response() {
        return Vec::new();
    }

    SECURITY_HEADERS
        .iter()
        .filter(|header| !result.has_header(header))
        .map(|header| SecurityWarning::missing_header(header))
        .collect()
}
