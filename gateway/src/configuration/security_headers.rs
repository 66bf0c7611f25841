//! Security response headers

use std::time::Duration;

use http::HeaderName;
use http::HeaderValue;
use http::header::STRICT_TRANSPORT_SECURITY;
use http::header::X_CONTENT_TYPE_OPTIONS;
use http::header::X_XSS_PROTECTION;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

/// Headers added to every response, unless the handler already set them.
///
/// DNS prefetch control, frame options and download options are left to the client.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[serde(default)]
pub struct SecurityHeaders {
    /// Set to false to send no security headers at all.
    pub(crate) enabled: bool,

    /// `Strict-Transport-Security` max-age, in time units
    /// default: 180 days
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub(crate) hsts_max_age: Duration,

    /// Add `includeSubDomains` to `Strict-Transport-Security`
    pub(crate) hsts_include_subdomains: bool,
}

impl Default for SecurityHeaders {
    fn default() -> Self {
        Self {
            enabled: true,
            hsts_max_age: Duration::from_secs(180 * 24 * 60 * 60),
            hsts_include_subdomains: true,
        }
    }
}

impl SecurityHeaders {
    /// The headers to apply, in a stable order.
    pub(crate) fn headers(&self) -> Result<Vec<(HeaderName, HeaderValue)>, String> {
        if !self.enabled {
            return Ok(Vec::new());
        }
        let mut hsts = format!("max-age={}", self.hsts_max_age.as_secs());
        if self.hsts_include_subdomains {
            hsts.push_str("; includeSubDomains");
        }
        let hsts = HeaderValue::from_str(&hsts).map_err(|e| e.to_string())?;
        Ok(vec![
            (STRICT_TRANSPORT_SECURITY, hsts),
            (X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
            (X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block")),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_defaults_to_helmet_values() {
        let headers = SecurityHeaders::default().headers().unwrap();
        assert_eq!(
            headers,
            vec![
                (
                    STRICT_TRANSPORT_SECURITY,
                    HeaderValue::from_static("max-age=15552000; includeSubDomains")
                ),
                (X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
                (X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block")),
            ]
        );
    }

    #[test]
    fn it_can_be_disabled() {
        let headers: SecurityHeaders = serde_yaml::from_str("enabled: false").unwrap();
        assert!(headers.headers().unwrap().is_empty());
    }

    #[test]
    fn it_reads_the_hsts_age() {
        let headers: SecurityHeaders =
            serde_yaml::from_str("hsts_max_age: 1d\nhsts_include_subdomains: false").unwrap();
        assert_eq!(
            headers.headers().unwrap()[0].1,
            HeaderValue::from_static("max-age=86400")
        );
    }
}
