//! Cross Origin Resource Sharing (CORS configuration)

use std::time::Duration;

use http::HeaderValue;
use http::request::Parts;
use regex::Regex;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use tower_http::cors;
use tower_http::cors::CorsLayer;

/// Cross origin request configuration.
///
/// The defaults allow any origin, like an unconfigured `cors()` middleware.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[serde(default)]
pub struct Cors {
    /// Set to true to allow any origin.
    ///
    /// Defaults to true.
    /// Having this set to true is the only way to allow Origin: null.
    pub(crate) allow_any_origin: bool,

    /// Set to true to add the `Access-Control-Allow-Credentials` header.
    pub(crate) allow_credentials: bool,

    /// The headers to allow.
    ///
    /// If this value is not set, the gateway will mirror client's `Access-Control-Request-Headers`.
    pub(crate) allow_headers: Vec<String>,

    /// Which response headers should be made available to scripts running in the browser,
    /// in response to a cross-origin request.
    pub(crate) expose_headers: Vec<String>,

    /// The origin(s) to allow requests from when `allow_any_origin` is false.
    pub(crate) origins: Vec<String>,

    /// `Regex`es you want to match the origins against to determine if they're allowed.
    /// Note that `origins` will be evaluated before `match_origins`
    #[serde(with = "serde_regex")]
    #[schemars(with = "Vec<String>")]
    pub(crate) match_origins: Vec<Regex>,

    /// Allowed request methods. Defaults to GET, HEAD, PUT, PATCH, POST, DELETE.
    pub(crate) methods: Vec<String>,

    /// The `Access-Control-Max-Age` header value in time units
    #[serde(with = "humantime_serde")]
    #[schemars(with = "Option<String>")]
    pub(crate) max_age: Option<Duration>,
}

impl Default for Cors {
    fn default() -> Self {
        Self {
            allow_any_origin: true,
            allow_credentials: false,
            allow_headers: Vec::new(),
            expose_headers: Vec::new(),
            origins: Vec::new(),
            match_origins: Vec::new(),
            methods: default_cors_methods(),
            max_age: None,
        }
    }
}

fn default_cors_methods() -> Vec<String> {
    ["GET", "HEAD", "PUT", "PATCH", "POST", "DELETE"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Cors {
    pub(crate) fn into_layer(self) -> Result<CorsLayer, String> {
        // Ensure configuration is valid before creating CorsLayer
        self.ensure_usable_cors_rules()?;

        let allow_headers = if self.allow_headers.is_empty() {
            cors::AllowHeaders::mirror_request()
        } else {
            cors::AllowHeaders::list(parse_values(&self.allow_headers, "header name")?)
        };
        let mut layer = CorsLayer::new()
            .allow_credentials(self.allow_credentials)
            .allow_headers(allow_headers)
            .expose_headers(cors::ExposeHeaders::list(parse_values(
                &self.expose_headers,
                "header name",
            )?))
            .allow_methods(cors::AllowMethods::list(parse_values::<http::Method>(
                &self.methods,
                "method",
            )?));
        if let Some(max_age) = self.max_age {
            layer = layer.max_age(max_age);
        }

        if self.allow_any_origin {
            return Ok(layer.allow_origin(cors::Any));
        }

        let origins = parse_values::<HeaderValue>(&self.origins, "origin")?;
        if self.match_origins.is_empty() {
            return Ok(layer.allow_origin(cors::AllowOrigin::list(origins)));
        }
        let regexes = self.match_origins;
        Ok(layer.allow_origin(cors::AllowOrigin::predicate(
            move |origin: &HeaderValue, _: &Parts| {
                origins.iter().any(|allowed| allowed == origin)
                    || origin
                        .to_str()
                        .map(|o| regexes.iter().any(|regex| regex.is_match(o)))
                        .unwrap_or_default()
            },
        )))
    }

    // tower-http asserts that CORS rules are usable, which results in a panic if they aren't.
    // This returns an error describing the problem instead.
    fn ensure_usable_cors_rules(&self) -> Result<(), String> {
        if self.origins.iter().any(|x| x == "*") {
            return Err(
                "Invalid CORS configuration: use `allow_any_origin: true` to set `Access-Control-Allow-Origin: *`"
                    .to_string(),
            );
        }
        if self.allow_credentials {
            if self.allow_headers.iter().any(|x| x == "*") {
                return Err(wildcard_with_credentials("Access-Control-Allow-Headers"));
            }
            if self.methods.iter().any(|x| x == "*") {
                return Err(wildcard_with_credentials("Access-Control-Allow-Methods"));
            }
            if self.allow_any_origin {
                return Err(wildcard_with_credentials("Access-Control-Allow-Origin"));
            }
            if self.expose_headers.iter().any(|x| x == "*") {
                return Err(wildcard_with_credentials("Access-Control-Expose-Headers"));
            }
        }
        Ok(())
    }
}

fn wildcard_with_credentials(header: &str) -> String {
    format!(
        "Invalid CORS configuration: Cannot combine `Access-Control-Allow-Credentials: true` with `{header}: *`"
    )
}

fn parse_values<T>(values: &[String], kind: &str) -> Result<Vec<T>, String>
where
    T: std::str::FromStr,
{
    values
        .iter()
        .map(|value| {
            value
                .parse()
                .map_err(|_| format!("{kind} '{value}' is not valid"))
        })
        .collect()
}
