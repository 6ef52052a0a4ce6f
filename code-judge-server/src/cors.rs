use axum::http::{
    header::{HeaderName, CONTENT_TYPE},
    request, HeaderValue, Method,
};
use regex::Regex;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::SECRET_HEADER;

/// Origins every deployment accepts: local development and GitHub Pages.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    r"^https?://localhost(:\d+)?$",
    r"^http://127\.0\.0\.1(:\d+)?$",
    r"^https://[\w-]+\.github\.io$",
];

#[derive(Debug, Clone)]
pub struct OriginPolicy {
    patterns: Arc<Vec<Regex>>,
}

impl OriginPolicy {
    pub fn new(extra: &[String]) -> Result<Self, regex::Error> {
        let patterns = DEFAULT_ALLOWED_ORIGINS
            .iter()
            .copied()
            .chain(extra.iter().map(String::as_str).filter(|p| !p.is_empty()))
            .map(Regex::new)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            patterns: Arc::new(patterns),
        })
    }

    pub fn allows(&self, origin: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(origin))
    }

    pub fn layer(self) -> CorsLayer {
        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(
                move |origin: &HeaderValue, _request: &request::Parts| {
                    origin.to_str().map_or(false, |origin| self.allows(origin))
                },
            ))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE, HeaderName::from_static(SECRET_HEADER)])
    }
}
