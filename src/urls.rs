//! URL classification for submitted media links
//!
//! Classification is pure: the same URL string always yields the same
//! platform and content id, and no network lookups are performed.
//!
//! ```
//! use vidfetch::urls::{self, Platform};
//!
//! let (platform, id) = urls::classify("https://youtu.be/dQw4w9WgXcQ");
//! assert_eq!(platform, Platform::YouTube);
//! assert_eq!(id.as_deref(), Some("dQw4w9WgXcQ"));
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum UrlError {
    #[error("invalid url: {0}")]
    Invalid(String),
}

/// Source platform a URL belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    YouTube,
    Facebook,
    TikTok,
    Instagram,
    Twitter,
    Vimeo,
    Dailymotion,
    Generic,
}

impl Platform {
    /// Platforms with dedicated classification rules, in evaluation order
    pub const KNOWN: [Platform; 7] = [
        Platform::YouTube,
        Platform::Facebook,
        Platform::TikTok,
        Platform::Instagram,
        Platform::Twitter,
        Platform::Vimeo,
        Platform::Dailymotion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::YouTube => "youtube",
            Platform::Facebook => "facebook",
            Platform::TikTok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::Twitter => "twitter",
            Platform::Vimeo => "vimeo",
            Platform::Dailymotion => "dailymotion",
            Platform::Generic => "generic",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        Platform::KNOWN
            .into_iter()
            .chain(std::iter::once(Platform::Generic))
            .find(|p| p.as_str() == tag)
            .ok_or_else(|| UrlError::Invalid(format!("unknown platform tag: {s}")))
    }
}

struct Rule {
    platform: Platform,
    pattern: Regex,
}

fn rule(platform: Platform, pattern: &str) -> Rule {
    Rule {
        platform,
        // Patterns are compile-time constants covered by tests.
        pattern: Regex::new(pattern).unwrap_or_else(|e| panic!("bad pattern {pattern}: {e}")),
    }
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        rule(
            Platform::YouTube,
            r"(?:https?://)?(?:www\.)?(?:youtube\.com|youtu\.be)/(?:watch\?v=)?([a-zA-Z0-9_-]{11})",
        ),
        rule(
            Platform::YouTube,
            r"(?:https?://)?(?:www\.)?youtube\.com/shorts/([a-zA-Z0-9_-]{11})",
        ),
        rule(
            Platform::Facebook,
            r"(?:https?://)?(?:www\.|web\.|m\.)?facebook\.com/(?:watch/\?v=|video\.php\?v=|video/video\.php\?v=|.*?/videos/|reel/)(\d+)",
        ),
        rule(
            Platform::Facebook,
            r"(?:https?://)?(?:www\.|web\.|m\.)?fb\.watch/([a-zA-Z0-9_-]+)",
        ),
        rule(
            Platform::TikTok,
            r"(?:https?://)?(?:www\.)?tiktok\.com/@[^/]+/video/(\d+)",
        ),
        rule(
            Platform::TikTok,
            r"(?:https?://)?(?:www\.)?vm\.tiktok\.com/([a-zA-Z0-9_-]+)",
        ),
        rule(
            Platform::Instagram,
            r"(?:https?://)?(?:www\.)?instagram\.com/(?:p|reel)/([a-zA-Z0-9_-]+)",
        ),
        rule(
            Platform::Instagram,
            r"(?:https?://)?(?:www\.)?instagram\.com/tv/([a-zA-Z0-9_-]+)",
        ),
        rule(
            Platform::Twitter,
            r"(?:https?://)?(?:www\.)?twitter\.com/\w+/status/(\d+)",
        ),
        rule(
            Platform::Twitter,
            r"(?:https?://)?(?:www\.)?x\.com/\w+/status/(\d+)",
        ),
        rule(Platform::Vimeo, r"(?:https?://)?(?:www\.)?vimeo\.com/(\d+)"),
        rule(
            Platform::Dailymotion,
            r"(?:https?://)?(?:www\.)?dailymotion\.com/video/([a-zA-Z0-9]+)",
        ),
    ]
});

/// Structural URL check: http(s) scheme and a plausible host
pub fn validate(url: &str) -> bool {
    parse(url).is_ok()
}

/// Parse and validate, returning the parsed form
pub fn parse(url: &str) -> Result<Url, UrlError> {
    let parsed = Url::parse(url.trim()).map_err(|e| UrlError::Invalid(format!("{url}: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(UrlError::Invalid(format!(
            "unsupported scheme '{}'",
            parsed.scheme()
        )));
    }

    match parsed.host_str() {
        Some(host) if host == "localhost" || (host.contains('.') && !host.ends_with('.')) => {
            Ok(parsed)
        }
        _ => Err(UrlError::Invalid(format!("{url}: missing or invalid host"))),
    }
}

/// Identify the platform and content id of a URL
///
/// Rules are evaluated in order and the first match wins. When no rule
/// matches, the registrable domain is checked for a platform name.
pub fn classify(url: &str) -> (Platform, Option<String>) {
    let Ok(parsed) = parse(url) else {
        return (Platform::Generic, None);
    };

    for rule in RULES.iter() {
        if let Some(id) = rule.pattern.captures(url).and_then(|c| c.get(1)) {
            return (rule.platform, Some(id.as_str().to_string()));
        }
    }

    let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
    let labels: Vec<&str> = host.split('.').collect();
    let base_domain = if labels.len() > 1 {
        labels[labels.len() - 2..].join(".")
    } else {
        host.clone()
    };

    Platform::KNOWN
        .into_iter()
        .find(|p| base_domain.contains(p.as_str()))
        .map_or((Platform::Generic, None), |p| (p, None))
}

/// Canonicalize a URL for the given platform
///
/// Idempotent: normalizing an already normalized URL returns it unchanged.
pub fn normalize(url: &str, platform: Platform) -> String {
    let url = url.trim();

    if platform == Platform::YouTube {
        if url.contains("youtu.be/") {
            if let Some(id) = last_segment(url) {
                return watch_url(id);
            }
        }

        if let Some((_, rest)) = url.split_once("/shorts/") {
            let id = rest.split(['?', '/', '#']).next().unwrap_or_default();
            if !id.is_empty() {
                return watch_url(id);
            }
        }

        // Playlist, timestamp and tracking parameters are dropped
        if url.contains("youtube.com/watch") {
            let params = query_params(&with_scheme(url));
            if let Some(id) = params.get("v").and_then(|v| v.first()).filter(|v| !v.is_empty()) {
                return watch_url(id);
            }
        }
    }

    with_scheme(url)
}

fn with_scheme(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// Query parameters of a URL; repeated keys keep every value in order
pub fn query_params(url: &str) -> BTreeMap<String, Vec<String>> {
    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    if let Ok(parsed) = Url::parse(url) {
        for (key, value) in parsed.query_pairs() {
            params.entry(key.into_owned()).or_default().push(value.into_owned());
        }
    }
    params
}

fn last_segment(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    path.rsplit('/').find(|s| !s.is_empty())
}

fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}
