use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header::USER_AGENT, request::Parts, HeaderMap},
};

const FALLBACK_IP: &str = "127.0.0.1";
const UNKNOWN: &str = "Unknown";

/// Where a request came from: client address and user-agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    pub ip: String,
    pub user_agent: String,
}

impl RequestOrigin {
    pub fn new(ip: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self { ip: ip.into(), user_agent: user_agent.into() }
    }

    /// First `x-forwarded-for` hop, the proxy in front of us appends the rest.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let ip = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .unwrap_or(FALLBACK_IP);

        let user_agent = headers
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        Self::new(ip, user_agent)
    }

    pub fn os(&self) -> String {
        label(detect_os(&self.user_agent))
    }

    pub fn browser(&self) -> String {
        label(detect_browser(&self.user_agent))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestOrigin {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

fn label(detected: Option<(&'static str, String)>) -> String {
    match detected {
        Some((name, version)) if version.is_empty() => name.to_owned(),
        Some((name, version)) => format!("{name} {version}"),
        None => UNKNOWN.to_owned(),
    }
}

/// Text following `token` up to the next delimiter.
fn version_after<'a>(ua: &'a str, token: &str) -> Option<&'a str> {
    let start = ua.find(token)? + token.len();
    let rest = &ua[start..];
    let end = rest
        .find(|c: char| c == ' ' || c == ';' || c == ')')
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

fn detect_browser(ua: &str) -> Option<(&'static str, String)> {
    // Order matters: Chromium derivatives also advertise Chrome and Safari.
    const BROWSERS: [(&str, &str); 9] = [
        ("Edg/", "Edge"),
        ("OPR/", "Opera"),
        ("Whale/", "Whale"),
        ("SamsungBrowser/", "Samsung Internet"),
        ("KAKAOTALK ", "KakaoTalk"),
        ("Firefox/", "Firefox"),
        ("FxiOS/", "Firefox"),
        ("CriOS/", "Chrome"),
        ("Chrome/", "Chrome"),
    ];

    for (token, name) in BROWSERS {
        if let Some(version) = version_after(ua, token) {
            return Some((name, version.to_owned()));
        }
    }

    if ua.contains("Safari/") {
        let version = version_after(ua, "Version/").unwrap_or_default();
        return Some(("Safari", version.to_owned()));
    }
    if let Some(version) = version_after(ua, "MSIE ") {
        return Some(("IE", version.to_owned()));
    }
    if ua.contains("Trident/") {
        let version = version_after(ua, "rv:").unwrap_or_default();
        return Some(("IE", version.to_owned()));
    }

    None
}

fn detect_os(ua: &str) -> Option<(&'static str, String)> {
    if let Some(nt) = version_after(ua, "Windows NT ") {
        let version = match nt {
            "10.0" => "10",
            "6.3" => "8.1",
            "6.2" => "8",
            "6.1" => "7",
            "6.0" => "Vista",
            "5.1" | "5.2" => "XP",
            other => other,
        };
        return Some(("Windows", version.to_owned()));
    }
    for token in ["iPhone OS ", "CPU OS "] {
        if let Some(version) = version_after(ua, token) {
            return Some(("iOS", version.replace('_', ".")));
        }
    }
    if let Some(version) = version_after(ua, "Android ") {
        return Some(("Android", version.to_owned()));
    }
    if ua.contains("Android") {
        return Some(("Android", String::new()));
    }
    if let Some(version) = version_after(ua, "Mac OS X ") {
        return Some(("macOS", version.replace('_', ".")));
    }
    if ua.contains("CrOS") {
        return Some(("Chrome OS", String::new()));
    }
    if ua.contains("Linux") {
        return Some(("Linux", String::new()));
    }

    None
}
