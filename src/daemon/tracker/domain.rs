use url::Url;

/// Browser internal pages. Time spent there is never tracked.
const BLOCKED_PREFIXES: [&str; 4] = ["chrome://", "chrome-extension://", "about:", "edge://"];

/// Returns the hostname of `url`, or `None` when the page isn't eligible for tracking.
pub fn resolve_domain(url: &str) -> Option<String> {
    if url.is_empty() || BLOCKED_PREFIXES.iter().any(|prefix| url.starts_with(prefix)) {
        return None;
    }
    let parsed = Url::parse(url).ok()?;
    parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .map(str::to_string)
}

/// Icon shown next to a domain in statistics. Empty when the url can't be parsed.
pub fn favicon_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => format!(
            "https://www.google.com/s2/favicons?domain={}&sz=64",
            parsed.host_str().unwrap_or_default()
        ),
        Err(_) => String::new(),
    }
}
