use url::Url;

/// Parse `raw` and keep it only if it has both a scheme and a host.
///
/// The host must be spelled out as an authority (`scheme://host`); inputs
/// such as `http:example.com` are rejected even though URL parsing would
/// repair them.
///
/// ```
/// use fineprint_web::validate_url;
///
/// assert!(validate_url("https://example.com/terms").is_some());
/// assert!(validate_url("not-a-url").is_none());
/// ```
pub fn validate_url(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    let (_, after_scheme) = raw.split_once(':')?;
    let authority = after_scheme
        .strip_prefix("//")?
        .split(['/', '?', '#'])
        .next()
        .unwrap_or("");
    if authority.is_empty() {
        return None;
    }

    let url = Url::parse(raw).ok()?;
    if url.scheme().is_empty() {
        return None;
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Some(url),
        _ => None,
    }
}

pub fn is_valid_url(raw: &str) -> bool {
    validate_url(raw).is_some()
}
