//! Minimal HTTP page downloader with safe logging, retries and size guards.
//!
//! - Client-wide user agent, timeouts, redirect cap and retry budget
//! - Redacts sensitive query params and never logs secret values
//! - Retries 429/5xx and transport errors with exponential backoff and
//!   `Retry-After` support; a `Retry-After` longer than the request timeout
//!   ends the attempt instead of stalling the caller
//! - Caps the body size while streaming, so oversized pages are abandoned
//!   before they are fully buffered
//! - Optional *raw* request/response logging via `FINEPRINT_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), fineprint_http::HttpError> {
//! let client = fineprint_http::HttpClient::new(fineprint_http::ClientOpts::default())?;
//! let url = reqwest::Url::parse("https://example.com/terms").unwrap();
//! let page = client.get_bytes(&url).await?;
//! println!("{} bytes from {}", page.body.len(), page.final_url);
//! # Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body snippets (truncated), retries and final errors,
//! plus raw request/response lines (target `http.raw`) when
//! `FINEPRINT_HTTP_RAW=1`.

use bytes::{Bytes, BytesMut};
use reqwest::header::{CONTENT_TYPE, HeaderMap, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode, Url, redirect};
use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "FINEPRINT_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024; // cap raw body logs (64 KiB)

static REQ_COUNTER: AtomicU64 = AtomicU64::new(0);

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

/// Render a best-effort curl command for repro/debug, with secrets redacted.
fn make_curl(method: &Method, url: &Url, user_agent: &str) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{}", method)];
    parts.push(format!("-A '{}'", user_agent.replace('\'', r"'\''")));
    let (host_path, query) = redact_query(url);
    let mut target = format!("{}://{}", url.scheme(), host_path);
    if !query.is_empty() {
        let q = query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        target.push('?');
        target.push_str(&q);
    }
    parts.push(format!("'{}'", target.replace('\'', r"'\''")));
    parts.join(" ")
}

/// Redact sensitive headers for logging
fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let mut val = v.to_str().unwrap_or("").to_string();
            if key.eq_ignore_ascii_case("set-cookie") || key.eq_ignore_ascii_case("authorization")
            {
                val = "<redacted>".into();
            }
            (key, val)
        })
        .collect()
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("client build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("redirect limit exceeded: {0}")]
    Redirect(String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Status {
        status: StatusCode,
        message: String,
        request_id: String,
    },
    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

// ==============================
// Client & Request Options
// ==============================

/// Construction-time settings that `reqwest` bakes into the client.
///
/// ```
/// use fineprint_http::ClientOpts;
/// use std::time::Duration;
///
/// let opts = ClientOpts::default();
/// assert_eq!(opts.connect_timeout, Duration::from_secs(5));
/// assert_eq!(opts.max_redirects, 2);
/// ```
#[derive(Clone, Debug)]
pub struct ClientOpts {
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub max_redirects: usize,
}

impl Default for ClientOpts {
    fn default() -> Self {
        Self {
            user_agent: concat!("fineprint-http/", env!("CARGO_PKG_VERSION")).into(),
            connect_timeout: Duration::from_secs(5),
            max_redirects: 2,
        }
    }
}

/// A fully downloaded response body.
#[derive(Clone, Debug)]
pub struct FetchedPage {
    /// URL after redirects.
    pub final_url: Url,
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[derive(Clone)]
pub struct HttpClient {
    inner: Client,
    user_agent: String,
    pub default_timeout: Duration,
    pub max_retries: usize,
    /// Upper bound on the body size; `None` disables the guard.
    pub max_body_bytes: Option<usize>,
}

impl HttpClient {
    /// Construct a client with the given user agent and redirect policy.
    ///
    /// ```no_run
    /// use fineprint_http::{ClientOpts, HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new(ClientOpts::default())?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(30));
    /// assert_eq!(client.max_retries, 1);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(opts: ClientOpts) -> Result<Self, HttpError> {
        let policy = if opts.max_redirects == 0 {
            redirect::Policy::none()
        } else {
            redirect::Policy::limited(opts.max_redirects)
        };
        let inner = Client::builder()
            .user_agent(opts.user_agent.clone())
            .connect_timeout(opts.connect_timeout)
            .redirect(policy)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            inner,
            user_agent: opts.user_agent,
            default_timeout: Duration::from_secs(30),
            max_retries: 1,
            max_body_bytes: None,
        })
    }

    /// Override the default timeout returned by [`HttpClient::new`].
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    /// Override the default retry budget returned by [`HttpClient::new`].
    ///
    /// ```no_run
    /// use fineprint_http::{ClientOpts, HttpClient, HttpError};
    ///
    /// let client = HttpClient::new(ClientOpts::default())?.with_retries(5);
    /// assert_eq!(client.max_retries, 5);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    /// Abandon responses whose body would exceed `limit` bytes.
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = Some(limit);
        self
    }

    /// GET a URL and buffer its body.
    ///
    /// Non-success statuses surface as [`HttpError::Status`] once the retry
    /// budget for 429/5xx is spent, or right away when the server asks for a
    /// `Retry-After` longer than the request timeout.
    pub async fn get_bytes(&self, url: &Url) -> Result<FetchedPage, HttpError> {
        let mut attempt = 0usize;
        let max_retries = self.max_retries;
        let timeout = self.default_timeout;
        let method = Method::GET;

        loop {
            let rb = self
                .inner
                .request(method.clone(), url.clone())
                .timeout(timeout);

            let req_id = format!("r{:x}", REQ_COUNTER.fetch_add(1, Ordering::Relaxed));
            let (host_path, redacted_q) = redact_query(url);

            tracing::debug!(
                req_id=%req_id,
                attempt=attempt + 1,
                max_retries,
                method=%method,
                host_path=%host_path,
                query=?redacted_q,
                timeout_ms=timeout.as_millis() as u64,
                "http.request.start"
            );

            if raw_enabled() {
                let curl = make_curl(&method, url, &self.user_agent);
                tracing::debug!(target: "http.raw", %req_id, %curl, "request");
            }

            // ----- Send -----
            let t0 = std::time::Instant::now();
            let mut resp = match rb.send().await {
                Ok(resp) => resp,
                Err(err) if err.is_redirect() => {
                    tracing::warn!(req_id=%req_id, message=%err, "http.redirect_limit");
                    return Err(HttpError::Redirect(err.to_string()));
                }
                Err(err) => {
                    let message = err.to_string();
                    if attempt < max_retries {
                        attempt += 1;
                        let delay = backoff(attempt);
                        tracing::warn!(
                            req_id=%req_id,
                            attempt,
                            max_retries,
                            backoff_ms=delay.as_millis() as u64,
                            message=%message,
                            "http.retrying.network_send"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    tracing::warn!(
                        req_id=%req_id,
                        attempt,
                        max_retries,
                        message=%message,
                        "http.network_error.send"
                    );
                    return Err(HttpError::Network(message));
                }
            };

            let status = resp.status();
            let headers = resp.headers().clone();
            let final_url = resp.url().clone();

            // ----- Non-success: maybe retry, without reading a large body -----
            if !status.is_success() {
                let is_429 = status == StatusCode::TOO_MANY_REQUESTS;
                let is_5xx = status.is_server_error();
                let request_id = header_request_id(&headers).to_string();
                let retry_after = retry_after_delay_secs(&headers).map(Duration::from_secs);
                let wait_too_long = retry_after.is_some_and(|d| d > timeout);
                if wait_too_long && (is_429 || is_5xx) && attempt < max_retries {
                    tracing::warn!(
                        req_id=%req_id,
                        %status,
                        retry_after_secs=?retry_after.map(|d| d.as_secs()),
                        timeout_ms=timeout.as_millis() as u64,
                        "http.retry_after_exceeds_timeout"
                    );
                }

                if (is_429 || is_5xx) && attempt < max_retries && !wait_too_long {
                    attempt += 1;
                    let delay = if let Some(wait) = retry_after {
                        wait
                    } else if is_429 {
                        backoff(attempt).max(Duration::from_millis(1100))
                    } else {
                        backoff(attempt)
                    };
                    tracing::warn!(
                        req_id=%req_id,
                        %status,
                        attempt,
                        max_retries,
                        backoff_ms=delay.as_millis() as u64,
                        retry_after_secs=?retry_after.map(|d| d.as_secs()),
                        "http.retrying"
                    );
                    sleep(delay).await;
                    continue;
                }

                let message = status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string();
                tracing::warn!(
                    req_id=%req_id,
                    %status,
                    message=%message,
                    x_request_id=%request_id,
                    "http.error"
                );
                return Err(HttpError::Status {
                    status,
                    message,
                    request_id,
                });
            }

            if let (Some(limit), Some(declared)) = (self.max_body_bytes, resp.content_length()) {
                if declared as usize > limit {
                    tracing::warn!(req_id=%req_id, limit, declared, "http.body.too_large");
                    return Err(HttpError::TooLarge { limit });
                }
            }

            // ----- Stream body with size guard -----
            let mut buf = BytesMut::new();
            let body_result: Result<(), reqwest::Error> = loop {
                match resp.chunk().await {
                    Ok(Some(chunk)) => {
                        buf.extend_from_slice(&chunk);
                        if let Some(limit) = self.max_body_bytes {
                            if buf.len() > limit {
                                tracing::warn!(
                                    req_id=%req_id,
                                    limit,
                                    received=buf.len(),
                                    "http.body.too_large"
                                );
                                return Err(HttpError::TooLarge { limit });
                            }
                        }
                    }
                    Ok(None) => break Ok(()),
                    Err(err) => break Err(err),
                }
            };
            if let Err(err) = body_result {
                let message = err.to_string();
                if attempt < max_retries {
                    attempt += 1;
                    let delay = backoff(attempt);
                    tracing::warn!(
                        req_id=%req_id,
                        attempt,
                        max_retries,
                        backoff_ms=delay.as_millis() as u64,
                        message=%message,
                        "http.retrying.network_body"
                    );
                    sleep(delay).await;
                    continue;
                }
                tracing::warn!(
                    req_id=%req_id,
                    attempt,
                    max_retries,
                    message=%message,
                    "http.network_error.body"
                );
                return Err(HttpError::Network(message));
            }
            let body = buf.freeze();
            let dur_ms = t0.elapsed().as_millis() as u64;

            let content_type = headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            tracing::debug!(
                req_id=%req_id,
                %status,
                duration_ms=dur_ms,
                body_len=body.len(),
                content_type=?content_type,
                final_url=%redact_query(&final_url).0,
                x_request_id=%header_request_id(&headers),
                "http.response.headers"
            );

            if raw_enabled() {
                let hdrs = redact_headers(&headers);
                let truncated = body.len() > RAW_MAX_BODY;
                let text = String::from_utf8_lossy(&body[..body.len().min(RAW_MAX_BODY)]);
                tracing::info!(
                    target: "http.raw",
                    %req_id,
                    status=%status,
                    duration_ms=dur_ms,
                    headers=?hdrs,
                    body=%text,
                    truncated
                );
            }

            tracing::trace!(
                req_id=%req_id,
                body_snippet=%snip_body(&body),
                "http.response.body_snippet"
            );

            return Ok(FetchedPage {
                final_url,
                status,
                content_type,
                body,
            });
        }
    }
}

// ==============================
// Helpers
// ==============================

fn backoff(attempt: usize) -> Duration {
    let shift = attempt.saturating_sub(1).min(16) as u32;
    Duration::from_millis(200u64.saturating_mul(1u64 << shift))
}

fn header_request_id(h: &HeaderMap) -> &str {
    h.get("x-request-id")
        .or_else(|| h.get("x-correlation-id"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
}

fn retry_after_delay_secs(h: &HeaderMap) -> Option<u64> {
    h.get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())?
        .trim()
        .parse()
        .ok()
}

fn snip_body(body: &[u8]) -> String {
    let end = body.len().min(500);
    let mut snip = String::from_utf8_lossy(&body[..end]).to_string();
    if body.len() > 500 {
        snip.push_str("...");
    }
    snip
}

fn redact_query(url: &Url) -> (String, Vec<(String, String)>) {
    // Return "host + path" string and redacted query list for logging
    let host_path = format!("{}{}", url.host_str().unwrap_or("-"), url.path());
    let redacted = url
        .query_pairs()
        .map(|(k, v)| {
            let k = k.to_string();
            let v = v.to_string();
            let is_secret = matches!(
                k.to_ascii_lowercase().as_str(),
                "access_token"
                    | "authorization"
                    | "auth"
                    | "key"
                    | "api_key"
                    | "token"
                    | "secret"
                    | "client_secret"
                    | "bearer"
                    | "session"
                    | "sig"
                    | "signature"
            );
            (k, if is_secret { "<redacted>".into() } else { v })
        })
        .collect::<Vec<_>>();
    (host_path, redacted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn backoff_doubles_from_200ms() {
        assert_eq!(backoff(1), Duration::from_millis(200));
        assert_eq!(backoff(2), Duration::from_millis(400));
        assert_eq!(backoff(3), Duration::from_millis(800));
    }

    #[test]
    fn retry_after_parses_seconds_only() {
        let mut h = HeaderMap::new();
        h.insert(RETRY_AFTER, HeaderValue::from_static("3"));
        assert_eq!(retry_after_delay_secs(&h), Some(3));
        h.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after_delay_secs(&h), None);
    }

    #[test]
    fn query_secrets_are_redacted() {
        let url = Url::parse("https://example.com/page?token=abc&lang=en").unwrap();
        let (host_path, q) = redact_query(&url);
        assert_eq!(host_path, "example.com/page");
        assert!(q.contains(&("token".to_string(), "<redacted>".to_string())));
        assert!(q.contains(&("lang".to_string(), "en".to_string())));
    }

    #[test]
    fn curl_never_contains_secrets() {
        let url = Url::parse("https://example.com/p?api_key=s3cr3t&lang=en").unwrap();
        let curl = make_curl(&Method::GET, &url, "fineprint/1.0");
        assert!(!curl.contains("s3cr3t"));
        assert!(curl.contains("lang=en"));
        assert!(curl.starts_with("curl -XGET -A 'fineprint/1.0'"));
    }

    #[test]
    fn snippet_is_capped() {
        let body = vec![b'a'; 800];
        let s = snip_body(&body);
        assert_eq!(s.len(), 503);
        assert!(s.ends_with("..."));
    }
}
