// ABOUTME: Fetch session owning the HTTP clients, request headers and cookie jar.
// ABOUTME: Answers the cookie-then-reload anti-bot challenge with one delayed retry.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use url::Url;

use crate::error::ExtractError;
use crate::options::{Options, DEFAULT_ACCEPT};
use crate::sites::SiteProfile;

/// Maximum allowed content length (10 MB).
pub const MAX_CONTENT_LENGTH: usize = 10 * 1024 * 1024;

/// The literal `document.cookie="..."` assignment of a challenge page.
static CHALLENGE_COOKIE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"document\.cookie="([^"]+)""#).unwrap());

/// Transport settings shared by every request of a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub accept_language: String,
    pub headers: HashMap<String, String>,
    pub challenge_delay: Duration,
}

impl From<&Options> for SessionConfig {
    fn from(opts: &Options) -> Self {
        Self {
            timeout: opts.timeout,
            user_agent: opts.user_agent.clone(),
            accept_language: opts.accept_language.clone(),
            headers: opts.headers.clone(),
            challenge_delay: opts.challenge_delay,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&Options::default())
    }
}

/// A page body accepted with HTTP 200, not yet decoded.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub url: String,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchResult {
    /// Decodes the body with the declared charset, or the detected one when none is usable.
    pub fn text(&self) -> String {
        let (encoding, source) = page_encoding(&self.body, self.content_type.as_deref());
        tracing::debug!(url = %self.url, encoding = encoding.name(), ?source, "decoding page");
        let (decoded, _, _) = encoding.decode(&self.body);
        decoded.into_owned()
    }
}

/// Where a page's encoding was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharsetSource {
    Header,
    Detected,
}

/// Picks the encoding of a page: the Content-Type charset if it names a known
/// encoding, otherwise a guess from the bytes.
fn page_encoding(body: &[u8], content_type: Option<&str>) -> (&'static Encoding, CharsetSource) {
    let declared = content_type
        .and_then(charset_label)
        .and_then(|label| Encoding::for_label(label.as_bytes()));
    if let Some(encoding) = declared {
        return (encoding, CharsetSource::Header);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(body, true);
    (detector.guess(None, true), CharsetSource::Detected)
}

/// The `charset` parameter of a Content-Type value, unquoted.
fn charset_label(content_type: &str) -> Option<&str> {
    content_type.split(';').find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(|c| c == '"' || c == '\''))
    })
}

/// Returns true if the page is a cookie-then-reload challenge.
pub fn is_cookie_challenge(body: &str) -> bool {
    body.contains("document.cookie=") && body.contains("window.location.reload")
}

/// Parses `name` and `value` out of the challenge's `document.cookie="name=value; ..."`.
pub fn parse_challenge_cookie(body: &str) -> Option<(String, String)> {
    let assignment = CHALLENGE_COOKIE_RE.captures(body)?.get(1)?.as_str();
    let pair = assignment.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

/// Issue one GET and accept only HTTP 200.
pub fn fetch_once(client: &Client, url: &str, op: &str) -> Result<FetchResult, ExtractError> {
    let response = client.get(url).send().map_err(|e| {
        let msg = if e.is_timeout() {
            anyhow::anyhow!("request timed out: {}", e)
        } else {
            anyhow::anyhow!("request failed: {}", e)
        };
        ExtractError::fetch(url, op, Some(msg))
    })?;

    let status = response.status().as_u16();
    if status != 200 {
        return Err(ExtractError::http_status(url, op, status));
    }

    if let Some(len) = response.content_length() {
        if len as usize > MAX_CONTENT_LENGTH {
            return Err(ExtractError::fetch(
                url,
                op,
                Some(anyhow::anyhow!("content too large")),
            ));
        }
    }

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_lowercase());

    let body = response.bytes().map_err(|e| {
        ExtractError::fetch(url, op, Some(anyhow::anyhow!("failed to read body: {}", e)))
    })?;

    if body.len() > MAX_CONTENT_LENGTH {
        return Err(ExtractError::fetch(
            url,
            op,
            Some(anyhow::anyhow!("content too large")),
        ));
    }

    Ok(FetchResult {
        url: url.to_string(),
        content_type,
        body,
    })
}

/// A single-owner fetch session.
///
/// Both clients share one cookie jar, so a cookie installed while answering a
/// challenge is sent by whichever client the next site needs. Certificate
/// verification is chosen per request from the site profile; the
/// non-verifying client is only built the first time such a site is fetched.
pub struct Session {
    config: SessionConfig,
    jar: Arc<Jar>,
    verified: Client,
    insecure: OnceCell<Client>,
}

impl Session {
    /// Create a session with its own cookie jar.
    pub fn new(config: SessionConfig) -> Result<Self, ExtractError> {
        let jar = Arc::new(Jar::default());
        let verified = build_client(&config, &jar, true)?;
        Ok(Self {
            config,
            jar,
            verified,
            insecure: OnceCell::new(),
        })
    }

    fn client_for(&self, site: &SiteProfile) -> Result<&Client, ExtractError> {
        if !site.insecure_tls {
            return Ok(&self.verified);
        }
        self.insecure.get_or_try_init(|| {
            tracing::debug!(site = %site.id, "building client without certificate verification");
            build_client(&self.config, &self.jar, false)
        })
    }

    /// Fetch the HTML of `url` for `site`, answering one cookie challenge.
    pub fn fetch(&self, url: &str, site: &SiteProfile) -> Result<String, ExtractError> {
        let client = self.client_for(site)?;

        tracing::debug!(%url, site = %site.id, "fetching page");
        let page = fetch_once(client, url, "Fetch")?.text();
        if !is_cookie_challenge(&page) {
            return Ok(page);
        }

        match parse_challenge_cookie(&page) {
            Some((name, value)) => {
                tracing::info!(%url, cookie = %name, "answering cookie challenge");
                self.install_cookie(url, &name, &value)?;
            }
            None => tracing::warn!(%url, "cookie challenge without a parseable cookie"),
        }

        thread::sleep(self.config.challenge_delay);
        let page = fetch_once(client, url, "FetchRetry")?.text();
        Ok(page)
    }

    /// Store `name=value` in the session's jar for every path on the host of `url`.
    pub fn install_cookie(&self, url: &str, name: &str, value: &str) -> Result<(), ExtractError> {
        let parsed = Url::parse(url).map_err(|e| {
            ExtractError::invalid_url(url, "InstallCookie", Some(anyhow::anyhow!("{}", e)))
        })?;
        // without an explicit path the jar scopes the cookie to the article's directory
        self.jar.add_cookie_str(&format!("{}={}; Path=/", name, value), &parsed);
        Ok(())
    }

    /// The `Cookie` header the session would send to `url`.
    pub fn cookie_header(&self, url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        let header = self.jar.cookies(&parsed)?;
        header.to_str().ok().map(str::to_string)
    }
}

fn build_client(
    config: &SessionConfig,
    jar: &Arc<Jar>,
    verify_tls: bool,
) -> Result<Client, ExtractError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
    headers.insert(ACCEPT_LANGUAGE, header_value(&config.accept_language)?);
    for (key, value) in &config.headers {
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
            ExtractError::config(
                "BuildClient",
                Some(anyhow::anyhow!("invalid header name {:?}: {}", key, e)),
            )
        })?;
        headers.insert(name, header_value(value)?);
    }

    Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(headers)
        .timeout(config.timeout)
        .cookie_provider(Arc::clone(jar))
        .danger_accept_invalid_certs(!verify_tls)
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
        .map_err(|e| {
            ExtractError::config(
                "BuildClient",
                Some(anyhow::anyhow!("failed to build HTTP client: {}", e)),
            )
        })
}

fn header_value(value: &str) -> Result<HeaderValue, ExtractError> {
    HeaderValue::from_str(value).map_err(|e| {
        ExtractError::config(
            "BuildClient",
            Some(anyhow::anyhow!("invalid header value {:?}: {}", value, e)),
        )
    })
}
