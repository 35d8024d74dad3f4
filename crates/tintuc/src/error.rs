// ABOUTME: Error types for tintuc including the ErrorCode enum and the ExtractError struct.
// ABOUTME: Every per-URL failure carries the URL, the failing step and an optional HTTP status.

use std::fmt;

/// Error codes representing the categories of extraction failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidUrl,
    UnknownSite,
    Fetch,
    NoContent,
    Config,
    Output,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::InvalidUrl => "invalid URL",
            ErrorCode::UnknownSite => "unknown site",
            ErrorCode::Fetch => "fetch error",
            ErrorCode::NoContent => "no content",
            ErrorCode::Config => "configuration error",
            ErrorCode::Output => "output error",
        };
        write!(f, "{}", s)
    }
}

/// The main error type for extraction operations.
#[derive(Debug, thiserror::Error)]
pub struct ExtractError {
    pub code: ErrorCode,
    pub url: String,
    pub op: String,
    /// HTTP status of the response that caused a fetch failure, when there was one.
    pub status: Option<u16>,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tintuc: {} {}: {}", self.op, self.url, self.code)?;
        if let Some(status) = self.status {
            write!(f, " (HTTP {})", status)?;
        }
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl ExtractError {
    fn new(
        code: ErrorCode,
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            code,
            url: url.into(),
            op: op.into(),
            status: None,
            source,
        }
    }

    /// Create an InvalidUrl error.
    pub fn invalid_url(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::InvalidUrl, url, op, source)
    }

    /// Create an UnknownSite error for a URL that matches no registered site.
    pub fn unknown_site(url: impl Into<String>, op: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::UnknownSite,
            url,
            op,
            Some(anyhow::anyhow!("no registered site matches this URL")),
        )
    }

    /// Create a Fetch error.
    pub fn fetch(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Fetch, url, op, source)
    }

    /// Create a Fetch error for a non-200 response.
    pub fn http_status(url: impl Into<String>, op: impl Into<String>, status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::new(ErrorCode::Fetch, url, op, None)
        }
    }

    /// Create a NoContent error.
    pub fn no_content(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::NoContent, url, op, source)
    }

    /// Create a Config error.
    pub fn config(op: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::new(ErrorCode::Config, String::new(), op, source)
    }

    /// Create an Output error.
    pub fn output(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Output, url, op, source)
    }

    /// Returns a copy of this error attributed to `url`, keeping code, op and status.
    ///
    /// Used where a step that does not know the page URL (body selection) fails.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Returns true if this is an InvalidUrl error.
    pub fn is_invalid_url(&self) -> bool {
        self.code == ErrorCode::InvalidUrl
    }

    /// Returns true if this is an UnknownSite error.
    pub fn is_unknown_site(&self) -> bool {
        self.code == ErrorCode::UnknownSite
    }

    /// Returns true if this is a Fetch error.
    pub fn is_fetch(&self) -> bool {
        self.code == ErrorCode::Fetch
    }

    /// Returns true if this is a NoContent error.
    pub fn is_no_content(&self) -> bool {
        self.code == ErrorCode::NoContent
    }
}
