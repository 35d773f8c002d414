//! Failure taxonomy for per-link work
//!
//! Every failure that happens while fetching a page is wrapped into an
//! [`AppError`] carrying an [`ErrorKind`], an optional source error, free-form
//! context annotations and a `retryable` flag fixed at construction time.
//! The retry executor and the crawl logging both key off this
//! classification.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Shared error used as the cause of an [`AppError`]
pub type SourceError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Context key holding the HTTP status code of an [`ErrorKind::Http`] error
pub const STATUS_CODE_KEY: &str = "status_code";

/// Classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    Timeout,
    Http,
    Parse,
    Config,
    Validation,
    File,
    Unknown,
}

impl ErrorKind {
    /// Whether errors of this kind are retryable by default
    ///
    /// HTTP errors are retryable across the board; status-sensitive callers
    /// inspect the `status_code` context entry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::Timeout | Self::Http)
    }

    /// Returns the stable upper-case name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT_ERROR",
            Self::Http => "HTTP_ERROR",
            Self::Parse => "PARSE_ERROR",
            Self::Config => "CONFIG_ERROR",
            Self::Validation => "VALIDATION_ERROR",
            Self::File => "FILE_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure
#[derive(Debug, Clone)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    source: Option<SourceError>,
    context: BTreeMap<String, String>,
    timestamp: DateTime<Utc>,
    retryable: bool,
}

impl AppError {
    /// Creates an error of the given kind; `retryable` follows the kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
            timestamp: Utc::now(),
            retryable: kind.is_retryable(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Creates an HTTP error; the status code is stored under `status_code`
    pub fn http(message: impl Into<String>, status_code: u16) -> Self {
        Self::new(ErrorKind::Http, message).with_context(STATUS_CODE_KEY, status_code)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn file(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::File, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    /// Attaches the underlying cause
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Adds a context annotation
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Classifies a `reqwest` failure for `url`
    ///
    /// The client's own request timeout is reported as [`ErrorKind::Network`]
    /// with a `reason = request_timeout` annotation. [`ErrorKind::Timeout`] is
    /// reserved for cancellation and deadline expiry.
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_builder() {
            return Self::validation(format!("invalid request for {}", url)).with_source(err);
        }

        if let Some(status) = err.status() {
            return Self::http(format!("HTTP error for {}", url), status.as_u16())
                .with_source(err);
        }

        let reason = if err.is_timeout() {
            "request_timeout"
        } else if err.is_connect() {
            "connect"
        } else if err.is_redirect() {
            "redirect"
        } else if err.is_body() || err.is_decode() {
            "body"
        } else {
            "request"
        };

        Self::network(format!("failed to fetch {}", url))
            .with_context("reason", reason)
            .with_source(err)
    }

    /// Prefixes the message while keeping kind, flag, cause and context
    pub fn wrap(self, message: impl fmt::Display) -> Self {
        Self {
            message: format!("{}: {}", message, self.message),
            timestamp: Utc::now(),
            ..self
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    /// Returns the HTTP status code recorded on the error, if any
    pub fn status_code(&self) -> Option<u16> {
        self.context.get(STATUS_CODE_KEY)?.parse().ok()
    }

    /// Logs the error at a level chosen by its kind
    ///
    /// `extra` entries are merged over the error's own context.
    pub fn log(&self, extra: &[(&str, String)]) {
        let mut fields = self.context.clone();
        for (key, value) in extra {
            fields.insert((*key).to_string(), value.clone());
        }
        let fields = render_fields(&fields);

        match self.kind {
            ErrorKind::Network | ErrorKind::Timeout => {
                tracing::warn!(kind = %self.kind, fields = %fields, "{}", self);
            }
            ErrorKind::Http if self.status_code().is_some_and(|s| s < 500) => {
                tracing::warn!(kind = %self.kind, fields = %fields, "{}", self);
            }
            _ => {
                tracing::error!(kind = %self.kind, fields = %fields, "{}", self);
            }
        }
    }
}

fn render_fields(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {} (caused by: {})", self.kind, self.message, source),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::file(err.to_string()).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_by_kind() {
        assert!(AppError::network("x").is_retryable());
        assert!(AppError::timeout("x").is_retryable());
        assert!(AppError::http("x", 404).is_retryable());
        assert!(!AppError::parse("x").is_retryable());
        assert!(!AppError::config("x").is_retryable());
        assert!(!AppError::validation("x").is_retryable());
        assert!(!AppError::file("x").is_retryable());
        assert!(!AppError::unknown("x").is_retryable());
    }

    #[test]
    fn test_http_error_carries_status_code() {
        let err = AppError::http("HTTP error for https://x.test/", 503);
        assert_eq!(err.kind(), ErrorKind::Http);
        assert_eq!(err.status_code(), Some(503));
        assert_eq!(err.context().get("status_code").map(String::as_str), Some("503"));
    }

    #[test]
    fn test_wrap_preserves_classification() {
        let err = AppError::validation("bad input")
            .with_context("field", "url")
            .wrap("failed to crawl https://x.test/")
            .wrap("session");

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!err.is_retryable());
        assert_eq!(err.message(), "session: failed to crawl https://x.test/: bad input");
        assert_eq!(err.context().get("field").map(String::as_str), Some("url"));
    }

    #[test]
    fn test_display_includes_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = AppError::file("cannot write").with_source(io);
        assert_eq!(err.to_string(), "FILE_ERROR: cannot write (caused by: disk full)");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_display_without_cause() {
        let err = AppError::timeout("operation cancelled");
        assert_eq!(err.to_string(), "TIMEOUT_ERROR: operation cancelled");
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ErrorKind::Network.to_string(), "NETWORK_ERROR");
        assert_eq!(ErrorKind::Unknown.to_string(), "UNKNOWN_ERROR");
    }

    #[test]
    fn test_io_error_maps_to_file_kind() {
        let err: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.kind(), ErrorKind::File);
        assert!(!err.is_retryable());
    }
}
