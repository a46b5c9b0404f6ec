//! Error types for arbor.
//!
//! One tagged error type for the whole workspace: a [`ErrorKind`]
//! discriminant plus a structured context map. Callers match on
//! [`Error::kind`], never on concrete error types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using arbor's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Discriminant for arbor failures.
///
/// | Kind | Recovery |
/// |------|----------|
/// | `Validation` | Non-recoverable, rejects input at the boundary |
/// | `Infrastructure` | Bounded retry, then degrade to an unsorted decision |
/// | `BudgetExceeded` | Skip the enrichment step, continue rule-based |
/// | `Concurrency` | Reload state and retry the update |
/// | `Configuration` | Fatal, aborts startup |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed path, segment, depth, or other boundary input.
    Validation,
    /// Vector index or embedding call failure/timeout.
    Infrastructure,
    /// Quota or token limit hit on an enrichment step.
    BudgetExceeded,
    /// Folder aggregate update conflict.
    Concurrency,
    /// Invalid threshold ordering or weight set.
    Configuration,
    /// Resource does not exist.
    NotFound,
    /// Serialization/deserialization failure.
    Serialization,
    /// File I/O failure.
    Io,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::BudgetExceeded => write!(f, "budget_exceeded"),
            Self::Concurrency => write!(f, "concurrency"),
            Self::Configuration => write!(f, "configuration"),
            Self::NotFound => write!(f, "not_found"),
            Self::Serialization => write!(f, "serialization"),
            Self::Io => write!(f, "io"),
        }
    }
}

/// Core error type for arbor operations.
#[derive(Error, Debug, Clone)]
#[error("{kind} error: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    context: BTreeMap<String, String>,
}

impl Error {
    /// Create an error with the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    /// Attach a context entry (chainable).
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// The error discriminant.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The structured context map.
    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    /// Look up a single context value.
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context.get(key).map(String::as_str)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Infrastructure, message)
    }

    /// An infrastructure error caused by a call timing out.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Infrastructure, message).with_context("timeout", "true")
    }

    pub fn budget_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BudgetExceeded, message)
    }

    pub fn concurrency(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Concurrency, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    /// Whether this error came from a timed-out call.
    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Infrastructure
            && self.context_value("timeout") == Some("true")
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::serialization(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::new(ErrorKind::Io, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_validation() {
        let err = Error::validation("segment too long");
        assert_eq!(err.to_string(), "validation error: segment too long");
    }

    #[test]
    fn test_error_display_infrastructure() {
        let err = Error::infrastructure("index unavailable");
        assert_eq!(err.to_string(), "infrastructure error: index unavailable");
    }

    #[test]
    fn test_error_display_configuration() {
        let err = Error::configuration("threshold ordering violated");
        assert_eq!(
            err.to_string(),
            "configuration error: threshold ordering violated"
        );
    }

    #[test]
    fn test_kind_matching() {
        let err = Error::concurrency("folder version conflict");
        match err.kind() {
            ErrorKind::Concurrency => {}
            other => panic!("Expected Concurrency, got {other:?}"),
        }
    }

    #[test]
    fn test_context_round_trip() {
        let err = Error::validation("bad segment")
            .with_context("segment", "a<b")
            .with_context("max_len", 50);
        assert_eq!(err.context_value("segment"), Some("a<b"));
        assert_eq!(err.context_value("max_len"), Some("50"));
        assert_eq!(err.context().len(), 2);
    }

    #[test]
    fn test_timeout_predicate() {
        assert!(Error::timeout("search timed out").is_timeout());
        assert!(!Error::infrastructure("connection refused").is_timeout());
        // Timeout context on a non-infrastructure kind does not count
        let err = Error::validation("x").with_context("timeout", "true");
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert_eq!(err.kind(), ErrorKind::Serialization);
        assert!(!err.message().is_empty());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&ErrorKind::BudgetExceeded).unwrap();
        assert_eq!(json, "\"budget_exceeded\"");
        let kind: ErrorKind = serde_json::from_str("\"validation\"").unwrap();
        assert_eq!(kind, ErrorKind::Validation);
    }
}
