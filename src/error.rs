//! Error taxonomy shared across every module.
//!
//! One enum covers the whole pipeline so callers can match on `Kind` instead
//! of downcasting. `anyhow` stays at the binary boundary only; everything in
//! the library returns `Result<T, Error>`.

use thiserror::Error;

/// Coarse-grained classification of an [`Error`], independent of its message.
/// Useful for tests and for the top-level handler deciding an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Authorization,
    Validation,
    TransientNetwork,
    RateLimited,
    TagMissing,
    TagOrder,
    PartialIngestion,
    Cancelled,
    Io,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("authorization failed: {0}")]
    Authorization(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("transient network failure: {0}")]
    TransientNetwork(String),

    #[error("rate limited, resets at {reset_at}")]
    RateLimited { reset_at: i64 },

    #[error("README tag missing: {0}")]
    TagMissing(String),

    #[error("README tags out of order: {0}")]
    TagOrder(String),

    #[error("partial ingestion for {repo}: {reason}")]
    PartialIngestion { repo: String, reason: String },

    #[error("cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Maps a non-retryable failure to the right taxonomy member (§4.C/§7):
    /// 401/403 are authorization failures, 404/422 are validation failures,
    /// anything else still reports as a network failure.
    pub fn classify(status: Option<u16>, message: String) -> Error {
        match status {
            Some(401) | Some(403) => Error::Authorization(message),
            Some(404) | Some(422) => Error::Validation(message),
            _ => Error::TransientNetwork(message),
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Error::Authorization(_) => Kind::Authorization,
            Error::Validation(_) => Kind::Validation,
            Error::TransientNetwork(_) => Kind::TransientNetwork,
            Error::RateLimited { .. } => Kind::RateLimited,
            Error::TagMissing(_) => Kind::TagMissing,
            Error::TagOrder(_) => Kind::TagOrder,
            Error::PartialIngestion { .. } => Kind::PartialIngestion,
            Error::Cancelled => Kind::Cancelled,
            Error::Io(_) => Kind::Io,
            Error::Http(_) => Kind::TransientNetwork,
        }
    }

    /// True for errors the retry wrapper should retry (§4.C classification).
    ///
    /// Matches on HTTP status text and known substrings the same way the
    /// upstream error bodies phrase transient failures, so classification
    /// works whether the error originated from a status code or a message.
    pub fn is_transient(message: &str, status: Option<u16>) -> bool {
        if matches!(status, Some(502) | Some(503) | Some(504)) {
            return true;
        }
        let lower = message.to_lowercase();
        [
            "timeout",
            "bad gateway",
            "service unavailable",
            "gateway timeout",
            "request_error",
            "network",
            "connection",
        ]
        .iter()
        .any(|needle| lower.contains(needle))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_maps_each_variant() {
        assert_eq!(Error::Authorization("x".into()).kind(), Kind::Authorization);
        assert_eq!(Error::Cancelled.kind(), Kind::Cancelled);
        assert_eq!(
            Error::RateLimited { reset_at: 10 }.kind(),
            Kind::RateLimited
        );
    }

    #[test]
    fn is_transient_matches_5xx_status() {
        assert!(Error::is_transient("whatever", Some(502)));
        assert!(Error::is_transient("whatever", Some(503)));
        assert!(Error::is_transient("whatever", Some(504)));
        assert!(!Error::is_transient("whatever", Some(404)));
    }

    #[test]
    fn is_transient_matches_message_substrings_case_insensitively() {
        assert!(Error::is_transient("Connection reset by peer", None));
        assert!(Error::is_transient("GATEWAY TIMEOUT", None));
        assert!(!Error::is_transient("unauthorized", None));
    }

    #[test]
    fn classify_maps_auth_and_validation_statuses() {
        assert_eq!(
            Error::classify(Some(401), "nope".into()).kind(),
            Kind::Authorization
        );
        assert_eq!(
            Error::classify(Some(403), "nope".into()).kind(),
            Kind::Authorization
        );
        assert_eq!(
            Error::classify(Some(404), "nope".into()).kind(),
            Kind::Validation
        );
        assert_eq!(
            Error::classify(Some(422), "nope".into()).kind(),
            Kind::Validation
        );
        assert_eq!(
            Error::classify(Some(418), "nope".into()).kind(),
            Kind::TransientNetwork
        );
        assert_eq!(
            Error::classify(None, "nope".into()).kind(),
            Kind::TransientNetwork
        );
    }
}
