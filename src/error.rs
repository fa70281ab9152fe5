//! Error taxonomy for the scrape-and-summarize pipeline.
//!
//! Errors fall into three groups:
//! - [`ScrapeError`]: the listing (or article) page could not be fetched or
//!   no longer has the structure the parser expects.
//! - [`ModelError`]: one completion call against one model failed. These are
//!   classified as transient (try the next model) or permanent (stop).
//! - [`SummaryUnavailable`]: the whole fallback chain failed for an article.
//!
//! [`ConfigError`] covers startup configuration problems.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Failure to acquire or understand the news listing.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Transport error, timeout, or non-success HTTP status.
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The document was fetched but the expected structural markers are absent.
    #[error("unexpected page structure at {url}: {reason}")]
    Parse { url: String, reason: String },

    /// The HTTP client itself could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Failures that trying another model can plausibly avoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransientKind {
    Timeout,
    RateLimited,
    ServerError,
    /// The model is decommissioned or unknown to the provider.
    ModelUnavailable,
    Transport,
    /// The reply could not be read as a summary.
    MalformedResponse,
}

/// Failures that will recur no matter which model is tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermanentKind {
    Unauthorized,
    InvalidRequest,
}

impl TransientKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransientKind::Timeout => "timeout",
            TransientKind::RateLimited => "rate_limited",
            TransientKind::ServerError => "server_error",
            TransientKind::ModelUnavailable => "model_unavailable",
            TransientKind::Transport => "transport",
            TransientKind::MalformedResponse => "malformed_response",
        }
    }
}

impl PermanentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermanentKind::Unauthorized => "unauthorized",
            PermanentKind::InvalidRequest => "invalid_request",
        }
    }
}

impl fmt::Display for TransientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PermanentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Either side of the two-way failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "class", content = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    Transient(TransientKind),
    Permanent(PermanentKind),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Transient(kind) => write!(f, "transient:{kind}"),
            FailureKind::Permanent(kind) => write!(f, "permanent:{kind}"),
        }
    }
}

/// A single failed completion call against a single model.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("transient model failure ({kind}): {message}")]
    Transient { kind: TransientKind, message: String },

    #[error("permanent model failure ({kind}): {message}")]
    Permanent { kind: PermanentKind, message: String },
}

impl ModelError {
    /// A failure the next model in the chain may not share.
    pub fn transient(kind: TransientKind, message: impl Into<String>) -> Self {
        ModelError::Transient {
            kind,
            message: message.into(),
        }
    }

    /// A failure every model would share; stops the chain.
    pub fn permanent(kind: PermanentKind, message: impl Into<String>) -> Self {
        ModelError::Permanent {
            kind,
            message: message.into(),
        }
    }

    /// Class and kind without the message, as recorded in the attempt log.
    pub fn kind(&self) -> FailureKind {
        match self {
            ModelError::Transient { kind, .. } => FailureKind::Transient(*kind),
            ModelError::Permanent { kind, .. } => FailureKind::Permanent(*kind),
        }
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, ModelError::Permanent { .. })
    }
}

/// One entry of the attempt log carried by [`SummaryUnavailable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub model: String,
    pub failure: FailureKind,
}

/// The fallback chain produced no summary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SummaryUnavailable {
    /// Every model failed transiently.
    #[error("all {} model(s) in the chain failed", .attempted.len())]
    Exhausted { attempted: Vec<Attempt> },

    /// A permanent failure stopped the chain before it was exhausted.
    #[error("model {model} failed permanently: {cause}")]
    Aborted {
        model: String,
        cause: ModelError,
        attempted: Vec<Attempt>,
    },
}

impl SummaryUnavailable {
    /// Every model contacted, in order, with how it failed.
    pub fn attempted(&self) -> &[Attempt] {
        match self {
            SummaryUnavailable::Exhausted { attempted } => attempted,
            SummaryUnavailable::Aborted { attempted, .. } => attempted,
        }
    }
}

/// Startup configuration problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no API key configured (set GROQ_API_KEY or pass --api-key)")]
    MissingApiKey,

    #[error("model chain must contain at least one model")]
    EmptyModelChain,

    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_error_classification() {
        let e = ModelError::transient(TransientKind::RateLimited, "429");
        assert!(!e.is_permanent());
        assert_eq!(e.kind(), FailureKind::Transient(TransientKind::RateLimited));

        let e = ModelError::permanent(PermanentKind::Unauthorized, "bad key");
        assert!(e.is_permanent());
        assert_eq!(e.kind().to_string(), "permanent:unauthorized");
    }

    #[test]
    fn test_summary_unavailable_display() {
        let err = SummaryUnavailable::Exhausted {
            attempted: vec![
                Attempt {
                    model: "a".to_string(),
                    failure: FailureKind::Transient(TransientKind::Timeout),
                },
                Attempt {
                    model: "b".to_string(),
                    failure: FailureKind::Transient(TransientKind::ServerError),
                },
            ],
        };
        assert_eq!(err.to_string(), "all 2 model(s) in the chain failed");
        assert_eq!(err.attempted().len(), 2);
    }

    #[test]
    fn test_attempt_serialization() {
        let attempt = Attempt {
            model: "llama3-8b-8192".to_string(),
            failure: FailureKind::Transient(TransientKind::ModelUnavailable),
        };
        let json = serde_json::to_string(&attempt).unwrap();
        assert!(json.contains("\"class\":\"transient\""));
        assert!(json.contains("\"kind\":\"model_unavailable\""));
    }
}
