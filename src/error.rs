//! Error taxonomy for the ingestion and query pipeline.
//!
//! The variants mirror how failures propagate: configuration problems are not
//! retryable, fetch failures are transient and safe to retry on the next
//! scheduled run, parse/protocol failures indicate a bad upstream payload,
//! and `NotFound` is a normal query outcome rather than a fault.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid descriptor/parameters. The caller must fix its input.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Network or HTTP-status failure while resolving a source.
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// A source resolved but its body was not valid JSON.
    #[error("invalid JSON from {origin}: {reason}")]
    Parse { origin: String, reason: String },

    /// A catalog endpoint answered with an unexpected envelope.
    #[error("unexpected catalog response: {0}")]
    Protocol(String),

    /// Query-time: no stored record matched the requested route.
    #[error("no records found for route {route}")]
    NotFound { route: String },

    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        Error::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(source: impl Into<String>, reason: impl ToString) -> Self {
        Error::Parse {
            origin: source.into(),
            reason: reason.to_string(),
        }
    }
}
