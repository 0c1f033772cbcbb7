//! Error types returned by the fallible helpers.

use thiserror::Error;

/// A value the byte encoder has no conversion for.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("cannot convert {kind} to bytes: {reason}")]
pub struct EncodingUnsupported {
    /// Category of the rejected value, e.g. `"null"` or `"float"`.
    pub kind: &'static str,
    pub reason: String,
}

impl EncodingUnsupported {
    pub(crate) fn new(kind: &'static str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

/// Input that is not (or does not parse to) a JSON object or array.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{input} is not a JSON object or array")]
pub struct NotJsonContainer {
    /// The rejected input, as text.
    pub input: String,
}

#[derive(Debug, Error)]
pub enum UtilError {
    #[error(transparent)]
    Encoding(#[from] EncodingUnsupported),
    #[error(transparent)]
    NotJson(#[from] NotJsonContainer),
    #[error("unknown log level: {0}")]
    UnknownLevel(String),
    #[error("logger setup failed: {0}")]
    Logger(String),
}
