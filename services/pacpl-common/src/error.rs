//! Error type shared by the screener crates.
//!
//! Per-symbol scan failures never surface here; they are absorbed by the
//! scanner and show up only as missing records. This type covers the
//! failures a caller can act on: a bad configuration file or a bad request.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Configuration that the scanner cannot run with
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected request; the message is shown to API clients verbatim
    #[error("{0}")]
    InvalidInput(String),

    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, past any added context.
    pub fn root(&self) -> &Error {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// HTTP status for this error: 400 for rejected input, 500 otherwise.
    pub fn status_code(&self) -> u16 {
        match self.root() {
            Self::InvalidInput(_) => 400,
            _ => 500,
        }
    }
}

/// Attach context to a fallible result.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }
}
