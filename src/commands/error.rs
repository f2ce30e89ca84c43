use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnnotateError>;

#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    #[error("could not open input file: {}", path.display())]
    InputAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not open output file: {}", path.display())]
    OutputAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("writing {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("writing JSON to {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl AnnotateError {
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            message: message.into(),
        }
    }

    /// Every failure is terminal; the tool only distinguishes success from failure.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        1
    }
}
