use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error("failed to parse report {path}: {source}")]
    Parse { path: PathBuf, source: ParseError },

    #[error("malformed test class name '{0}': expected at least 3 dot separated segments")]
    MalformedClassName(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl Error {
    pub(crate) fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error(transparent)]
    Xml(#[from] roxmltree::Error),

    #[error("unsupported encoding '{0}'")]
    UnsupportedEncoding(String),

    #[error("report is not valid {0}")]
    InvalidEncoding(&'static str),

    #[error("invalid time '{value}' for test case '{test}'")]
    InvalidDuration { test: String, value: String },
}
