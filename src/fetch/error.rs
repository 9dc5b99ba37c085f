use crate::common::TimeWindow;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Client(#[from] crate::client::Error),

    #[error("no workflow runs found in time window {0}")]
    NoRunsFound(TimeWindow),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to extract {path}: {source}")]
    Archive {
        path: PathBuf,
        source: zip::result::ZipError,
    },
}

impl Error {
    pub(crate) fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn no_runs_found(&self) -> bool {
        matches!(self, Self::NoRunsFound(_))
    }
}
