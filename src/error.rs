// src/error.rs
use std::{path::PathBuf, time::Duration};
use thiserror::Error;

/// Failure reading the last record of a single file.
#[derive(Debug, Error)]
pub enum ReadError {
    /// Fewer than two non-empty lines: no header/data pair.
    #[error("Not enough lines in file")]
    NotEnoughLines { path: PathBuf },

    #[error("{source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read timed out after {timeout:?}")]
    Timeout { path: PathBuf, timeout: Duration },
}

impl ReadError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn path(&self) -> &PathBuf {
        match self {
            Self::NotEnoughLines { path } | Self::Io { path, .. } | Self::Timeout { path, .. } => {
                path
            }
        }
    }

    /// True for the parse failure, as opposed to I/O or timeout.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::NotEnoughLines { .. })
    }
}
