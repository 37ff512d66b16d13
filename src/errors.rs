use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for fatal corpus, sampling, and persistence failures.
///
/// Recoverable anomalies (malformed lines, clamped targets, sampling shortfall)
/// are reported through outcome structs instead.
#[derive(Debug, Error)]
pub enum PairsError {
    #[error(
        "insufficient data: need at least 2 clone groups and 2 functions, found {groups} groups and {functions} functions"
    )]
    /// The corpus cannot yield both pair kinds.
    InsufficientData {
        /// Groups left after loading and filtering.
        groups: usize,
        /// Functions across those groups.
        functions: usize,
    },
    #[error("i/o failure on '{}': {source}", path.display())]
    /// An I/O failure tied to a specific file.
    Path {
        /// File being opened, created, or read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// I/O failure without a known path.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// JSON encoding or decoding failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Invalid options or arguments.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl PairsError {
    pub(crate) fn at_path(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Path {
            path: path.into(),
            source,
        }
    }
}
