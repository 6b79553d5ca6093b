use std::path::PathBuf;

use thiserror::Error;

/// Failures of the host-facing layers: storage, media queries and media
/// loading.
///
/// Tracked tasks never produce this; their errors are their own `E`.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid media query '{query}': {reason}")]
    MediaQuery { query: String, reason: String },

    #[error("could not load media '{src}': {reason}")]
    MediaLoad { src: String, reason: String },
}

pub type Result<T, E = HookError> = std::result::Result<T, E>;
