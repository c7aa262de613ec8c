/// Error types for the migration job
///
/// Each stage owns its error enum. Only `JobError` ever aborts a run;
/// the others are caught at the per-file or per-step boundary and turned
/// into a console message plus a counter.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while decoding, resizing or encoding one image
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("WebP encoder rejected the image: {0}")]
    Encode(String),

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of the backup/replace bookkeeping around a conversion
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("failed to back up {}: {source}", .path.display())]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove original {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to restore {} from backup: {source}", .path.display())]
    Restore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while loading, rewriting or saving the catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("catalog top-level value is not an array")]
    NotAnArray,

    #[error("failed to snapshot catalog to {}: {source}", .path.display())]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fatal errors that stop the job before any file is touched
#[derive(Debug, Error)]
pub enum JobError {
    #[error("WebP encoder is unavailable")]
    EncoderUnavailable,

    #[error("root directory does not exist: {}", .0.display())]
    MissingRoot(PathBuf),

    #[error("failed to read confirmation: {0}")]
    Prompt(#[from] std::io::Error),
}
