//! Error types for the scan, extraction and library layers

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

use crate::library::PersistFailurePolicy;

/// Failures talking to the external tag decoder
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The decoder never created its pipe
    #[error("Tag decoder pipe {} did not appear within {timeout:?}", .path.display())]
    FifoTimeout { path: PathBuf, timeout: Duration },

    /// Something other than a named pipe sits at the pipe path
    #[error("Not a named pipe: {}", .0.display())]
    NotAFifo(PathBuf),

    #[error("Failed to open tag decoder pipe {}: {source}", .path.display())]
    FifoOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The decoder never opened its end of the pipe for a request or reply
    #[error("Tag decoder did not open its end of {} within {timeout:?}", .path.display())]
    FifoStalled { path: PathBuf, timeout: Duration },

    #[error("Tag decoder pipe I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Tag decoder command is empty")]
    EmptyCommand,

    #[error("Failed to launch tag decoder {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Tag decoder exited early")]
    DecoderGone,

    #[error("Tag decoder exited with {0}")]
    DecoderFailed(ExitStatus),

    #[error("Tag extraction thread panicked")]
    ThreadPanicked,
}

/// Failures reading or writing the on-disk catalog
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to encode track info: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write cover art {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A merge or persist failed and the failure policy has been applied
    #[error("Library write failed (failure policy: {policy}): {source}")]
    PersistFailed {
        policy: PersistFailurePolicy,
        #[source]
        source: Box<StoreError>,
    },

    #[error("Audiobook not found: {author} / {title}")]
    NotFound { author: String, title: String },

    #[error("Audiobook already exists: {author} / {title}")]
    AlreadyExists { author: String, title: String },

    #[error("Author and title must not be empty")]
    EmptyName,
}

impl StoreError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Failures that abort a whole scan
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Tag extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("Failed to start scan thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("Scan was cancelled")]
    Cancelled,

    #[error("Directory walker thread panicked")]
    WalkerPanicked,
}
