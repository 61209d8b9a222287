//! Error types for context setup and native stream capture.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced while preparing or tearing down an invocation context.
///
/// Message and response encoding failures never show up here: they degrade
/// to a fallback rendering where they happen.
#[derive(Debug, Error)]
pub enum ContextError {
    /// A log destination could not be opened.
    #[error("could not prepare log destination {path}: {source}")]
    SinkPreparation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Pipes, workers or descriptor swaps for native capture failed.
    #[error("could not prepare log capturing: {0}")]
    CaptureUnavailable(#[source] io::Error),

    /// Another capture session already owns the process streams.
    #[error("native stream capture is already active")]
    CaptureActive,

    /// The request body is not valid JSON for the requested type.
    #[error("could not parse body into a JSON: {0}")]
    InvalidJsonBody(#[source] serde_json::Error),
}
