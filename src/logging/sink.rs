//! Per-invocation log sink.

use crate::config::{DEV_INVOCATION_ID, LOGGING_ENABLED};
use crate::error::ContextError;
use crate::logging::id::generate_invocation_id;
use crate::logging::message::LogMessage;
use crate::logging::store::{LogDestination, LogKind, LogStore};
use std::io::Write;
use tracing::{debug, warn};

/// Line emitted once per sink the first time native output is flushed into it.
pub const NATIVE_LOGS_NOTICE: &str =
    "Native logs detected. Use context.log() or context.error() for better experience.";

const ID_PADDING: usize = 7;

/// Append-only destination for the log and error lines of one invocation.
///
/// Once closed, further writes are silently dropped.
pub struct LogSink {
    enabled: bool,
    id: String,
    includes_native_info: bool,
    logs: Option<LogDestination>,
    errors: Option<LogDestination>,
}

impl LogSink {
    /// Open a sink.
    ///
    /// `status` absent or `"enabled"` turns the sink on; any other value yields a
    /// disabled sink with an empty id. Without an explicit `id`, one is generated,
    /// or [`DEV_INVOCATION_ID`] is used when `development` is set.
    pub fn open(
        store: &dyn LogStore,
        status: Option<&str>,
        id: Option<&str>,
        development: bool,
    ) -> Result<Self, ContextError> {
        let enabled = matches!(status, None | Some("") | Some(LOGGING_ENABLED));
        if !enabled {
            debug!("Logging disabled with status {:?}", status);
            return Ok(Self::disabled());
        }

        let id = match id.filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None if development => DEV_INVOCATION_ID.to_string(),
            None => generate_invocation_id(ID_PADDING),
        };

        let logs = open_destination(store, &id, LogKind::Log)?;
        let errors = open_destination(store, &id, LogKind::Error)?;
        debug!("Opened log sink for invocation {}", id);

        Ok(Self {
            enabled: true,
            id,
            includes_native_info: false,
            logs: Some(logs),
            errors: Some(errors),
        })
    }

    /// A sink that accepts nothing.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            id: String::new(),
            includes_native_info: false,
            logs: None,
            errors: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Invocation id; empty for a sink that was opened disabled.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether native output has been written through this sink.
    pub fn includes_native_info(&self) -> bool {
        self.includes_native_info
    }

    /// Append one line to the stream selected by `kind`.
    ///
    /// `native` marks output captured from the process streams; the first such
    /// write is preceded by [`NATIVE_LOGS_NOTICE`].
    pub fn write(&mut self, message: impl Into<LogMessage>, kind: LogKind, native: bool) {
        if !self.enabled {
            return;
        }

        if native && !self.includes_native_info {
            self.includes_native_info = true;
            self.write(NATIVE_LOGS_NOTICE, kind, native);
        }

        let mut line = message.into().render();
        strip_trailing_newline(&mut line);
        line.push('\n');

        let destination = match kind {
            LogKind::Log => self.logs.as_mut(),
            LogKind::Error => self.errors.as_mut(),
        };
        if let Some(destination) = destination {
            if let Err(e) = destination.write_all(line.as_bytes()) {
                warn!(
                    "Failed to write {} line for invocation {}: {}",
                    kind.suffix(),
                    self.id,
                    e
                );
            }
        }
    }

    /// Close both destinations. Calling this again is a no-op.
    pub fn close(&mut self) {
        if !self.enabled {
            return;
        }
        self.enabled = false;

        for mut destination in [self.logs.take(), self.errors.take()].into_iter().flatten() {
            if let Err(e) = destination.flush() {
                warn!("Failed to flush log destination for {}: {}", self.id, e);
            }
        }
        debug!("Closed log sink for invocation {}", self.id);
    }
}

impl Drop for LogSink {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSink")
            .field("enabled", &self.enabled)
            .field("id", &self.id)
            .field("includes_native_info", &self.includes_native_info)
            .finish_non_exhaustive()
    }
}

fn open_destination(
    store: &dyn LogStore,
    id: &str,
    kind: LogKind,
) -> Result<LogDestination, ContextError> {
    store.open(id, kind).map_err(|source| ContextError::SinkPreparation {
        path: store.locate(id, kind),
        source,
    })
}

fn strip_trailing_newline(line: &mut String) {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
}
