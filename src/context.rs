//! Per-invocation context handed to functions.

use crate::http::{ContextRequest, ContextResponse};
use crate::logging::{LogKind, LogMessage, LogSink};

/// Execution context for one invocation.
///
/// Combines the request view, the response builder and the invocation's log
/// sink. Logging never fails from the caller's point of view: values that
/// cannot be encoded are logged in a degraded form.
#[derive(Debug)]
pub struct Context {
    /// Inbound request.
    pub req: ContextRequest,
    /// Response builder.
    pub res: ContextResponse,
    sink: LogSink,
}

impl Context {
    pub fn new(sink: LogSink, req: ContextRequest) -> Self {
        Self {
            req,
            res: ContextResponse::new(),
            sink,
        }
    }

    /// Write a line to the invocation's log stream.
    pub fn log(&mut self, message: impl Into<LogMessage>) {
        self.sink.write(message, LogKind::Log, false);
    }

    /// Write a line to the invocation's error stream.
    pub fn error(&mut self, message: impl Into<LogMessage>) {
        self.sink.write(message, LogKind::Error, false);
    }

    pub fn invocation_id(&self) -> &str {
        self.sink.id()
    }

    pub fn sink_mut(&mut self) -> &mut LogSink {
        &mut self.sink
    }

    pub fn into_sink(self) -> LogSink {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{Log, MemoryLogStore};

    #[derive(Debug, serde::Serialize)]
    struct Order {
        id: u32,
    }

    #[test]
    fn test_log_and_error_streams() {
        let store = MemoryLogStore::new();
        let sink = LogSink::open(&store, None, Some("ctx-1"), false).unwrap();
        let mut ctx = Context::new(sink, ContextRequest::new("GET", "/"));

        ctx.log("started");
        ctx.log(Log::new("wrapped"));
        ctx.log(LogMessage::structured(Order { id: 4 }));
        ctx.error(serde_json::json!({"reason": "timeout"}));

        assert_eq!(ctx.invocation_id(), "ctx-1");
        assert_eq!(
            store.lines("ctx-1", LogKind::Log),
            vec!["started", "wrapped", r#"{"id":4}"#]
        );
        assert_eq!(
            store.lines("ctx-1", LogKind::Error),
            vec![r#"{"reason":"timeout"}"#]
        );
    }

    #[test]
    fn test_logging_after_close_is_ignored() {
        let store = MemoryLogStore::new();
        let sink = LogSink::open(&store, None, Some("ctx-2"), false).unwrap();
        let mut ctx = Context::new(sink, ContextRequest::default());

        ctx.sink_mut().close();
        ctx.log("late");

        assert!(store.lines("ctx-2", LogKind::Log).is_empty());
    }

    #[test]
    fn test_response_builder_available() {
        let ctx = Context::new(LogSink::disabled(), ContextRequest::default());
        let response = ctx.res.empty();
        assert_eq!(response.status_code, 204);
    }
}
