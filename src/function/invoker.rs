//! Invocation dispatcher.

use crate::capture::StreamCapture;
use crate::config::ContextConfig;
use crate::context::Context;
use crate::error::ContextError;
use crate::function::handler::ContextFunction;
use crate::http::{ContextRequest, ResponseOutput};
use crate::logging::{FileLogStore, LogSink, LogStore};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of a completed invocation.
#[derive(Debug, Clone)]
pub struct InvocationOutcome {
    /// Id the invocation's logs were written under. Empty when logging is disabled.
    pub invocation_id: String,
    /// Response produced by the function, or derived from its error.
    pub response: ResponseOutput,
}

/// Runs functions with a fresh [`Context`] per invocation.
///
/// Each invocation gets its own log sink. When native capture is enabled,
/// stdout and stderr are redirected for the duration of the function call
/// and flushed into the sink before it is closed.
pub struct Invoker {
    config: ContextConfig,
    store: Arc<dyn LogStore>,
}

impl Invoker {
    pub fn new(config: ContextConfig, store: Arc<dyn LogStore>) -> Self {
        Self { config, store }
    }

    /// Invoker writing log files under `config.log_dir`.
    pub fn with_file_store(config: ContextConfig) -> Self {
        let store = Arc::new(FileLogStore::new(config.log_dir.clone()));
        Self::new(config, store)
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Run `function` once.
    ///
    /// Fails only when the log sink cannot be prepared. Function errors are
    /// recorded on the error stream and turned into a response.
    pub async fn invoke(
        &self,
        function: &dyn ContextFunction,
        request: ContextRequest,
        invocation_id: Option<&str>,
    ) -> Result<InvocationOutcome, ContextError> {
        let sink = LogSink::open(
            self.store.as_ref(),
            Some(self.config.logging.as_str()),
            invocation_id,
            self.config.is_development(),
        )?;
        let invocation_id = sink.id().to_string();
        let mut ctx = Context::new(sink, request);

        debug!(
            "Invoking function '{}' [{}] {} {}",
            function.name(),
            invocation_id,
            ctx.req.method,
            ctx.req.path
        );

        let capture = if self.config.capture_native && ctx.sink_mut().is_enabled() {
            match StreamCapture::activate() {
                Ok(capture) => Some(capture),
                Err(e) => {
                    warn!("Native log capture unavailable [{}]: {}", invocation_id, e);
                    ctx.error(format!("Native log capture unavailable: {}", e));
                    None
                }
            }
        } else {
            None
        };

        let result = function.handle(&mut ctx).await;

        if let Some(capture) = capture {
            capture.deactivate(ctx.sink_mut()).await;
        }

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                error!(
                    "Function '{}' error: {} [{}]",
                    function.name(),
                    e,
                    invocation_id
                );
                ctx.error(e.to_string());
                e.into()
            }
        };

        ctx.into_sink().close();
        info!(
            "Function '{}' completed with {} [{}]",
            function.name(),
            response.status_code,
            invocation_id
        );

        Ok(InvocationOutcome {
            invocation_id,
            response,
        })
    }
}
