//! # Fezz Context - per-invocation execution context for Fezz functions
//!
//! Every invocation of a Fezz function receives a [`Context`] giving it:
//!
//! - a normalized view of the inbound request ([`ContextRequest`]),
//! - a builder for the outbound response ([`ContextResponse`] producing a
//!   frozen [`ResponseOutput`]),
//! - a structured logging channel ([`Context::log`], [`Context::error`]) backed
//!   by a per-invocation [`LogSink`].
//!
//! Anything the function writes straight to stdout or stderr can be absorbed
//! into the same sink through a [`StreamCapture`] session.
//!
//! ## Invocation flow
//!
//! ```text
//!   Invoker::invoke
//!        │
//!        ├─ LogSink::open          ({id}_logs.log, {id}_errors.log)
//!        ├─ StreamCapture::activate   fd 1/2 ──▶ pipes ──▶ drain threads
//!        ├─ ContextFunction::handle(&mut Context)
//!        ├─ StreamCapture::deactivate fd 1/2 restored, buffers ──▶ LogSink
//!        └─ LogSink::close
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fezz_context::prelude::*;
//! use std::sync::Arc;
//!
//! struct Hello;
//!
//! #[async_trait]
//! impl ContextFunction for Hello {
//!     async fn handle(&self, ctx: &mut Context) -> Result<ResponseOutput, FunctionError> {
//!         ctx.log("handling hello");
//!         println!("native output is captured too");
//!         Ok(ctx.res.json(&serde_json::json!({"message": "Hello!"}), ResponseOptions::new()))
//!     }
//!
//!     fn name(&self) -> &str {
//!         "hello"
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let invoker = Invoker::new(ContextConfig::new(), Arc::new(MemoryLogStore::new()));
//!     let outcome = invoker
//!         .invoke(&Hello, ContextRequest::new("GET", "/hello"), None)
//!         .await?;
//!     assert_eq!(outcome.response.status_code, 200);
//!     Ok(())
//! }
//! ```
//!
//! Stream capture swaps process-wide descriptors and is Unix-only. Only one
//! capture session can be active at a time.

pub mod capture;
pub mod config;
pub mod context;
pub mod error;
pub mod function;
pub mod http;
pub mod logging;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::capture::StreamCapture;
    pub use crate::config::ContextConfig;
    pub use crate::context::Context;
    pub use crate::error::ContextError;
    pub use crate::function::{ContextFunction, FunctionError, InvocationOutcome, Invoker};
    pub use crate::http::{
        ContextRequest, ContextResponse, RequestBody, ResponseOptions, ResponseOutput,
    };
    pub use crate::logging::{
        FileLogStore, Log, LogKind, LogMessage, LogSink, LogStore, MemoryLogStore,
    };
    pub use async_trait::async_trait;
    pub use fezz_context_macro::context_function;
}

// Re-export for convenience
pub use capture::StreamCapture;
pub use config::ContextConfig;
pub use context::Context;
pub use error::ContextError;
pub use function::{ContextFunction, FunctionError, InvocationOutcome, Invoker};
pub use http::{ContextRequest, ContextResponse, ResponseOptions, ResponseOutput};
pub use logging::{Log, LogKind, LogMessage, LogSink};
