//! Structured logging for function invocations.
//!
//! Every invocation owns a [`LogSink`] with two append-only streams, one for
//! log lines and one for error lines. Destinations are provided by a
//! [`LogStore`]: files under the log directory in production, memory in tests.

mod id;
mod message;
mod sink;
mod store;

pub use id::generate_invocation_id;
pub use message::{Log, LogMessage, StructuredValue};
pub use sink::{LogSink, NATIVE_LOGS_NOTICE};
pub use store::{FileLogStore, LogDestination, LogKind, LogStore, MemoryLogStore};
