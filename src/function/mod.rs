//! Function trait and the dispatcher that runs one invocation.

pub mod handler;
pub mod invoker;

pub use handler::{ContextFunction, FunctionError};
pub use invoker::{InvocationOutcome, Invoker};
