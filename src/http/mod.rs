//! Request and response types exposed to functions.

mod request;
mod response;

pub use request::{ContextRequest, RequestBody};
pub use response::{ContextResponse, ResponseOptions, ResponseOutput, JSON_ENCODING_ERROR};
