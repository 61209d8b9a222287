//! Log message values and their rendering to a stored line.

use serde::Serialize;
use std::fmt;

/// Tagged log wrapper rendered through its [`Display`](fmt::Display) impl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Log {
    pub message: String,
}

impl Log {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for Log {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A value that can be logged as structured data.
///
/// Implemented for every `Serialize + Debug` type; the `Debug` rendering is
/// the fallback when JSON encoding fails.
pub trait StructuredValue: Send {
    fn to_json(&self) -> serde_json::Result<String>;
    fn fallback(&self) -> String;
}

impl<T> StructuredValue for T
where
    T: Serialize + fmt::Debug + Send,
{
    fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    fn fallback(&self) -> String {
        format!("{:?}", self)
    }
}

/// A message handed to the log sink.
pub enum LogMessage {
    /// Stored verbatim.
    Text(String),
    /// Stored through the wrapper's `Display`.
    Tagged(Log),
    /// Stored as JSON, or as `Debug` output if encoding fails.
    Structured(Box<dyn StructuredValue>),
}

impl LogMessage {
    /// Wrap any serializable value.
    pub fn structured<T>(value: T) -> Self
    where
        T: Serialize + fmt::Debug + Send + 'static,
    {
        LogMessage::Structured(Box::new(value))
    }

    /// Resolve the message to the line that gets stored.
    pub fn render(&self) -> String {
        match self {
            LogMessage::Text(text) => text.clone(),
            LogMessage::Tagged(log) => log.to_string(),
            LogMessage::Structured(value) => match value.to_json() {
                Ok(json) => json,
                Err(err) => {
                    tracing::debug!("Log value is not JSON encodable: {}", err);
                    value.fallback()
                }
            },
        }
    }
}

impl fmt::Debug for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogMessage::Text(text) => f.debug_tuple("Text").field(text).finish(),
            LogMessage::Tagged(log) => f.debug_tuple("Tagged").field(log).finish(),
            LogMessage::Structured(value) => {
                f.debug_tuple("Structured").field(&value.fallback()).finish()
            }
        }
    }
}

impl From<String> for LogMessage {
    fn from(text: String) -> Self {
        LogMessage::Text(text)
    }
}

impl From<&str> for LogMessage {
    fn from(text: &str) -> Self {
        LogMessage::Text(text.to_string())
    }
}

impl From<&String> for LogMessage {
    fn from(text: &String) -> Self {
        LogMessage::Text(text.clone())
    }
}

impl From<Log> for LogMessage {
    fn from(log: Log) -> Self {
        LogMessage::Tagged(log)
    }
}

impl From<serde_json::Value> for LogMessage {
    fn from(value: serde_json::Value) -> Self {
        LogMessage::structured(value)
    }
}
