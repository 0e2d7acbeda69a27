use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current UTC time in RFC 9557 form with millisecond precision.
pub fn current_datetime_rfc9557() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// # Logrecord
///
/// A single structured log entry as emitted by `LoggerLocal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Logrecord {
    /// The severity level of the log (0 Silly through 6 Fatal).
    pub loglevel: i64,
    /// Details about the message content.
    pub message: Message,
    /// Information about the application generating the log.
    pub app: App,
    /// Flexible JSON value for arbitrary tags or additional metadata.
    pub tags: Value,
    /// RFC 9557 formatted timestamp string.
    pub rfc9557: String,
}

impl Default for Logrecord {
    /// Creates an empty record stamped with the current time.
    fn default() -> Self {
        Self {
            loglevel: 0,
            message: Message::default(),
            app: App::default(),
            tags: serde_json::json!([]),
            rfc9557: current_datetime_rfc9557(),
        }
    }
}

impl Logrecord {
    /// True when the record carries extras worth printing.
    pub fn has_tags(&self) -> bool {
        !(self.tags.is_null() || self.tags == serde_json::json!([]))
    }
}

/// # Message
///
/// Represents the textual content of a log entry, including its language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The language of the message (e.g., "en" for English).
    pub lang: String,
    /// The actual text content of the message.
    pub text: String,
}

impl Default for Message {
    fn default() -> Self {
        Self {
            text: String::new(),
            lang: "en".to_string(),
        }
    }
}

/// # App
///
/// Contains information about the application that generated the log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct App {
    /// The process ID (PID) of the application.
    pub pid: i64,
    /// The name of the application.
    pub name: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            pid: std::process::id() as i64,
            name: String::new(),
        }
    }
}
