//! Chat composition and display.
//!
//! Outbound: [`ChatComposer`] turns what the user typed into a
//! [`ChatPayload`]. Inbound (and the local echo of what we sent): a
//! [`ChatSink`] renders `sender: message (timestamp)`.

use chrono::{DateTime, Local, SecondsFormat, Utc};
use palaver_protocol::ChatPayload;
use tokio::sync::mpsc;

/// Errors from composing a chat line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// Nothing left after trimming whitespace.
    #[error("chat message is empty")]
    EmptyMessage,
}

// ---------------------------------------------------------------------------
// ChatComposer
// ---------------------------------------------------------------------------

/// Builds outbound chat payloads for a fixed sender name.
#[derive(Debug, Clone)]
pub struct ChatComposer {
    sender: String,
}

impl ChatComposer {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Trims `text` and stamps it with the current UTC time.
    ///
    /// # Errors
    /// Returns [`ChatError::EmptyMessage`] if `text` is empty or only
    /// whitespace.
    pub fn compose(&self, text: &str) -> Result<ChatPayload, ChatError> {
        self.compose_at(text, Utc::now())
    }

    /// Like [`compose`](Self::compose), with an explicit timestamp.
    pub fn compose_at(
        &self,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<ChatPayload, ChatError> {
        let message = text.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        Ok(ChatPayload {
            sender: self.sender.clone(),
            message: message.to_string(),
            timestamp: iso_timestamp(at),
        })
    }
}

/// ISO-8601 in UTC with millisecond precision: `2024-05-01T12:00:00.000Z`.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The local wall-clock time of day, as shown next to our own lines.
pub fn local_time() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Renders one chat line: `sender: message (timestamp)`.
pub fn format_line(sender: &str, message: &str, timestamp: &str) -> String {
    format!("{sender}: {message} ({timestamp})")
}

// ---------------------------------------------------------------------------
// ChatSink
// ---------------------------------------------------------------------------

/// Where chat lines end up: a terminal, a UI, a test channel.
///
/// Called from the client's event loop, so implementations should not
/// block.
pub trait ChatSink: Send + 'static {
    fn display(&self, sender: &str, message: &str, timestamp: &str);
}

/// One line handed to a [`ChannelSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLine {
    pub sender: String,
    pub message: String,
    pub timestamp: String,
}

impl DisplayLine {
    pub fn render(&self) -> String {
        format_line(&self.sender, &self.message, &self.timestamp)
    }
}

/// A sink that forwards every line over an mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<DisplayLine>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DisplayLine>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ChatSink for ChannelSink {
    fn display(&self, sender: &str, message: &str, timestamp: &str) {
        let _ = self.tx.send(DisplayLine {
            sender: sender.to_string(),
            message: message.to_string(),
            timestamp: timestamp.to_string(),
        });
    }
}

/// A sink that prints each line to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl ChatSink for StdoutSink {
    fn display(&self, sender: &str, message: &str, timestamp: &str) {
        println!("{}", format_line(sender, message, timestamp));
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 34, 56).unwrap()
            + chrono::Duration::milliseconds(789)
    }

    #[test]
    fn test_compose_trims_and_stamps() {
        let composer = ChatComposer::new("Your_Sender_Name");
        let payload = composer.compose_at("  hi  ", fixed_time()).unwrap();
        assert_eq!(payload.sender, "Your_Sender_Name");
        assert_eq!(payload.message, "hi");
        assert_eq!(payload.timestamp, "2024-05-01T12:34:56.789Z");
    }

    #[test]
    fn test_compose_whitespace_only_is_empty_message() {
        let composer = ChatComposer::new("me");
        assert_eq!(composer.compose(""), Err(ChatError::EmptyMessage));
        assert_eq!(composer.compose(" \t\n "), Err(ChatError::EmptyMessage));
    }

    #[test]
    fn test_compose_keeps_inner_whitespace() {
        let composer = ChatComposer::new("me");
        let payload = composer.compose("  a   b ").unwrap();
        assert_eq!(payload.message, "a   b");
    }

    #[test]
    fn test_compose_timestamp_parses_as_rfc3339() {
        let payload = ChatComposer::new("me").compose("x").unwrap();
        assert!(payload.timestamp.ends_with('Z'));
        assert!(DateTime::parse_from_rfc3339(&payload.timestamp).is_ok());
    }

    #[test]
    fn test_format_line() {
        assert_eq!(format_line("You", "hi", "12:34:56"), "You: hi (12:34:56)");
    }

    #[test]
    fn test_local_time_is_hh_mm_ss() {
        let time = local_time();
        assert_eq!(time.len(), 8);
        assert_eq!(time.as_bytes()[2], b':');
        assert_eq!(time.as_bytes()[5], b':');
    }

    #[test]
    fn test_channel_sink_forwards_lines() {
        let (sink, mut rx) = ChannelSink::new();
        sink.display("bob", "yo", "t");
        let line = rx.try_recv().unwrap();
        assert_eq!(line.render(), "bob: yo (t)");
    }
}
