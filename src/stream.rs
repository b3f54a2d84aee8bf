//! Update stream client.
//!
//! The server pushes workspace updates as server-sent events. This module
//! decodes the `text/event-stream` framing and turns each event into a
//! [`StreamEvent`] on the workspace queue. How the bytes arrive (HTTP, a
//! recorded file, a test string) is up to the caller; anything readable
//! line by line will do.
//!
//! Applying a payload never touches existing state when it fails: the
//! workspace only gains an inline notice.

use crate::workspace::Event;
use crossbeam_channel::Sender;
use std::io::BufRead;

/// What the transport delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// One complete event payload
    Message(String),
    /// The transport failed; no retry follows
    Failed(String),
    /// The server ended the stream
    Closed,
}

impl StreamEvent {
    /// Check if no further events will follow.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Failed(_) | StreamEvent::Closed)
    }
}

/// How a payload should be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// Ready-to-display markup fragment
    Markup,
    /// Filename-keyed JSON document store
    Store,
    /// Neither
    Unknown,
}

impl PayloadKind {
    /// Classify a payload by its first non-blank character.
    pub fn of(payload: &str) -> Self {
        match payload.trim_start().chars().next() {
            Some('<') => PayloadKind::Markup,
            Some('{') => PayloadKind::Store,
            _ => PayloadKind::Unknown,
        }
    }
}

/// Incremental decoder for the `text/event-stream` format.
#[derive(Debug, Clone, Default)]
pub struct SseDecoder {
    data: Vec<String>,
}

impl SseDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (without its terminator). Returns a payload when the
    /// line completes an event.
    pub fn feed_line(&mut self, line: &str) -> Option<String> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            if self.data.is_empty() {
                return None;
            }
            let payload = self.data.join("\n");
            self.data.clear();
            return Some(payload);
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data.push(value.to_string());
        }
        None
    }

    /// Check if a partial event is buffered.
    pub fn has_pending(&self) -> bool {
        !self.data.is_empty()
    }
}

/// Reads an event stream to its end and forwards every event to the
/// workspace queue.
#[derive(Debug, Default)]
pub struct StreamClient {
    decoder: SseDecoder,
    delivered: usize,
}

impl StreamClient {
    /// Create a client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages delivered so far.
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    /// Consume `reader` until EOF or an I/O error.
    ///
    /// Posts a `Message` per event, then `Closed` at EOF or `Failed` on a
    /// read error. Stops early if the workspace is gone.
    pub fn pump<R: BufRead>(&mut self, reader: R, sender: &Sender<Event>) {
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    log::warn!("update stream failed: {}", e);
                    let _ = sender.send(Event::Stream(StreamEvent::Failed(e.to_string())));
                    return;
                }
            };
            if let Some(payload) = self.decoder.feed_line(&line) {
                self.delivered += 1;
                if sender.send(Event::Stream(StreamEvent::Message(payload))).is_err() {
                    log::debug!("workspace gone, stopping update stream");
                    return;
                }
            }
        }
        if self.decoder.has_pending() {
            log::debug!("update stream ended inside an event; dropping it");
        }
        let _ = sender.send(Event::Stream(StreamEvent::Closed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Read};

    #[test]
    fn test_decoder_joins_data_lines() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.feed_line(": keep-alive"), None);
        assert_eq!(decoder.feed_line("event: update"), None);
        assert_eq!(decoder.feed_line("data: <column"), None);
        assert_eq!(decoder.feed_line("data:id=\"a\"/>\r"), None);
        assert_eq!(
            decoder.feed_line(""),
            Some("<column\nid=\"a\"/>".to_string())
        );
        assert_eq!(decoder.feed_line(""), None);
    }

    #[test]
    fn test_payload_kind() {
        assert_eq!(PayloadKind::of("  <column/>"), PayloadKind::Markup);
        assert_eq!(PayloadKind::of("{\"a\": {}}"), PayloadKind::Store);
        assert_eq!(PayloadKind::of("hello"), PayloadKind::Unknown);
        assert_eq!(PayloadKind::of(""), PayloadKind::Unknown);
    }

    #[test]
    fn test_pump_delivers_then_closes() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let input = "data: one\n\ndata: two\n\ndata: partial\n";
        let mut client = StreamClient::new();
        client.pump(input.as_bytes(), &tx);

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(client.delivered(), 2);
        assert!(matches!(&events[0], Event::Stream(StreamEvent::Message(m)) if m == "one"));
        assert!(matches!(&events[1], Event::Stream(StreamEvent::Message(m)) if m == "two"));
        assert!(matches!(events[2], Event::Stream(StreamEvent::Closed)));
        assert_eq!(events.len(), 3);
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer"))
        }
    }

    #[test]
    fn test_pump_reports_failure() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut client = StreamClient::new();
        client.pump(io::BufReader::new(Broken), &tx);
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Event::Stream(StreamEvent::Failed(m)) if m.contains("reset")));
    }
}
