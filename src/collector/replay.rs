//! JSONL event source.
//!
//! Stands in for the host event-dispatch mechanism: reads one event per line
//! from a file or stdin on a background thread and delivers them over a
//! channel, strictly in arrival order. Lines look like:
//!
//! ```text
//! {"key": "KeyA", "timestamp_ms": 12.5}
//! ```
//!
//! Malformed lines are delivered as `InvalidEventError` so the capture loop
//! can count and report them without the window ever seeing them.

use crate::collector::types::{InvalidEventError, KeyEvent};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::io::BufRead;

/// Parse a single JSONL line into a validated key event.
pub fn parse_event_line(line: &str) -> Result<KeyEvent, InvalidEventError> {
    let event: KeyEvent = serde_json::from_str(line)
        .map_err(|e| InvalidEventError::Malformed(e.to_string()))?;
    event.validate()
}

/// A channel-backed event source reading JSONL from any `BufRead`.
pub struct ReplaySource {
    receiver: Receiver<Result<KeyEvent, InvalidEventError>>,
}

impl ReplaySource {
    /// Spawn a reader thread over the given input.
    ///
    /// The thread is detached; it exits when the input is exhausted or when
    /// every receiver has been dropped. The channel disconnects once the
    /// reader finishes.
    pub fn spawn<R: BufRead + Send + 'static>(reader: R) -> Self {
        let (sender, receiver) = bounded(10_000);
        std::thread::spawn(move || read_loop(reader, sender));
        Self { receiver }
    }

    /// Get the receiver for replayed events.
    pub fn receiver(&self) -> &Receiver<Result<KeyEvent, InvalidEventError>> {
        &self.receiver
    }
}

fn read_loop<R: BufRead>(reader: R, sender: Sender<Result<KeyEvent, InvalidEventError>>) {
    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            // Treat a read error as end of input.
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }
        if sender.send(parse_event_line(&line)).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_valid_line() {
        let event = parse_event_line(r#"{"key": "KeyA", "timestamp_ms": 12.5}"#).unwrap();
        assert_eq!(event.key.as_str(), "KeyA");
        assert_eq!(event.timestamp_ms, 12.5);
    }

    #[test]
    fn test_parse_malformed_line() {
        assert!(matches!(
            parse_event_line("not json"),
            Err(InvalidEventError::Malformed(_))
        ));
        assert!(matches!(
            parse_event_line(r#"{"key": "KeyA"}"#),
            Err(InvalidEventError::Malformed(_))
        ));
    }

    #[test]
    fn test_replay_source_order_and_errors() {
        let input = "\
{\"key\": \"KeyA\", \"timestamp_ms\": 0.0}\n\
garbage\n\
\n\
{\"key\": \"KeyB\", \"timestamp_ms\": 100.0}\n";
        let source = ReplaySource::spawn(Cursor::new(input.to_string()));

        let first = source.receiver().recv().unwrap().unwrap();
        assert_eq!(first.key.as_str(), "KeyA");

        assert!(source.receiver().recv().unwrap().is_err());

        let third = source.receiver().recv().unwrap().unwrap();
        assert_eq!(third.key.as_str(), "KeyB");

        // Input exhausted: channel disconnects.
        assert!(source.receiver().recv().is_err());
    }
}
