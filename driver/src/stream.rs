//! Incremental decoding of a `text/event-stream` body.

#[derive(Debug, Default)]
pub struct EventStreamDecoder {
    pending: Vec<u8>,
    data: Vec<String>,
}

impl EventStreamDecoder {
    pub fn new() -> EventStreamDecoder {
        EventStreamDecoder::default()
    }

    /// Consumes the next chunk of the body and returns the data of every event
    /// completed by it. Chunks may split lines anywhere.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(|c| c == '\n' || c == '\r');

            if line.is_empty() {
                if !self.data.is_empty() {
                    events.push(self.data.join("\n"));
                    self.data.clear();
                }
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data.push(value.strip_prefix(' ').unwrap_or(value).to_owned());
            }
            // Comments and other fields carry nothing the client uses.
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_end_at_blank_lines() {
        let mut decoder = EventStreamDecoder::new();

        let events = decoder.feed(b"data: Waiting;dark\n\ndata: Waiting;light\n\n");

        assert_eq!(events, vec!["Waiting;dark".to_owned(), "Waiting;light".to_owned()]);
    }

    #[test]
    fn lines_split_across_chunks() {
        let mut decoder = EventStreamDecoder::new();

        assert!(decoder.feed(b"data: Wait").is_empty());
        assert!(decoder.feed(b"ing;li").is_empty());
        assert!(decoder.feed(b"ght\r\n").is_empty());
        assert_eq!(decoder.feed(b"\r\n"), vec!["Waiting;light".to_owned()]);
    }

    #[test]
    fn comments_and_multiline_data() {
        let mut decoder = EventStreamDecoder::new();

        let events = decoder.feed(b": keepalive\nevent: move\ndata:a\ndata: b\n\n\n");

        assert_eq!(events, vec!["a\nb".to_owned()]);
    }
}
