//! Incremental server-sent events decoding.
//!
//! Network reads do not respect event boundaries: one read may hold several
//! events, and one event may span several reads (even splitting a UTF-8
//! sequence). [`SseDecoder`] buffers raw bytes and only yields complete
//! events.

/// A decoded server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A `data` payload.
    Data(String),
    /// The `[DONE]` sentinel.
    Done,
    /// An event containing bytes that are not valid UTF-8, rendered lossily.
    Malformed(String),
}

/// Buffering SSE decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    data: Vec<String>,
    /// Lossy copy of the first undecodable line of the pending event.
    invalid: Option<String>,
}

impl SseDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds raw bytes and returns every event they complete.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            if let Some(event) = self.decode_line(line) {
                events.push(event);
            }
        }
        events
    }

    /// Flushes whatever is buffered once the byte stream has ended.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.buf.is_empty() {
            let rest = std::mem::take(&mut self.buf);
            if let Some(event) = self.decode_line(rest) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn decode_line(&mut self, line: Vec<u8>) -> Option<SseEvent> {
        match String::from_utf8(line) {
            Ok(line) => self.process_line(line.trim_end_matches(['\n', '\r'])),
            Err(e) => {
                let lossy = String::from_utf8_lossy(e.as_bytes());
                tracing::trace!(error = %e.utf8_error(), "undecodable SSE line");
                self.invalid
                    .get_or_insert_with(|| lossy.trim_end_matches(['\n', '\r']).to_owned());
                None
            }
        }
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        // Blank line terminates the pending event
        if line.is_empty() {
            return self.dispatch();
        }

        // Comment
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);

        if field == "data" {
            self.data.push(value.to_owned());
        } else {
            tracing::trace!(field, "ignoring SSE field");
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if let Some(line) = self.invalid.take() {
            self.data.clear();
            return Some(SseEvent::Malformed(line));
        }
        if self.data.is_empty() {
            return None;
        }
        let payload = std::mem::take(&mut self.data).join("\n");
        if payload.trim() == "[DONE]" {
            Some(SseEvent::Done)
        } else {
            Some(SseEvent::Data(payload))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: {\"a\":1}\n\n");
        assert_eq!(events, vec![SseEvent::Data("{\"a\":1}".to_owned())]);
    }

    #[test]
    fn test_multiple_events_one_read() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: one\n\ndata: two\n\ndata: [DONE]\n\n");
        assert_eq!(
            events,
            vec![
                SseEvent::Data("one".to_owned()),
                SseEvent::Data("two".to_owned()),
                SseEvent::Done,
            ]
        );
    }

    #[test]
    fn test_event_split_across_reads() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"da").is_empty());
        assert!(decoder.feed(b"ta: {\"content\":").is_empty());
        assert!(decoder.feed(b"\"Tw\"}\n").is_empty());
        let events = decoder.feed(b"\n");
        assert_eq!(events, vec![SseEvent::Data("{\"content\":\"Tw\"}".to_owned())]);
    }

    #[test]
    fn test_utf8_split_across_reads() {
        let text = "data: héllo\n\n".as_bytes();
        // Split inside the two-byte 'é'
        let (head, tail) = text.split_at(8);
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(head).is_empty());
        assert_eq!(decoder.feed(tail), vec![SseEvent::Data("héllo".to_owned())]);
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: {\"content\":\"a\xFFb\"}\n\ndata: next\n\n");
        assert_eq!(
            events,
            vec![
                SseEvent::Malformed("data: {\"content\":\"a\u{FFFD}b\"}".to_owned()),
                SseEvent::Data("next".to_owned()),
            ]
        );
    }

    #[test]
    fn test_invalid_utf8_in_unterminated_tail() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: \xC3").is_empty());
        assert!(matches!(decoder.finish(), Some(SseEvent::Malformed(_))));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_crlf_and_comments() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b": keep-alive\r\n\r\ndata: x\r\n\r\n");
        assert_eq!(events, vec![SseEvent::Data("x".to_owned())]);
    }

    #[test]
    fn test_multiline_data_joined() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: a\ndata: b\n\n");
        assert_eq!(events, vec![SseEvent::Data("a\nb".to_owned())]);
    }

    #[test]
    fn test_other_fields_ignored() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"event: message\nid: 7\ndata:x\n\n");
        assert_eq!(events, vec![SseEvent::Data("x".to_owned())]);
    }

    #[test]
    fn test_finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: tail").is_empty());
        assert_eq!(decoder.finish(), Some(SseEvent::Data("tail".to_owned())));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_finish_on_empty_decoder() {
        assert_eq!(SseDecoder::new().finish(), None);
    }
}
