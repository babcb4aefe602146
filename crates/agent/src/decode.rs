//! Pure JSON-lines decoding.
//!
//! [`LineDecoder`] owns the remainder buffer between chunks; `push`
//! returns every event completed by the new chunk and `finish` flushes
//! whatever is left once the source reaches EOF. Parsing one line never
//! affects its neighbours.

use valet_domain::event::CliEvent;

#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of raw output; returns all events whose lines were
    /// completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<CliEvent> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            // Lossy decoding: a malformed UTF-8 line degrades to Raw just
            // like a malformed JSON line.
            let text = String::from_utf8_lossy(&line[..line.len() - 1]);
            if let Some(event) = CliEvent::parse_line(&text) {
                events.push(event);
            }
        }
        events
    }

    /// Flush the remainder as final (unterminated) lines.
    pub fn finish(&mut self) -> Vec<CliEvent> {
        if self.buf.is_empty() {
            return Vec::new();
        }
        let rest = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        rest.lines().filter_map(CliEvent::parse_line).collect()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_split_across_chunks_is_reassembled() {
        let mut dec = LineDecoder::new();
        assert!(dec.push(br#"{"type":"res"#).is_empty());
        let events = dec.push(b"ult\"}\n");
        assert_eq!(events, vec![CliEvent::Result]);
    }

    #[test]
    fn multiple_lines_in_one_chunk() {
        let mut dec = LineDecoder::new();
        let events = dec.push(
            b"{\"type\":\"assistant\",\"message\":{\"content\":[]}}\nnot json\n{\"type\":\"result\"}\n",
        );
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], CliEvent::Assistant(_)));
        assert_eq!(
            events[1],
            CliEvent::Raw {
                text: "not json".into()
            }
        );
        assert_eq!(events[2], CliEvent::Result);
    }

    #[test]
    fn carriage_returns_from_a_pty_are_tolerated() {
        let mut dec = LineDecoder::new();
        let events = dec.push(b"{\"type\":\"result\"}\r\n");
        assert_eq!(events, vec![CliEvent::Result]);
    }

    #[test]
    fn blank_lines_produce_no_events() {
        let mut dec = LineDecoder::new();
        assert!(dec.push(b"\n\n  \n").is_empty());
    }

    #[test]
    fn finish_flushes_unterminated_line() {
        let mut dec = LineDecoder::new();
        assert!(dec.push(br#"{"type":"result"}"#).is_empty());
        assert_eq!(dec.finish(), vec![CliEvent::Result]);
        // Buffer is consumed.
        assert!(dec.finish().is_empty());
    }

    #[test]
    fn bad_line_does_not_poison_following_lines() {
        let mut dec = LineDecoder::new();
        let events = dec.push(b"{\"type\": truncated\n{\"type\":\"result\"}\n");
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], CliEvent::Raw { .. }));
        assert_eq!(events[1], CliEvent::Result);
    }
}
