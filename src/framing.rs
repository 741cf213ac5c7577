//! Line framing for the inbound byte stream.
//!
//! GSM modems answer with CRLF-delimited ASCII lines, interleaving command
//! responses with unsolicited notifications. [`LineBuffer`] accumulates raw
//! chunks from the transport and yields complete, trimmed lines; blank lines
//! never reach the listeners above.

use tracing::warn;

/// Pending bytes are capped so a modem that never sends a newline cannot
/// grow the buffer without bound. Real AT responses are well under this.
const MAX_PENDING: usize = 4096;

/// Accumulates transport chunks and splits them into trimmed text lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    /// Create an empty line buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of raw bytes, returning every complete line it finishes.
    ///
    /// Lines are split on `\n`, trimmed of surrounding whitespace (which
    /// swallows the `\r` of CRLF), and dropped entirely when blank. Bytes
    /// after the last delimiter stay buffered for the next chunk.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = memchr::memchr(b'\n', &self.buf) {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&raw);
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed.to_string());
            }
        }

        if self.buf.len() > MAX_PENDING {
            warn!(
                pending = self.buf.len(),
                "discarding oversized unterminated line from modem"
            );
            self.buf.clear();
        }

        lines
    }

    /// Number of buffered bytes still waiting for a delimiter.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_crlf_line() {
        let mut lb = LineBuffer::new();
        assert_eq!(lb.push_bytes(b"OK\r\n"), vec!["OK".to_string()]);
        assert_eq!(lb.pending_len(), 0);
    }

    #[test]
    fn test_line_split_across_chunks() {
        let mut lb = LineBuffer::new();
        assert!(lb.push_bytes(b"+CMGS").is_empty());
        assert_eq!(lb.pending_len(), 5);
        assert_eq!(lb.push_bytes(b": 12\r\n"), vec!["+CMGS: 12".to_string()]);
    }

    #[test]
    fn test_multiple_lines_in_one_chunk() {
        let mut lb = LineBuffer::new();
        assert_eq!(
            lb.push_bytes(b"AT\r\nOK\r\nRING\r\n"),
            vec!["AT".to_string(), "OK".to_string(), "RING".to_string()]
        );
    }

    #[test]
    fn test_blank_lines_filtered() {
        let mut lb = LineBuffer::new();
        assert_eq!(lb.push_bytes(b"\r\n\r\nOK\r\n\r\n"), vec!["OK".to_string()]);
    }

    #[test]
    fn test_bare_lf_accepted() {
        let mut lb = LineBuffer::new();
        assert_eq!(lb.push_bytes(b"OK\n"), vec!["OK".to_string()]);
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        let mut lb = LineBuffer::new();
        assert_eq!(lb.push_bytes(b"  OK \r\n"), vec!["OK".to_string()]);
    }

    #[test]
    fn test_oversized_garbage_discarded() {
        let mut lb = LineBuffer::new();
        let garbage = vec![b'x'; MAX_PENDING + 1];
        assert!(lb.push_bytes(&garbage).is_empty());
        assert_eq!(lb.pending_len(), 0);

        // Framing recovers on the next proper line.
        assert_eq!(lb.push_bytes(b"OK\r\n"), vec!["OK".to_string()]);
    }
}
