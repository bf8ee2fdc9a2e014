//! Line framing for the byte-stream wire protocol
//!
//! Input arrives as an unbounded stream of bytes. Nothing is acted upon
//! until a LF terminator shows up; everything before it is one line, and
//! the remainder stays buffered for the next read.

/// Accumulates raw bytes and yields complete LF-terminated lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes received from the transport
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pop the next complete line, without the LF and any trailing CR.
    ///
    /// Returns `None` when no terminator has been buffered yet.
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(line)
    }

    /// Number of buffered bytes not yet yielded
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_line_until_terminator() {
        let mut buf = LineBuffer::new();
        buf.push_bytes(b"hel");
        assert_eq!(buf.next_line(), None);
        buf.push_bytes(b"lo");
        assert_eq!(buf.next_line(), None);
        buf.push_bytes(b"\n");
        assert_eq!(buf.next_line(), Some(b"hello".to_vec()));
        assert_eq!(buf.next_line(), None);
    }

    #[test]
    fn test_carriage_return_stripped() {
        let mut buf = LineBuffer::new();
        buf.push_bytes(b"passwd\r\n");
        assert_eq!(buf.next_line(), Some(b"passwd".to_vec()));
    }

    #[test]
    fn test_remainder_retained_for_next_line() {
        let mut buf = LineBuffer::new();
        buf.push_bytes(b"one\ntwo\nthr");
        assert_eq!(buf.next_line(), Some(b"one".to_vec()));
        assert_eq!(buf.next_line(), Some(b"two".to_vec()));
        assert_eq!(buf.next_line(), None);
        assert_eq!(buf.pending(), 3);
        buf.push_bytes(b"ee\n");
        assert_eq!(buf.next_line(), Some(b"three".to_vec()));
    }

    #[test]
    fn test_empty_line() {
        let mut buf = LineBuffer::new();
        buf.push_bytes(b"\n");
        assert_eq!(buf.next_line(), Some(Vec::new()));
    }

    #[test]
    fn test_interior_cr_preserved() {
        let mut buf = LineBuffer::new();
        buf.push_bytes(b"a\rb\n");
        assert_eq!(buf.next_line(), Some(b"a\rb".to_vec()));
    }
}
