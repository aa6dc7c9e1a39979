//! Line and column tracking over a buffered reader.

use std::io::{self, BufRead, Read};

/// Reader wrapper counting the lines and columns of the consumed input.
///
/// Lines and columns are 1-based; columns count characters, not bytes.
pub(crate) struct PositionTracking<R> {
    inner: R,
    line: i64,
    column: i64,
}

impl<R> PositionTracking<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self {
            inner,
            line: 1,
            column: 1,
        }
    }

    /// Position of the next unread character.
    pub(crate) fn position(&self) -> (i64, i64) {
        (self.line, self.column)
    }
}

fn advance(line: &mut i64, column: &mut i64, bytes: &[u8]) {
    for &byte in bytes {
        if byte == b'\n' {
            *line += 1;
            *column = 1;
        } else if byte & 0xC0 != 0x80 {
            *column += 1;
        }
    }
}

impl<R: Read> Read for PositionTracking<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let count = self.inner.read(out)?;
        advance(&mut self.line, &mut self.column, &out[..count]);
        Ok(count)
    }
}

impl<R: BufRead> BufRead for PositionTracking<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amount: usize) {
        if let Ok(buffer) = self.inner.fill_buf() {
            let consumed = &buffer[..amount.min(buffer.len())];
            advance(&mut self.line, &mut self.column, consumed);
        }
        self.inner.consume(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_lines_and_columns() {
        let mut reader = PositionTracking::new("ab\ncde".as_bytes());
        assert_eq!(reader.position(), (1, 1));
        reader.consume(2);
        assert_eq!(reader.position(), (1, 3));
        reader.consume(2);
        assert_eq!(reader.position(), (2, 2));
    }

    #[test]
    fn test_columns_count_characters() {
        let mut reader = PositionTracking::new("é€x".as_bytes());
        let length = reader.fill_buf().unwrap().len();
        reader.consume(length);
        assert_eq!(reader.position(), (1, 4));
    }

    #[test]
    fn test_read_is_tracked() {
        let mut reader = PositionTracking::new("a\nb".as_bytes());
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(reader.position(), (2, 2));
    }
}
