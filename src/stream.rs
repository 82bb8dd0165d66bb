//! Byte streams the codec reads from and writes to.
//!
//! A stream is a position/length cursor over an underlying byte sequence.
//! Reads never run past the length (short reads return the count actually
//! copied); writes either append ([`DynamicStream`]) or fill a caller buffer
//! up to its capacity ([`FixedStream`]), clamped rather than failing;
//! malformed or oversized wire data degrades, it does not panic.

/// Cursor over an underlying byte sequence.
pub trait MessageStream {
    /// Copy up to `buf.len()` bytes from the current position, advancing it.
    /// Returns the number of bytes actually copied.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Write `data` at the current position, advancing it.
    fn write(&mut self, data: &[u8]);

    /// Move the cursor. Positions past the end clamp to the end.
    fn seek(&mut self, pos: usize);

    /// Current cursor position.
    fn position(&self) -> usize;

    /// Total length of the underlying data.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Growable stream backed by a `Vec<u8>`. Writes past the end append.
#[derive(Debug, Default, Clone)]
pub struct DynamicStream {
    data: Vec<u8>,
    pos: usize,
}

impl DynamicStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing bytes; the cursor starts at 0.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl MessageStream for DynamicStream {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.data.len().saturating_sub(self.pos));
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        n
    }

    fn write(&mut self, data: &[u8]) {
        let overlap = data.len().min(self.data.len().saturating_sub(self.pos));
        self.data[self.pos..self.pos + overlap].copy_from_slice(&data[..overlap]);
        self.data.extend_from_slice(&data[overlap..]);
        self.pos += data.len();
    }

    fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

/// Stream over a caller-provided buffer. The readable/written length is
/// tracked separately from the capacity; writes past the capacity are
/// silently dropped.
#[derive(Debug)]
pub struct FixedStream<'a> {
    data: &'a mut [u8],
    len: usize,
    pos: usize,
}

impl<'a> FixedStream<'a> {
    /// An empty stream to be written into `buf`.
    pub fn for_writing(buf: &'a mut [u8]) -> Self {
        Self {
            data: buf,
            len: 0,
            pos: 0,
        }
    }

    /// A stream whose first `len` bytes of `buf` are readable.
    pub fn for_reading(buf: &'a mut [u8], len: usize) -> Self {
        let len = len.min(buf.len());
        Self {
            data: buf,
            len,
            pos: 0,
        }
    }
}

impl MessageStream for FixedStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.len.saturating_sub(self.pos));
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        n
    }

    fn write(&mut self, data: &[u8]) {
        let n = data.len().min(self.data.len().saturating_sub(self.pos));
        self.data[self.pos..self.pos + n].copy_from_slice(&data[..n]);
        self.pos += n;
        self.len = self.len.max(self.pos);
    }

    fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.len);
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_append_and_read_back() {
        let mut s = DynamicStream::new();
        s.write(b"hello");
        s.write(b" world");
        assert_eq!(s.len(), 11);
        s.seek(0);
        let mut buf = [0u8; 16];
        let n = s.read(&mut buf);
        assert_eq!(&buf[..n], b"hello world");
    }

    #[test]
    fn dynamic_read_never_exceeds_length() {
        let mut s = DynamicStream::from_vec(vec![1, 2, 3]);
        let mut buf = [0u8; 8];
        assert_eq!(s.read(&mut buf), 3);
        assert_eq!(s.read(&mut buf), 0);
    }

    #[test]
    fn dynamic_overwrite_then_append() {
        let mut s = DynamicStream::from_vec(vec![0; 4]);
        s.seek(2);
        s.write(&[9, 9, 9, 9]);
        assert_eq!(s.as_slice(), &[0, 0, 9, 9, 9, 9]);
    }

    #[test]
    fn fixed_write_clamps_at_capacity() {
        let mut buf = [0u8; 4];
        let mut s = FixedStream::for_writing(&mut buf);
        s.write(b"abcdef");
        assert_eq!(s.len(), 4);
        assert_eq!(&buf, b"abcd");
    }

    #[test]
    fn seek_clamps_to_end() {
        let mut s = DynamicStream::from_vec(vec![1, 2, 3]);
        s.seek(100);
        assert_eq!(s.position(), 3);
    }
}
