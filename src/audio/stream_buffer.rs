use std::io;

use log::{debug, trace};

use crate::audio::fs::FileSource;

/// Bounded, auto-refilling byte window over a bound file
///
/// Unread bytes always start at `cursor` and span `left` bytes. Every byte
/// after them in the arena is zero, so a decoder reading past the end of the
/// file sees silence rather than stale data.
pub struct StreamBuffer {
    arena: Box<[u8]>,
    cursor: usize,
    left: usize,
    threshold: usize,
    file: Option<Box<dyn FileSource>>,
    /// Physical read position of the bound file
    file_pos: u64,
}

impl StreamBuffer {
    /// Create an unbound buffer; refills whenever fewer than `threshold` bytes remain
    pub fn new(capacity: usize, threshold: usize) -> Self {
        Self {
            arena: vec![0u8; capacity].into_boxed_slice(),
            cursor: 0,
            left: 0,
            threshold: threshold.min(capacity),
            file: None,
            file_pos: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.arena.len()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn is_bound(&self) -> bool {
        self.file.is_some()
    }

    /// Bind a freshly opened file, discarding any buffered content
    pub fn bind(&mut self, file: Box<dyn FileSource>) {
        self.file = Some(file);
        self.file_pos = 0;
        self.discard();
        if self.left < self.threshold {
            self.fill();
        }
    }

    /// Release the bound file, closing it
    pub fn unbind(&mut self) -> Option<Box<dyn FileSource>> {
        self.discard();
        self.file_pos = 0;
        self.file.take()
    }

    /// Compact unread bytes to the arena start and read into the freed space
    ///
    /// Returns false when nothing more could be obtained: the file is at its
    /// end, the arena is already full, or the read failed.
    pub fn fill(&mut self) -> bool {
        self.arena.copy_within(self.cursor..self.cursor + self.left, 0);
        self.cursor = 0;

        let left = self.left;
        let Some(file) = self.file.as_mut() else {
            self.arena[left..].fill(0);
            return false;
        };
        if file.is_at_end() || left == self.arena.len() {
            self.arena[left..].fill(0);
            return false;
        }

        let read = match file.read(&mut self.arena[left..]) {
            Ok(n) => n,
            Err(e) => {
                debug!("Read failed at file position {}: {}", self.file_pos, e);
                0
            }
        };
        self.left += read;
        self.file_pos += read as u64;
        let filled = self.left;
        self.arena[filled..].fill(0);
        trace!("Stream buffer filled {} bytes ({} buffered)", read, self.left);
        read > 0
    }

    /// Consume `bytes` from the front of the window
    ///
    /// Fails without side effects if fewer than `bytes` are buffered.
    pub fn shift(&mut self, bytes: usize) -> bool {
        if bytes > self.left {
            return false;
        }
        self.cursor += bytes;
        self.left -= bytes;
        if self.left < self.threshold {
            self.fill();
        }
        true
    }

    pub fn shift_all(&mut self) -> bool {
        self.shift(self.left)
    }

    /// Reposition the bound file, discarding buffered content
    pub fn seek(&mut self, file_pos: u64) -> io::Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "no file bound"))?;
        file.seek(file_pos)?;
        self.file_pos = file_pos;
        self.discard();
        if self.left < self.threshold {
            self.fill();
        }
        Ok(())
    }

    /// Unread bytes, followed by the zero padding up to the arena end
    pub fn buf(&self) -> &[u8] {
        &self.arena[self.cursor..]
    }

    pub fn get_left(&self) -> usize {
        self.left
    }

    /// File position consumed so far (physically read minus still buffered)
    pub fn tell(&self) -> u64 {
        self.file_pos - self.left as u64
    }

    fn discard(&mut self) {
        self.cursor = 0;
        self.left = 0;
        self.arena.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::fs::{FileSystem, MemoryFileSystem};
    use std::path::Path;

    fn counting_bytes(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8 + 1).collect()
    }

    fn bound_buffer(data: Vec<u8>, capacity: usize, threshold: usize) -> StreamBuffer {
        let fs = MemoryFileSystem::new();
        fs.insert("/t.bin", data);
        let mut rdbuf = StreamBuffer::new(capacity, threshold);
        rdbuf.bind(fs.open(Path::new("/t.bin")).unwrap());
        rdbuf
    }

    #[test]
    fn test_threshold_clamped_to_capacity() {
        let rdbuf = StreamBuffer::new(16, 64);
        assert_eq!(rdbuf.capacity(), 16);
        assert_eq!(rdbuf.threshold(), 16);
        assert!(!rdbuf.is_bound());
    }

    #[test]
    fn test_bind_performs_initial_fill() {
        let rdbuf = bound_buffer(counting_bytes(100), 32, 16);
        assert_eq!(rdbuf.get_left(), 32);
        assert_eq!(rdbuf.buf()[0], 1);
        assert_eq!(rdbuf.tell(), 0);
    }

    #[test]
    fn test_shift_rejects_more_than_left() {
        let mut rdbuf = bound_buffer(counting_bytes(10), 32, 8);
        assert_eq!(rdbuf.get_left(), 10);
        assert!(!rdbuf.shift(11));
        assert_eq!(rdbuf.get_left(), 10);
    }

    #[test]
    fn test_shift_above_threshold_does_not_refill() {
        let mut rdbuf = bound_buffer(counting_bytes(100), 32, 8);
        assert!(rdbuf.shift(10));
        assert_eq!(rdbuf.get_left(), 22);
        assert!(rdbuf.shift(14));
        assert_eq!(rdbuf.get_left(), 8);
        assert_eq!(rdbuf.buf()[0], 25);
    }

    #[test]
    fn test_shift_below_threshold_refills() {
        let mut rdbuf = bound_buffer(counting_bytes(100), 32, 8);
        assert!(rdbuf.shift(30));
        // 2 left triggers a refill of the 30 freed bytes
        assert_eq!(rdbuf.get_left(), 32);
        assert_eq!(rdbuf.buf()[0], 31);
        assert_eq!(rdbuf.tell(), 30);
    }

    #[test]
    fn test_zero_pad_on_eof() {
        let mut rdbuf = bound_buffer(counting_bytes(20), 32, 32);
        assert_eq!(rdbuf.get_left(), 20);
        assert!(rdbuf.buf()[20..].iter().all(|&b| b == 0));

        assert!(rdbuf.shift(15));
        assert!(!rdbuf.fill());
        assert_eq!(rdbuf.get_left(), 5);
        assert_eq!(&rdbuf.buf()[..5], &[16, 17, 18, 19, 20]);
        assert!(rdbuf.buf()[5..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_short_reads_accumulate() {
        let fs = MemoryFileSystem::new().with_max_read(4);
        fs.insert("/s.bin", counting_bytes(64));
        let mut rdbuf = StreamBuffer::new(16, 12);
        rdbuf.bind(fs.open(Path::new("/s.bin")).unwrap());

        assert_eq!(rdbuf.get_left(), 4);
        assert!(rdbuf.buf()[4..].iter().all(|&b| b == 0));
        assert!(rdbuf.fill());
        assert_eq!(rdbuf.get_left(), 8);
    }

    #[test]
    fn test_seek_discards_and_refills() {
        let mut rdbuf = bound_buffer(counting_bytes(100), 32, 16);
        assert!(rdbuf.shift(4));
        rdbuf.seek(50).unwrap();
        assert_eq!(rdbuf.tell(), 50);
        assert_eq!(rdbuf.buf()[0], 51);
        assert_eq!(rdbuf.get_left(), 32);
    }

    #[test]
    fn test_seek_unbound_fails() {
        let mut rdbuf = StreamBuffer::new(16, 8);
        assert!(rdbuf.seek(3).is_err());
        assert!(!rdbuf.fill());
    }

    #[test]
    fn test_shift_all_drains_to_eof() {
        let mut rdbuf = bound_buffer(counting_bytes(40), 32, 16);
        assert!(rdbuf.shift_all());
        assert_eq!(rdbuf.get_left(), 8);
        assert!(rdbuf.shift_all());
        assert_eq!(rdbuf.get_left(), 0);
        assert_eq!(rdbuf.tell(), 40);
        assert!(rdbuf.buf().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_unbind_closes_file() {
        let mut rdbuf = bound_buffer(counting_bytes(40), 32, 16);
        assert!(rdbuf.unbind().is_some());
        assert!(!rdbuf.is_bound());
        assert_eq!(rdbuf.get_left(), 0);
        assert!(rdbuf.unbind().is_none());
    }
}
