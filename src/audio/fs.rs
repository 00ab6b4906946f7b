//! Filesystem collaborator used by the stream buffer.
//!
//! Closing a file is dropping its handle.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

/// An open, readable file handle
pub trait FileSource: Send {
    /// Read up to `buf.len()` bytes, returning the count read (0 at end of file)
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Move the read position to an absolute byte offset
    fn seek(&mut self, pos: u64) -> io::Result<()>;

    /// True once the read position has reached the end of the file
    fn is_at_end(&self) -> bool;
}

/// Opens files by path
pub trait FileSystem: Send + Sync {
    fn open(&self, path: &Path) -> io::Result<Box<dyn FileSource>>;
}

/// Host filesystem access through `std::fs`
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn open(&self, path: &Path) -> io::Result<Box<dyn FileSource>> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Box::new(StdFile { file, len, pos: 0 }))
    }
}

struct StdFile {
    file: File,
    len: u64,
    pos: u64,
}

impl FileSource for StdFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.file.read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }

    fn seek(&mut self, pos: u64) -> io::Result<()> {
        self.pos = self.file.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.len
    }
}

/// In-memory files keyed by path
///
/// `max_read` caps the bytes returned per `read` call, which emulates a
/// storage device delivering short reads.
#[derive(Debug, Default, Clone)]
pub struct MemoryFileSystem {
    files: Arc<RwLock<HashMap<PathBuf, Arc<[u8]>>>>,
    max_read: Option<usize>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit every read to at most `max_read` bytes
    pub fn with_max_read(mut self, max_read: usize) -> Self {
        self.max_read = Some(max_read.max(1));
        self
    }

    /// Add or replace a file
    pub fn insert<P: Into<PathBuf>>(&self, path: P, contents: Vec<u8>) {
        self.files.write().insert(path.into(), Arc::from(contents));
    }

    pub fn remove(&self, path: &Path) -> bool {
        self.files.write().remove(path).is_some()
    }
}

impl FileSystem for MemoryFileSystem {
    fn open(&self, path: &Path) -> io::Result<Box<dyn FileSource>> {
        let data = self.files.read().get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display()))
        })?;
        Ok(Box::new(MemoryFile {
            data,
            pos: 0,
            max_read: self.max_read,
        }))
    }
}

struct MemoryFile {
    data: Arc<[u8]>,
    pos: usize,
    max_read: Option<usize>,
}

impl FileSource for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.data[self.pos.min(self.data.len())..];
        let mut n = buf.len().min(remaining.len());
        if let Some(max) = self.max_read {
            n = n.min(max);
        }
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }

    fn seek(&mut self, pos: u64) -> io::Result<()> {
        self.pos = usize::try_from(pos)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "seek offset too large"))?;
        Ok(())
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }
}
