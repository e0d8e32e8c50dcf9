//! Byte source/sink indirection for format handlers.
//!
//! Formats that advertise [`Capability::IoProxy`](crate::Capability::IoProxy)
//! read through a [`IoProxy`] and write through an [`IoSink`] instead of
//! touching the filesystem directly, so the same decoder serves files,
//! in-memory buffers, and anything else that can seek. A caller-supplied
//! proxy is moved into the input/output as `Box<dyn ...>` and dropped with
//! it.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::IoResult;

/// A seekable byte source a format reader can decode from.
pub trait IoProxy: Read + Seek + Send {}
impl<T: Read + Seek + Send + ?Sized> IoProxy for T {}

/// A seekable byte sink a format writer can encode into.
pub trait IoSink: Write + Seek + Send {}
impl<T: Write + Seek + Send + ?Sized> IoSink for T {}

/// Buffered read proxy over a file on disk.
pub struct FileProxy {
    inner: BufReader<File>,
}

impl FileProxy {
    /// Opens a file for reading.
    pub fn open(path: &Path) -> IoResult<Self> {
        Ok(Self {
            inner: BufReader::new(File::open(path)?),
        })
    }
}

impl Read for FileProxy {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Seek for FileProxy {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

/// Read proxy over an owned in-memory buffer.
pub struct MemReader {
    inner: Cursor<Vec<u8>>,
}

impl MemReader {
    /// Wraps a byte buffer.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            inner: Cursor::new(data),
        }
    }
}

impl Read for MemReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Seek for MemReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

/// Buffered write sink creating a file on disk.
pub struct FileSink {
    inner: BufWriter<File>,
}

impl FileSink {
    /// Creates (or truncates) a file for writing.
    pub fn create(path: &Path) -> IoResult<Self> {
        Ok(Self {
            inner: BufWriter::new(File::create(path)?),
        })
    }
}

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Seek for FileSink {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

/// Write sink accumulating into an in-memory buffer.
#[derive(Default)]
pub struct MemWriter {
    inner: Cursor<Vec<u8>>,
}

impl MemWriter {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the sink and returns the accumulated bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.inner.into_inner()
    }
}

impl Write for MemWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Seek for MemWriter {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mem_round_trip() {
        let mut sink = MemWriter::new();
        sink.write_all(b"P5 header").unwrap();
        sink.seek(SeekFrom::Start(0)).unwrap();
        sink.write_all(b"P6").unwrap();

        let mut proxy = MemReader::new(sink.into_inner());
        let mut buf = Vec::new();
        proxy.read_to_end(&mut buf).unwrap();
        assert_eq!(&buf, b"P6 header");
    }

    #[test]
    fn test_boxed_proxy_is_object_safe() {
        let boxed: Box<dyn IoProxy> = Box::new(MemReader::new(vec![1, 2, 3]));
        let mut proxy = boxed;
        let mut buf = [0u8; 2];
        proxy.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [1, 2]);
    }
}
