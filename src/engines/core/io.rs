//! Buffered I/O for line-oriented genomic files
//!
//! All text formats handled by this crate (FASTA, GFF, GTF, BED, genotype
//! tables) are consumed line by line. [`FastReader`] wraps any byte source in a
//! large read buffer and hands out numbered lines, so parsers can report the
//! exact line an error came from. Large reference files can be memory-mapped
//! with [`MappedFile`] and read through the same interface.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Cursor, Read, Write};
use std::path::Path;

use memmap2::{Mmap, MmapOptions};

// Default buffer sizes
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024 * 1024; // 1MB
pub const DEFAULT_WRITE_BUFFER_SIZE: usize = 1024 * 1024; // 1MB

/// Buffered line reader over any byte source
pub struct FastReader<R: Read> {
    reader: BufReader<R>,
    bytes_read: usize,
}

impl FastReader<File> {
    /// Open a file for buffered reading
    pub fn open<P: AsRef<Path>>(path: P, buffer_size: Option<usize>) -> io::Result<Self> {
        let file = File::open(path.as_ref())?;
        log::debug!("Opened {} for reading", path.as_ref().display());
        Ok(Self::with_capacity(file, buffer_size.unwrap_or(DEFAULT_READ_BUFFER_SIZE)))
    }
}

impl<'a> FastReader<&'a [u8]> {
    /// Read from an in-memory buffer (string content, mapped file)
    pub fn from_bytes(data: &'a [u8]) -> Self {
        Self::with_capacity(data, DEFAULT_READ_BUFFER_SIZE.min(data.len().max(1)))
    }
}

impl<R: Read> FastReader<R> {
    /// Wrap an arbitrary reader
    pub fn new(inner: R) -> Self {
        Self::with_capacity(inner, DEFAULT_READ_BUFFER_SIZE)
    }

    /// Wrap an arbitrary reader with a specific buffer size
    pub fn with_capacity(inner: R, buffer_size: usize) -> Self {
        Self {
            reader: BufReader::with_capacity(buffer_size, inner),
            bytes_read: 0,
        }
    }

    /// Read the remaining input into a vector
    pub fn read_all(&mut self) -> io::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.bytes_read += self.reader.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    /// Read the next line without its line terminator.
    ///
    /// Returns `Ok(false)` at end of input.
    pub fn read_line_into(&mut self, buffer: &mut String) -> io::Result<bool> {
        buffer.clear();
        let n = self.reader.read_line(buffer)?;
        if n == 0 {
            return Ok(false);
        }
        self.bytes_read += n;

        if buffer.ends_with('\n') {
            buffer.pop();
            if buffer.ends_with('\r') {
                buffer.pop();
            }
        }
        Ok(true)
    }

    /// Iterate over numbered lines (1-based)
    pub fn lines(self) -> Lines<R> {
        Lines {
            reader: self,
            line_no: 0,
        }
    }

    /// Number of bytes consumed so far
    pub fn bytes_read(&self) -> usize {
        self.bytes_read
    }
}

/// Iterator over numbered lines of a [`FastReader`]
pub struct Lines<R: Read> {
    reader: FastReader<R>,
    line_no: usize,
}

impl<R: Read> Lines<R> {
    /// Line number of the most recently returned line
    pub fn line_no(&self) -> usize {
        self.line_no
    }
}

impl<R: Read> Iterator for Lines<R> {
    type Item = io::Result<(usize, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buffer = String::new();
        match self.reader.read_line_into(&mut buffer) {
            Ok(false) => None,
            Ok(true) => {
                self.line_no += 1;
                Some(Ok((self.line_no, buffer)))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Read-only memory-mapped file
pub struct MappedFile {
    mmap: Option<Mmap>,
}

impl MappedFile {
    /// Map a file into memory.
    ///
    /// Empty files cannot be mapped on every platform, so they are represented
    /// without a mapping.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path.as_ref())?;
        let len = file.metadata()?.len();
        if len == 0 {
            return Ok(Self { mmap: None });
        }

        // The mapping is read-only and the file is not modified while mapped.
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        log::debug!("Mapped {} ({} bytes)", path.as_ref().display(), len);
        Ok(Self { mmap: Some(mmap) })
    }

    /// Get the mapped bytes
    pub fn as_slice(&self) -> &[u8] {
        match &self.mmap {
            Some(mmap) => &mmap[..],
            None => &[],
        }
    }

    /// Length of the mapped data
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Check if the mapped data is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Buffered reader over the mapped bytes
    pub fn reader(&self) -> FastReader<Cursor<&[u8]>> {
        FastReader::new(Cursor::new(self.as_slice()))
    }
}

/// Buffered file writer
pub struct FastWriter {
    writer: BufWriter<File>,
    bytes_written: usize,
}

impl FastWriter {
    /// Create (or truncate) a file for writing
    pub fn create<P: AsRef<Path>>(path: P, buffer_size: Option<usize>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;
        let buf_size = buffer_size.unwrap_or(DEFAULT_WRITE_BUFFER_SIZE);

        Ok(Self {
            writer: BufWriter::with_capacity(buf_size, file),
            bytes_written: 0,
        })
    }

    /// Number of bytes written so far
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }
}

impl Write for FastWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.writer.write(buf)?;
        self.bytes_written += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
