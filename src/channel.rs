//! Closable byte channels handed out by resources.
//!
//! A [`StreamChannel`] adapts any forward-only stream, a [`FileChannel`] additionally exposes
//! the position and size of a seekable stream.
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::io::{Error as IoError, ErrorKind, Read, Result as IoResult, Seek, SeekFrom, Write};

/// A handle to a byte source or sink which can be closed explicitly.
pub trait Channel {
    /// Checks whether the channel still accepts I/O.
    fn is_open(&self) -> bool;

    /// Closes the channel, flushing pending output. Closing twice is a no-op.
    fn close(&mut self) -> IoResult<()>;
}

/// A channel bytes can be read from.
pub trait ReadableChannel: Channel + Read + Send {}

impl<T: Channel + Read + Send> ReadableChannel for T {}

/// A channel bytes can be written to.
pub trait WritableChannel: Channel + Write + Send {}

impl<T: Channel + Write + Send> WritableChannel for T {}

fn closed_channel() -> IoError {
    IoError::new(ErrorKind::BrokenPipe, "channel is closed")
}

type Closer<S> = fn(&mut S) -> IoResult<()>;

fn keep<S>(_: &mut S) -> IoResult<()> {
    Ok(())
}

fn flush<S: Write>(stream: &mut S) -> IoResult<()> {
    stream.flush()
}

/// Adapter turning a plain stream into a channel.
pub struct StreamChannel<S> {
    stream: Option<S>,
    closer: Closer<S>,
}

impl<S: Read> StreamChannel<S> {
    /// Wraps a stream which is read from.
    pub fn reader(stream: S) -> Self {
        StreamChannel {
            stream: Some(stream),
            closer: keep::<S>,
        }
    }
}

impl<S: Write> StreamChannel<S> {
    /// Wraps a stream which is written to. Closing the channel flushes the stream.
    pub fn writer(stream: S) -> Self {
        StreamChannel {
            stream: Some(stream),
            closer: flush::<S>,
        }
    }
}

impl<S> StreamChannel<S> {
    fn stream(&mut self) -> IoResult<&mut S> {
        self.stream.as_mut().ok_or_else(closed_channel)
    }
}

impl<S> Debug for StreamChannel<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("StreamChannel")
            .field("open", &self.stream.is_some())
            .finish()
    }
}

impl<S: Read> Read for StreamChannel<S> {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        self.stream()?.read(buf)
    }
}

impl<S: Write> Write for StreamChannel<S> {
    fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
        self.stream()?.write(buf)
    }

    fn flush(&mut self) -> IoResult<()> {
        self.stream()?.flush()
    }
}

impl<S> Channel for StreamChannel<S> {
    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn close(&mut self) -> IoResult<()> {
        match self.stream.take() {
            Some(mut stream) => (self.closer)(&mut stream),
            None => Ok(()),
        }
    }
}

/// Positionable channel over a seekable stream, e.g. a file.
pub struct FileChannel<S> {
    stream: Option<S>,
    closer: Closer<S>,
}

impl<S: Read + Seek> FileChannel<S> {
    /// Wraps a file opened for reading.
    pub fn reader(stream: S) -> Self {
        FileChannel {
            stream: Some(stream),
            closer: keep::<S>,
        }
    }
}

impl<S: Write + Seek> FileChannel<S> {
    /// Wraps a file opened for writing. Closing the channel flushes the file.
    pub fn writer(stream: S) -> Self {
        FileChannel {
            stream: Some(stream),
            closer: flush::<S>,
        }
    }
}

impl<S: Seek> FileChannel<S> {
    fn stream(&mut self) -> IoResult<&mut S> {
        self.stream.as_mut().ok_or_else(closed_channel)
    }

    /// The current offset from the start of the file.
    pub fn position(&mut self) -> IoResult<u64> {
        self.stream()?.stream_position()
    }

    /// Moves the offset to `position`. Positions beyond the end are allowed.
    pub fn set_position(&mut self, position: u64) -> IoResult<()> {
        self.stream()?.seek(SeekFrom::Start(position)).map(|_| ())
    }

    /// The current size of the file, leaving the position untouched.
    pub fn size(&mut self) -> IoResult<u64> {
        let stream = self.stream()?;
        let position = stream.stream_position()?;
        let size = stream.seek(SeekFrom::End(0))?;
        if size != position {
            stream.seek(SeekFrom::Start(position))?;
        }
        Ok(size)
    }
}

impl<S> Debug for FileChannel<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FileChannel")
            .field("open", &self.stream.is_some())
            .finish()
    }
}

impl<S: Read + Seek> Read for FileChannel<S> {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        self.stream()?.read(buf)
    }
}

impl<S: Write + Seek> Write for FileChannel<S> {
    fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
        self.stream()?.write(buf)
    }

    fn flush(&mut self) -> IoResult<()> {
        self.stream()?.flush()
    }
}

impl<S: Seek> Seek for FileChannel<S> {
    fn seek(&mut self, pos: SeekFrom) -> IoResult<u64> {
        self.stream()?.seek(pos)
    }
}

impl<S: Seek> Channel for FileChannel<S> {
    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn close(&mut self) -> IoResult<()> {
        match self.stream.take() {
            Some(mut stream) => (self.closer)(&mut stream),
            None => Ok(()),
        }
    }
}
