//! Per-connection echo buffer.
//!
//! One fixed-capacity buffer with a single cursor serves a whole round trip:
//! fill it from the socket, reset, drain it back. Partial transfers accumulate
//! across readiness events; since mio delivers edge-triggered notifications,
//! both operations loop until the stream would block.

use std::io::{self, Read, Write};

/// Outcome of a fill or drain pass over a non-blocking stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The cursor reached capacity.
    Complete,
    /// The stream would block before the buffer completed; resume on the
    /// next readiness event.
    Partial,
    /// The stream signalled end-of-stream. Never produced by `drain_to`.
    Eof,
}

/// Fixed-capacity byte buffer with a transfer cursor.
#[derive(Debug)]
pub struct EchoBuffer {
    data: Box<[u8]>,
    cursor: usize,
}

impl EchoBuffer {
    /// Create a zeroed buffer of the given capacity.
    pub fn zeroed(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            cursor: 0,
        }
    }

    /// Create a buffer pre-loaded with a payload, ready to drain.
    pub fn from_slice(payload: &[u8]) -> Self {
        Self {
            data: payload.to_vec().into_boxed_slice(),
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Rewind the cursor so the buffer can be filled or drained again.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    pub fn is_complete(&self) -> bool {
        self.cursor == self.data.len()
    }

    /// The full buffer contents, independent of the cursor.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Read from `stream` into the unfilled remainder until the buffer is
    /// complete, the stream would block, or end-of-stream.
    pub fn fill_from<R: Read>(&mut self, stream: &mut R) -> io::Result<Progress> {
        loop {
            if self.is_complete() {
                return Ok(Progress::Complete);
            }
            match stream.read(&mut self.data[self.cursor..]) {
                Ok(0) => return Ok(Progress::Eof),
                Ok(n) => self.cursor += n,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(Progress::Partial)
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Write the undrained remainder to `stream` until the buffer is
    /// complete or the stream would block.
    pub fn drain_to<W: Write>(&mut self, stream: &mut W) -> io::Result<Progress> {
        loop {
            if self.is_complete() {
                return Ok(Progress::Complete);
            }
            match stream.write(&self.data[self.cursor..]) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "stream accepted zero bytes",
                    ))
                }
                Ok(n) => self.cursor += n,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(Progress::Partial)
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reader that hands out at most `chunk` bytes per call and reports
    /// WouldBlock after every successful read.
    struct ThrottledReader {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
        ready: bool,
    }

    impl ThrottledReader {
        fn new(data: &[u8], chunk: usize) -> Self {
            Self {
                data: data.to_vec(),
                pos: 0,
                chunk,
                ready: true,
            }
        }
    }

    impl Read for ThrottledReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.ready {
                self.ready = true;
                return Err(io::Error::new(io::ErrorKind::WouldBlock, "not ready"));
            }
            if self.pos == self.data.len() {
                return Ok(0);
            }
            let n = self.chunk.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            self.ready = false;
            Ok(n)
        }
    }

    /// Writer that accepts at most `chunk` bytes per call, blocking between.
    struct ThrottledWriter {
        written: Vec<u8>,
        chunk: usize,
        ready: bool,
    }

    impl Write for ThrottledWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if !self.ready {
                self.ready = true;
                return Err(io::Error::new(io::ErrorKind::WouldBlock, "not ready"));
            }
            let n = self.chunk.min(buf.len());
            self.written.extend_from_slice(&buf[..n]);
            self.ready = false;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_fill_accumulates_partial_reads() {
        let mut reader = ThrottledReader::new(b"abcdefgh", 3);
        let mut buf = EchoBuffer::zeroed(8);

        // Each readiness event resumes where the last one stopped.
        let mut passes = 0;
        loop {
            match buf.fill_from(&mut reader).unwrap() {
                Progress::Complete => break,
                Progress::Partial => passes += 1,
                Progress::Eof => panic!("unexpected eof"),
            }
        }
        assert!(passes >= 2);
        assert_eq!(buf.as_slice(), b"abcdefgh");
        assert!(buf.is_complete());
    }

    #[test]
    fn test_fill_reports_eof() {
        let mut reader = ThrottledReader::new(b"abc", 8);
        let mut buf = EchoBuffer::zeroed(8);

        loop {
            match buf.fill_from(&mut reader).unwrap() {
                Progress::Eof => break,
                Progress::Partial => {}
                Progress::Complete => panic!("buffer should not complete"),
            }
        }
        assert!(!buf.is_complete());
        assert_eq!(&buf.as_slice()[..3], b"abc");
    }

    #[test]
    fn test_drain_accumulates_partial_writes() {
        let mut writer = ThrottledWriter {
            written: Vec::new(),
            chunk: 3,
            ready: true,
        };
        let mut buf = EchoBuffer::from_slice(b"abcdefgh");

        loop {
            match buf.drain_to(&mut writer).unwrap() {
                Progress::Complete => break,
                Progress::Partial => {}
                Progress::Eof => unreachable!(),
            }
        }
        // No bytes lost or duplicated across partial transfers.
        assert_eq!(writer.written, b"abcdefgh");
    }

    #[test]
    fn test_reset_allows_reuse() {
        let mut buf = EchoBuffer::from_slice(b"zzzz");
        let mut writer = ThrottledWriter {
            written: Vec::new(),
            chunk: 16,
            ready: true,
        };
        while buf.drain_to(&mut writer).unwrap() != Progress::Complete {}
        buf.reset();
        assert!(!buf.is_complete());

        let mut reader = ThrottledReader::new(b"yyyy", 16);
        while buf.fill_from(&mut reader).unwrap() != Progress::Complete {}
        assert_eq!(buf.as_slice(), b"yyyy");
    }

    #[test]
    fn test_interrupted_is_retried() {
        struct InterruptOnce {
            hit: bool,
        }
        impl Read for InterruptOnce {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if !self.hit {
                    self.hit = true;
                    return Err(io::Error::new(io::ErrorKind::Interrupted, "signal"));
                }
                buf[..2].copy_from_slice(b"ok");
                Ok(2)
            }
        }

        let mut buf = EchoBuffer::zeroed(2);
        let progress = buf.fill_from(&mut InterruptOnce { hit: false }).unwrap();
        assert_eq!(progress, Progress::Complete);
        assert_eq!(buf.as_slice(), b"ok");
    }
}
