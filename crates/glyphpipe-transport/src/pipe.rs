use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};

use tracing::trace;

use crate::error::{Result, TransportError};

/// The read end of a unidirectional pipe.
///
/// Dropping the reader closes the descriptor. A writer on the other end then
/// fails with `BrokenPipe` on its next write.
pub struct PipeReader {
    inner: File,
}

/// The write end of a unidirectional pipe.
///
/// Dropping the writer closes the descriptor. A reader on the other end then
/// observes end-of-stream (a zero-byte read) once buffered bytes are drained.
pub struct PipeWriter {
    inner: File,
}

/// Both ends of one freshly created pipe.
///
/// Bytes written to `writer` come out of `reader`, in order.
#[derive(Debug)]
pub struct PipePair {
    pub reader: PipeReader,
    pub writer: PipeWriter,
}

/// Create a new pipe and take ownership of both descriptors.
///
/// Both descriptors are close-on-exec: a descendant that execs another
/// program does not keep either end open.
pub fn pipe_pair() -> Result<PipePair> {
    let mut fds: [libc::c_int; 2] = [-1, -1];
    if raw_pipe(&mut fds) != 0 {
        return Err(TransportError::Pipe(std::io::Error::last_os_error()));
    }

    // SAFETY: pipe(2) succeeded, so both descriptors are open and nothing else owns them.
    let (read_fd, write_fd) =
        unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    {
        set_cloexec(&read_fd)?;
        set_cloexec(&write_fd)?;
    }

    trace!(read_fd = fds[0], write_fd = fds[1], "created pipe");

    Ok(PipePair {
        reader: PipeReader {
            inner: File::from(read_fd),
        },
        writer: PipeWriter {
            inner: File::from(write_fd),
        },
    })
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn raw_pipe(fds: &mut [libc::c_int; 2]) -> libc::c_int {
    // SAFETY: `fds` is a valid, writable array of two descriptors as pipe2(2) requires.
    unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn raw_pipe(fds: &mut [libc::c_int; 2]) -> libc::c_int {
    // SAFETY: `fds` is a valid, writable array of two descriptors as pipe(2) requires.
    unsafe { libc::pipe(fds.as_mut_ptr()) }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn set_cloexec(fd: &OwnedFd) -> Result<()> {
    let raw = fd.as_raw_fd();
    // SAFETY: `raw` is open and owned by `fd` for the duration of both calls.
    let rc = unsafe {
        let flags = libc::fcntl(raw, libc::F_GETFD);
        if flags < 0 {
            flags
        } else {
            libc::fcntl(raw, libc::F_SETFD, flags | libc::FD_CLOEXEC)
        }
    };
    if rc < 0 {
        return Err(TransportError::Pipe(std::io::Error::last_os_error()));
    }
    Ok(())
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl AsRawFd for PipeReader {
    fn as_raw_fd(&self) -> RawFd {
        self.inner.as_raw_fd()
    }
}

impl AsRawFd for PipeWriter {
    fn as_raw_fd(&self) -> RawFd {
        self.inner.as_raw_fd()
    }
}

impl AsFd for PipeReader {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.inner.as_fd()
    }
}

impl AsFd for PipeWriter {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.inner.as_fd()
    }
}

impl From<PipeReader> for OwnedFd {
    fn from(reader: PipeReader) -> Self {
        reader.inner.into()
    }
}

impl From<PipeWriter> for OwnedFd {
    fn from(writer: PipeWriter) -> Self {
        writer.inner.into()
    }
}

impl std::fmt::Debug for PipeReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeReader")
            .field("fd", &self.inner.as_raw_fd())
            .finish()
    }
}

impl std::fmt::Debug for PipeWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeWriter")
            .field("fd", &self.inner.as_raw_fd())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn bytes_flow_from_writer_to_reader() {
        let PipePair {
            mut reader,
            mut writer,
        } = pipe_pair().unwrap();

        writer.write_all(b"hello").unwrap();
        let mut buf = [0u8; 5];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn dropping_writer_yields_eof() {
        let PipePair { mut reader, writer } = pipe_pair().unwrap();
        drop(writer);

        let mut buf = [0u8; 8];
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn buffered_bytes_survive_writer_close() {
        let PipePair {
            mut reader,
            mut writer,
        } = pipe_pair().unwrap();
        writer.write_all(b"tail").unwrap();
        drop(writer);

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"tail");
    }

    #[test]
    fn dropping_reader_breaks_pipe() {
        let PipePair { reader, mut writer } = pipe_pair().unwrap();
        drop(reader);

        let err = writer.write(b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
    }

    #[test]
    fn ends_have_distinct_descriptors() {
        let pair = pipe_pair().unwrap();
        assert_ne!(pair.reader.as_raw_fd(), pair.writer.as_raw_fd());

        let debug = format!("{:?}", pair.reader);
        assert!(debug.starts_with("PipeReader"));
    }

    #[test]
    fn both_ends_are_close_on_exec() {
        let pair = pipe_pair().unwrap();
        for fd in [pair.reader.as_raw_fd(), pair.writer.as_raw_fd()] {
            // SAFETY: `fd` is owned by `pair`, which outlives the call.
            let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
            assert!(flags >= 0);
            assert_ne!(flags & libc::FD_CLOEXEC, 0, "fd {fd} survives exec");
        }
    }

    #[test]
    fn large_transfer_across_threads() {
        let PipePair {
            mut reader,
            mut writer,
        } = pipe_pair().unwrap();
        let payload: Vec<u8> = (0..256 * 1024).map(|i| (i % 251) as u8).collect();
        let expected = payload.clone();

        let handle = std::thread::spawn(move || {
            writer.write_all(&payload).unwrap();
        });

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        handle.join().unwrap();
        assert_eq!(out, expected);
    }
}
