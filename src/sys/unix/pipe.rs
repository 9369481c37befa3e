use std::fs::File;
use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, FromRawFd, IntoRawFd, RawFd};

use crate::poll::Interest;

/// Create a new non-blocking unix pipe.
///
/// This is a wrapper around unix's `pipe` system call. The returned ends
/// are the minimal file descriptor source for the runtime's poll
/// operation: register the receiving end with [`Interest::Read`] to be
/// woken when bytes arrive, the sending end with [`Interest::Write`] to
/// be woken when the pipe has room.
///
/// Both ends are owned: dropping an end closes its descriptor. Cancel any
/// outstanding poll registration for an end before dropping it.
///
/// # Examples
///
/// ```
/// # fn main() -> std::io::Result<()> {
/// use std::io::{Read, Write};
/// use std::os::unix::io::AsRawFd;
///
/// use eddy::unix::new_pipe;
/// use eddy::{Interest, Runtime};
///
/// let mut runtime = Runtime::new();
/// let (mut sender, mut receiver) = new_pipe()?;
/// sender.write_all(b"ping")?;
///
/// let fd = receiver.as_raw_fd();
/// let _action = runtime.poll(Interest::Read, fd, move |_, event| {
///     assert!(event.is_done());
///     let mut buffer = [0; 4];
///     let n = receiver.read(&mut buffer).unwrap();
///     assert_eq!(&buffer[..n], b"ping");
/// });
/// runtime.start()?;
/// # Ok(())
/// # }
/// ```
pub fn new_pipe() -> io::Result<(Sender, Receiver)> {
    let mut fds: [RawFd; 2] = [-1; 2];

    if unsafe { libc::pipe(fds.as_mut_ptr()) } == -1 {
        Err(io::Error::last_os_error())
    } else {
        for fd in &fds {
            if unsafe { libc::fcntl(*fd, libc::F_SETFL, libc::O_NONBLOCK) } == -1 {
                return Err(io::Error::last_os_error());
            }
        }
        let r = Receiver { inner: unsafe { File::from_raw_fd(fds[0]) } };
        let w = Sender { inner: unsafe { File::from_raw_fd(fds[1]) } };
        Ok((w, r))
    }
}

/// Receiving end of an unix pipe.
///
/// See [`new_pipe`] for documentation, including examples.
#[derive(Debug)]
pub struct Receiver {
    inner: File,
}

impl Receiver {
    /// The interest to use when registering the receiving end.
    pub const INTEREST: Interest = Interest::Read;
}

impl AsRawFd for Receiver {
    fn as_raw_fd(&self) -> RawFd {
        self.inner.as_raw_fd()
    }
}

impl IntoRawFd for Receiver {
    fn into_raw_fd(self) -> RawFd {
        self.inner.into_raw_fd()
    }
}

impl Read for Receiver {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Sending end of an unix pipe.
///
/// See [`new_pipe`] for documentation, including examples.
#[derive(Debug)]
pub struct Sender {
    inner: File,
}

impl Sender {
    /// The interest to use when registering the sending end.
    pub const INTEREST: Interest = Interest::Write;
}

impl AsRawFd for Sender {
    fn as_raw_fd(&self) -> RawFd {
        self.inner.as_raw_fd()
    }
}

impl IntoRawFd for Sender {
    fn into_raw_fd(self) -> RawFd {
        self.inner.into_raw_fd()
    }
}

impl Write for Sender {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
