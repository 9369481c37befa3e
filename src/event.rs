//! The event value delivered to callbacks.

use std::fmt;
use std::io;

/// Outcome of an asynchronous operation, delivered by value into an
/// event-flavoured callback.
///
/// Events are values, not references; handing an event to a callback moves
/// its payload. An operation that cannot be satisfied reports an
/// [`Error`] with an errno-style code rather than returning an error from
/// the submission itself, so every submitted operation either runs its
/// callback with a definitive event or is cancelled by the caller.
///
/// [`Error`]: Event::Error
///
/// # Examples
///
/// ```
/// use eddy::Event;
///
/// let event = Event::Done(b"payload".to_vec());
/// assert!(event.is_done());
/// assert_eq!(event.buffer(), &b"payload"[..]);
///
/// let event = Event::Error(libc::EAGAIN);
/// assert_eq!(event.error(), Some(libc::EAGAIN));
/// ```
#[derive(Clone, Eq, PartialEq)]
pub enum Event {
    /// The operation completed, optionally carrying a payload. An empty
    /// buffer means the operation had nothing to deliver, e.g. an fd
    /// readiness notification.
    Done(Vec<u8>),
    /// The operation failed with an errno-style code.
    Error(i32),
    /// End of stream. Not an error; byte-stream consumers propagate this
    /// when the peer finished writing.
    Eos,
    /// The runtime is draining reload interests.
    Reload,
    /// The runtime is draining stop interests.
    Stop,
}

impl Event {
    /// Whether this event is [`Event::Done`].
    pub fn is_done(&self) -> bool {
        match self {
            Event::Done(..) => true,
            _ => false,
        }
    }

    /// The payload carried by the event, empty for event types that don't
    /// carry one.
    pub fn buffer(&self) -> &[u8] {
        match self {
            Event::Done(buffer) => buffer,
            _ => &[],
        }
    }

    /// The errno-style code of an [`Event::Error`], `None` otherwise.
    pub fn error(&self) -> Option<i32> {
        match self {
            Event::Error(code) => Some(*code),
            _ => None,
        }
    }

    /// Convert an [`Event::Error`] into an [`io::Error`], `None` for the
    /// other event types.
    pub fn as_io_error(&self) -> Option<io::Error> {
        self.error().map(io::Error::from_raw_os_error)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Event::Done(buffer) => f.debug_tuple("Done")
                .field(&format_args!("{} bytes", buffer.len()))
                .finish(),
            Event::Error(code) => f.debug_tuple("Error").field(code).finish(),
            Event::Eos => f.pad("Eos"),
            Event::Reload => f.pad("Reload"),
            Event::Stop => f.pad("Stop"),
        }
    }
}
