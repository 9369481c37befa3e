//! Readiness poll adapter.
//!
//! The adapter holds at most one callback per `(fd, interest)` pair and
//! translates OS readiness into scheduled callbacks: a ready registration
//! is removed and its callback lands on the ready queue armed with
//! [`Event::Done`], or an [`Event::Error`] for fd error conditions. The
//! contract is level-triggered: a caller that neither consumes the
//! readiness nor re-registers simply stops hearing about the fd. The
//! `poll(2)` backend rebuilds its interest set on every wait and is
//! level-triggered by construction.

use std::os::unix::io::RawFd;
use std::time::Duration;
use std::{io, mem};

use log::trace;
use slab::Slab;

use crate::action::{Action, Source};
use crate::callback::{Callback, EventCallback};
use crate::event::Event;
use crate::ready::CallbackQueue;
use crate::sys;

/// The readiness to monitor a file descriptor for.
///
/// Used with [`Runtime::poll`]. At most one callback can be registered
/// per `(fd, interest)` pair; read and write interest in the same fd are
/// independent registrations.
///
/// [`Runtime::poll`]: crate::Runtime::poll
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Interest {
    /// The descriptor has bytes to read, or has reached end-of-stream. A
    /// hangup reported by the OS counts as readable; the following read
    /// observes the end of the stream.
    Read,
    /// The descriptor can accept bytes without blocking. A hangup on a
    /// write registration is delivered as `Error(EPIPE)`.
    Write,
}

/// Registration table for fd readiness callbacks.
#[derive(Debug)]
pub(crate) struct Poller {
    registrations: Slab<Registration>,
    next_generation: u64,
}

#[derive(Debug)]
struct Registration {
    generation: u64,
    fd: RawFd,
    interest: Interest,
    state: State,
}

#[derive(Debug)]
enum State {
    /// Waiting for readiness.
    Armed(EventCallback),
    /// Readiness fired; the callback sits in the ready queue at this
    /// entry. The slot survives so the submitter's `Action` can still
    /// cancel the callback until it actually runs.
    Fired {
        ready_key: usize,
        ready_generation: u64,
    },
}

impl Registration {
    fn is_armed(&self) -> bool {
        match self.state {
            State::Armed(..) => true,
            State::Fired { .. } => false,
        }
    }
}

impl Poller {
    pub(crate) fn new() -> Poller {
        Poller {
            registrations: Slab::new(),
            next_generation: 0,
        }
    }

    /// Register interest in `fd`. A duplicate `(fd, interest)`
    /// registration fails by scheduling the new callback with
    /// `Error(EEXIST)`; the returned action then cancels that scheduled
    /// error delivery rather than a registration.
    pub(crate) fn register(&mut self, interest: Interest, fd: RawFd, mut callback: EventCallback,
        ready: &mut CallbackQueue,
    ) -> Action {
        if self.is_registered(fd, interest) {
            trace!("duplicate poll registration: fd={}, interest={:?}", fd, interest);
            callback.param(Event::Error(libc::EEXIST));
            let (key, generation) = ready.append(callback.into());
            return Action::new(Source::Ready, key, generation);
        }

        let generation = self.next_generation;
        self.next_generation += 1;
        let key = self.registrations.insert(Registration {
            generation,
            fd,
            interest,
            state: State::Armed(callback),
        });
        trace!("registering poll interest: fd={}, interest={:?}, key={}", fd, interest, key);
        Action::new(Source::Poll, key, generation)
    }

    /// Non-blocking sweep: translate any pending readiness into scheduled
    /// callbacks.
    pub(crate) fn poll(&mut self, ready: &mut CallbackQueue) -> io::Result<()> {
        self.sweep(Some(Duration::from_millis(0)), ready)
    }

    /// Block until a registered fd is ready or `bound` elapses (`None`
    /// meaning indefinitely), then behave as a non-blocking sweep.
    pub(crate) fn wait(&mut self, bound: Option<Duration>, ready: &mut CallbackQueue) -> io::Result<()> {
        self.sweep(bound, ready)
    }

    /// Whether no registrations exist.
    pub(crate) fn idle(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Cancel the registration at `key`, if `generation` still matches,
    /// without firing. A registration whose readiness has fired is still
    /// cancellable: the scheduled callback is removed from the ready
    /// queue. Returns whether anything was removed.
    pub(crate) fn cancel(&mut self, key: usize, generation: u64, ready: &mut CallbackQueue) -> bool {
        let live = self.registrations.get(key)
            .map_or(false, |registration| registration.generation == generation);
        if !live {
            return false;
        }

        let registration = self.registrations.remove(key);
        trace!("cancelling poll registration: fd={}, interest={:?}, key={}",
            registration.fd, registration.interest, key);
        if let State::Fired { ready_key, ready_generation } = registration.state {
            let _ = ready.cancel(ready_key, ready_generation);
        }
        true
    }

    /// Release the slot of a fired registration. Called by the scheduled
    /// callback just before it runs, at which point the submitter's
    /// action goes stale.
    pub(crate) fn complete(&mut self, key: usize, generation: u64) {
        let live = self.registrations.get(key)
            .map_or(false, |registration| registration.generation == generation);
        if live {
            drop(self.registrations.remove(key));
        }
    }

    fn is_registered(&self, fd: RawFd, interest: Interest) -> bool {
        self.registrations.iter().any(|(_, registration)| {
            registration.fd == fd && registration.interest == interest && registration.is_armed()
        })
    }

    fn sweep(&mut self, timeout: Option<Duration>, ready: &mut CallbackQueue) -> io::Result<()> {
        trace!("polling: timeout={:?}", timeout);

        let mut fds = Vec::new();
        let mut keys = Vec::new();
        for (key, registration) in self.registrations.iter() {
            if registration.is_armed() {
                fds.push(libc::pollfd {
                    fd: registration.fd,
                    events: match registration.interest {
                        Interest::Read => libc::POLLIN,
                        Interest::Write => libc::POLLOUT,
                    },
                    revents: 0,
                });
                keys.push(key);
            }
        }

        match sys::poll(&mut fds, timeout) {
            Ok(0) => return Ok(()),
            Ok(_) => {},
            // A signal interrupted the wait; let the loop observe the
            // lifecycle flags.
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(err) => return Err(err),
        }

        for (i, pollfd) in fds.iter().enumerate() {
            if pollfd.revents == 0 {
                continue;
            }
            let key = keys[i];
            let interest = self.registrations[key].interest;
            self.fire(key, readiness_event(interest, pollfd.revents), ready);
        }
        Ok(())
    }

    /// Move the callback of a ready registration onto the ready queue,
    /// armed with `event`, and leave the slot in the fired state for
    /// cancellation.
    fn fire(&mut self, key: usize, event: Event, ready: &mut CallbackQueue) {
        let registration = &mut self.registrations[key];
        trace!("poll interest ready: fd={}, interest={:?}, event={:?}",
            registration.fd, registration.interest, event);

        let generation = registration.generation;
        let state = mem::replace(&mut registration.state, State::Fired {
            ready_key: 0,
            ready_generation: 0,
        });
        let mut callback = match state {
            State::Armed(callback) => callback,
            // Fired slots are not polled again.
            State::Fired { .. } => unreachable!("firing a poll registration twice"),
        };
        callback.param(event);

        let (ready_key, ready_generation) = ready.append(Callback::new(move |runtime| {
            runtime.complete_poll(key, generation);
            callback.execute(runtime);
        }));
        self.registrations[key].state = State::Fired { ready_key, ready_generation };
    }
}

/// Translate returned `poll(2)` events into the event the callback will
/// observe.
fn readiness_event(interest: Interest, revents: libc::c_short) -> Event {
    if revents & libc::POLLNVAL != 0 {
        return Event::Error(libc::EBADF);
    }
    if revents & libc::POLLERR != 0 {
        return Event::Error(libc::EIO);
    }
    match interest {
        // A hangup is readable: the next read observes end-of-stream.
        Interest::Read => Event::Done(Vec::new()),
        Interest::Write => {
            if revents & libc::POLLHUP != 0 {
                Event::Error(libc::EPIPE)
            } else {
                Event::Done(Vec::new())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use crate::poll::{readiness_event, Interest};
    use crate::event::Event;

    #[test]
    fn readiness_translation() {
        assert_eq!(readiness_event(Interest::Read, libc::POLLIN), Event::Done(Vec::new()));
        assert_eq!(readiness_event(Interest::Read, libc::POLLIN | libc::POLLHUP),
            Event::Done(Vec::new()));
        assert_eq!(readiness_event(Interest::Read, libc::POLLHUP), Event::Done(Vec::new()));
        assert_eq!(readiness_event(Interest::Write, libc::POLLOUT), Event::Done(Vec::new()));
        assert_eq!(readiness_event(Interest::Write, libc::POLLHUP), Event::Error(libc::EPIPE));
        assert_eq!(readiness_event(Interest::Read, libc::POLLERR), Event::Error(libc::EIO));
        assert_eq!(readiness_event(Interest::Write, libc::POLLNVAL), Event::Error(libc::EBADF));
    }
}
