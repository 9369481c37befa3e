//! The event runtime and its loop.

use std::cell::RefCell;
use std::fmt;
use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;

use log::{error, info};
use slab::Slab;

use crate::action::{Action, Source};
use crate::callback::{Callback, EventCallback};
use crate::event::Event;
use crate::interest::{InterestRegistry, Lifecycle};
use crate::poll::{Interest, Poller};
use crate::ready::CallbackQueue;
use crate::signals;
use crate::timers::TimerQueue;

thread_local! {
    static RUNTIME: RefCell<Option<Runtime>> = RefCell::new(None);
}

/// A single-threaded cooperative event runtime.
///
/// The runtime owns four work sources: a FIFO ready queue, a
/// deadline-ordered timer queue, lifecycle interest queues and a
/// level-triggered poll adapter. [`start`] services them in strict
/// per-iteration priority: lifecycle drains, then expired timers, then
/// one ready callback, then I/O readiness. Every submission returns an
/// [`Action`] that cancels it.
///
/// All callbacks run on the loop thread and receive `&mut Runtime`, so a
/// callback can submit more work or cancel outstanding actions without
/// any synchronisation. Callbacks must not block; the only blocking point
/// is the poll adapter's wait inside the loop. There is no per-operation
/// timeout: to bound an I/O submission, race it against a [`timeout`] and
/// cancel the loser from whichever callback fires first.
///
/// [`start`]: Runtime::start
/// [`timeout`]: Runtime::timeout
///
/// # Examples
///
/// Timers fire before callbacks scheduled in the same iteration:
///
/// ```
/// use std::time::Duration;
///
/// use eddy::Runtime;
///
/// let mut runtime = Runtime::new();
/// let _timer = runtime.timeout(Duration::from_millis(0), |_| println!("first"));
/// let _ready = runtime.schedule(|_| println!("second"));
/// runtime.start().unwrap();
/// ```
pub struct Runtime {
    ready: CallbackQueue,
    timers: TimerQueue,
    interests: InterestRegistry,
    poller: Poller,
    cancellations: Slab<CancellationEntry>,
    next_cancellation_generation: u64,
}

struct CancellationEntry {
    generation: u64,
    routine: Callback,
}

impl Runtime {
    /// Create a new runtime and trap the stop and reload signals.
    ///
    /// `SIGINT` requests stop and `SIGHUP` requests reload; the handlers
    /// only flip a flag that [`start`] observes on its next iteration. A
    /// fresh runtime starts with both requests cleared.
    ///
    /// [`start`]: Runtime::start
    pub fn new() -> Runtime {
        info!("starting event system");
        signals::install();
        Runtime {
            ready: CallbackQueue::new(),
            timers: TimerQueue::new(),
            interests: InterestRegistry::new(),
            poller: Poller::new(),
            cancellations: Slab::new(),
            next_cancellation_generation: 0,
        }
    }

    /// Run `f` against the process-wide runtime, creating it on first
    /// access.
    ///
    /// Signal handlers have no context parameter, so a process gets one
    /// runtime; this is it. Inside callbacks use the `&mut Runtime`
    /// argument instead; calling `with` from a callback running under
    /// `with(|runtime| runtime.start())` panics on the nested borrow.
    pub fn with<F, R>(f: F) -> R
        where F: FnOnce(&mut Runtime) -> R,
    {
        RUNTIME.with(|runtime| {
            let mut runtime = runtime.borrow_mut();
            f(runtime.get_or_insert_with(Runtime::new))
        })
    }

    /// Schedule a callback on the ready queue.
    ///
    /// Ready callbacks run in FIFO order, one per loop iteration. The
    /// returned action removes the callback from the queue if it has not
    /// run yet.
    pub fn schedule<F>(&mut self, callback: F) -> Action
        where F: FnOnce(&mut Runtime) + 'static,
    {
        let (key, generation) = self.ready.append(Callback::new(callback));
        Action::new(Source::Ready, key, generation)
    }

    /// Schedule a callback to run once `after` has elapsed.
    ///
    /// Expired timers are dispatched in deadline order, ties in
    /// submission order, and take priority over ready callbacks within an
    /// iteration. Precision is best-effort.
    pub fn timeout<F>(&mut self, after: Duration, callback: F) -> Action
        where F: FnOnce(&mut Runtime) + 'static,
    {
        let (key, generation) = self.timers.append(after, Callback::new(callback));
        Action::new(Source::Timer, key, generation)
    }

    /// Register a callback against a lifecycle event.
    ///
    /// The callback runs when the loop drains the corresponding interest
    /// queue in response to [`stop`] or [`reload`]. Handlers registered
    /// while a drain is running are not run by that drain.
    ///
    /// [`stop`]: Runtime::stop
    /// [`reload`]: Runtime::reload
    pub fn register_interest<F>(&mut self, lifecycle: Lifecycle, callback: F) -> Action
        where F: FnOnce(&mut Runtime) + 'static,
    {
        let (key, generation) = self.interests.queue_mut(lifecycle).append(Callback::new(callback));
        Action::new(Source::Interest(lifecycle), key, generation)
    }

    /// Register a callback for readiness of `fd`.
    ///
    /// The callback observes [`Event::Done`] when the descriptor is
    /// ready, or [`Event::Error`] for fd error conditions and for a
    /// duplicate `(fd, interest)` registration (`EEXIST`). The
    /// registration is consumed by delivery; a caller that has not
    /// finished with the descriptor re-registers after performing its
    /// I/O, which is sound because readiness is level-triggered.
    pub fn poll<F>(&mut self, interest: Interest, fd: RawFd, callback: F) -> Action
        where F: FnOnce(&mut Runtime, Event) + 'static,
    {
        self.poller.register(interest, fd, EventCallback::new(callback), &mut self.ready)
    }

    /// Create an action wrapping a cancel routine.
    ///
    /// For composite operations whose cancellation is more than removing
    /// a queue entry, e.g. closing an underlying socket. The routine runs
    /// synchronously inside [`cancel`]; it must not block, but it may
    /// schedule further cleanup work.
    ///
    /// [`cancel`]: Runtime::cancel
    pub fn cancellation<F>(&mut self, routine: F) -> Action
        where F: FnOnce(&mut Runtime) + 'static,
    {
        let generation = self.next_cancellation_generation;
        self.next_cancellation_generation += 1;
        let key = self.cancellations.insert(CancellationEntry {
            generation,
            routine: Callback::new(routine),
        });
        Action::new(Source::Cancellation, key, generation)
    }

    /// Cancel a submitted operation.
    ///
    /// Idempotent: once `cancel` returns, the bound callback will not
    /// run, and further cancels through the same handle find a stale slot
    /// and do nothing. Cancelling from inside another callback is fine;
    /// a callback cancelling its own action is a no-op because a running
    /// callback has already left its queue.
    pub fn cancel(&mut self, action: Action) {
        match action.source {
            Source::Ready => drop(self.ready.cancel(action.key, action.generation)),
            Source::Timer => drop(self.timers.cancel(action.key, action.generation)),
            Source::Interest(lifecycle) => {
                let _ = self.interests.queue_mut(lifecycle).cancel(action.key, action.generation);
            },
            Source::Poll => {
                let _ = self.poller.cancel(action.key, action.generation, &mut self.ready);
            },
            Source::Cancellation => {
                let live = self.cancellations.get(action.key)
                    .map_or(false, |entry| entry.generation == action.generation);
                if live {
                    let entry = self.cancellations.remove(action.key);
                    entry.routine.execute(self);
                }
            },
        }
    }

    /// Run the loop until all work is done.
    ///
    /// Each iteration: drain requested lifecycle interests, dispatch all
    /// expired timers, perform one ready callback, then poll for I/O.
    /// The poll is non-blocking while more ready callbacks are queued,
    /// otherwise it blocks until the next timer deadline or, with no
    /// timers, indefinitely. Returns when the ready and timer queues are
    /// empty and the poll adapter has no registrations.
    ///
    /// An error is returned only for an unrecoverable poll failure; an
    /// interrupted wait is serviced as an empty one so signal requests
    /// are observed.
    pub fn start(&mut self) -> io::Result<()> {
        loop {
            // Told to stop: fire the shutdown events. Handlers adding
            // more stop handlers during the drain get flagged, not run.
            if signals::stop_requested() && !self.interests.is_empty(Lifecycle::Stop) {
                info!("running stop handlers");
                if self.drain_interest(Lifecycle::Stop) {
                    error!("stop handlers registered new stop handlers");
                }
                info!("stop handlers have run");
            }

            // Told to reload: fire the reload events, then accept reload
            // requests again.
            if signals::reload_requested() && !self.interests.is_empty(Lifecycle::Reload) {
                info!("running reload handlers");
                let _ = self.drain_interest(Lifecycle::Reload);
                signals::rearm_reload();
                info!("reload handlers have run");
            }

            // Time-triggered events whose time has come.
            while self.timers.ready() {
                if let Some(callback) = self.timers.pop_ready() {
                    callback.execute(self);
                }
            }

            // One pending callback.
            if let Some(callback) = self.ready.pop() {
                callback.execute(self);
            }

            // With more callbacks pending there is little point in
            // polling: anything readiness schedules lands behind them
            // anyway. Taking the whole queue, draining it with an eye on
            // the clock and only then polling would serve I/O sooner,
            // but the queue might never empty, so user work keeps
            // priority and the poll stays non-blocking.
            if !self.ready.is_empty() {
                self.poller.poll(&mut self.ready)?;
                continue;
            }

            // No pending callbacks, no timers ticking, nothing polled:
            // all done.
            if self.timers.is_empty() && self.poller.idle() {
                break;
            }

            // Block for I/O until the next timer is due; with no timers,
            // indefinitely.
            self.poller.wait(self.timers.interval(), &mut self.ready)?;
        }
        Ok(())
    }

    /// Request the loop to stop.
    ///
    /// Restores the default disposition of the stop signal, so a second
    /// interrupt terminates the process, and sets the stop flag. The loop
    /// drains stop interests on its next iteration. Callable from
    /// ordinary code and, via the trapped signal, from a handler.
    pub fn stop(&mut self) {
        info!("stopping event system");
        signals::request_stop();
    }

    /// Request a reload.
    ///
    /// Ignores further reload signals until the drain completes, and sets
    /// the reload flag. The loop drains reload interests on its next
    /// iteration, clears the flag and re-arms the signal.
    pub fn reload(&mut self) {
        info!("reload requested");
        signals::request_reload();
    }

    /// Release the poll slot backing a fired registration; the scheduled
    /// readiness callback calls this just before running.
    pub(crate) fn complete_poll(&mut self, key: usize, generation: u64) {
        self.poller.complete(key, generation);
    }

    /// Execute every interest callback present when the drain starts,
    /// in registration order. Returns whether new callbacks were
    /// registered into the same queue while draining; those are left for
    /// a later drain.
    fn drain_interest(&mut self, lifecycle: Lifecycle) -> bool {
        let bound = self.interests.queue_mut(lifecycle).generation_bound();
        while let Some(callback) = self.interests.queue_mut(lifecycle).pop_before(bound) {
            callback.execute(self);
        }
        !self.interests.is_empty(lifecycle)
    }
}

impl Default for Runtime {
    fn default() -> Runtime {
        Runtime::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("ready", &self.ready)
            .field("timers", &self.timers)
            .field("interests", &self.interests)
            .field("poller", &self.poller)
            .field("cancellations", &self.cancellations.len())
            .finish()
    }
}
