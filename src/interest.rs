//! Lifecycle interest registry.
//!
//! Interests are named hooks into the runtime's lifecycle: callbacks
//! registered against [`Lifecycle::Stop`] or [`Lifecycle::Reload`] are
//! drained by the loop when the corresponding request flag is observed.
//! A drain is bounded to the entries present when it starts; handlers
//! registered during a drain wait for the next one.

use self::Lifecycle::{Reload, Stop};
use crate::ready::CallbackQueue;

/// A lifecycle hook name.
///
/// Used with [`Runtime::register_interest`] to be notified when the
/// runtime is asked to stop or reload.
///
/// [`Runtime::register_interest`]: crate::Runtime::register_interest
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Lifecycle {
    /// The runtime has been asked to shut down, via [`stop`] or the stop
    /// signal. Stop handlers run once; registering another stop handler
    /// from inside one is misuse and is reported by the loop.
    ///
    /// [`stop`]: crate::Runtime::stop
    Stop,
    /// The runtime has been asked to reload, via [`reload`] or the reload
    /// signal. Handlers registered while reload handlers run are picked
    /// up by the next reload request.
    ///
    /// [`reload`]: crate::Runtime::reload
    Reload,
}

/// The per-lifecycle callback queues.
#[derive(Debug)]
pub(crate) struct InterestRegistry {
    stop: CallbackQueue,
    reload: CallbackQueue,
}

impl InterestRegistry {
    pub(crate) fn new() -> InterestRegistry {
        InterestRegistry {
            stop: CallbackQueue::new(),
            reload: CallbackQueue::new(),
        }
    }

    pub(crate) fn queue_mut(&mut self, lifecycle: Lifecycle) -> &mut CallbackQueue {
        match lifecycle {
            Stop => &mut self.stop,
            Reload => &mut self.reload,
        }
    }

    pub(crate) fn is_empty(&self, lifecycle: Lifecycle) -> bool {
        match lifecycle {
            Stop => self.stop.is_empty(),
            Reload => self.reload.is_empty(),
        }
    }
}
