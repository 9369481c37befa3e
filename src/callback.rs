//! One-shot callback invocables.
//!
//! Callbacks come in two flavours: [`Callback`] takes no parameter and
//! [`EventCallback`] carries an [`Event`] parameter slot that must be
//! armed before execution. Both are consumed by execution, which gives
//! the at-most-once guarantee by construction: once a callback has run
//! there is nothing left to run again.

use std::fmt;

use crate::event::Event;
use crate::runtime::Runtime;

/// A one-shot invocable without a parameter.
///
/// Executing a callback consumes it; the queues hand a callback to the
/// loop only after removing it from their own storage, so no callback can
/// be reached twice.
pub(crate) struct Callback(Box<dyn FnOnce(&mut Runtime)>);

impl Callback {
    pub(crate) fn new<F>(f: F) -> Callback
        where F: FnOnce(&mut Runtime) + 'static,
    {
        Callback(Box::new(f))
    }

    /// Run the callback, consuming it.
    pub(crate) fn execute(self, runtime: &mut Runtime) {
        (self.0)(runtime)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad("Callback")
    }
}

/// A one-shot invocable carrying an [`Event`] parameter slot.
///
/// The slot starts empty and is armed with [`param`] by whichever site
/// completes the operation, the poll adapter being the main one. Executing
/// with an empty slot is a programmer error.
///
/// [`param`]: EventCallback::param
pub(crate) struct EventCallback {
    f: Box<dyn FnOnce(&mut Runtime, Event)>,
    param: Option<Event>,
}

impl EventCallback {
    pub(crate) fn new<F>(f: F) -> EventCallback
        where F: FnOnce(&mut Runtime, Event) + 'static,
    {
        EventCallback {
            f: Box::new(f),
            param: None,
        }
    }

    /// Arm the parameter slot with the event the next execution will
    /// observe. Arming twice overwrites; the last event wins.
    pub(crate) fn param(&mut self, event: Event) {
        self.param = Some(event);
    }

    /// Run the callback with its armed parameter, consuming both.
    pub(crate) fn execute(self, runtime: &mut Runtime) {
        debug_assert!(self.param.is_some(), "executing an event callback without a parameter");
        let event = self.param.unwrap_or(Event::Done(Vec::new()));
        (self.f)(runtime, event)
    }
}

impl fmt::Debug for EventCallback {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("EventCallback")
            .field("armed", &self.param.is_some())
            .finish()
    }
}

impl From<EventCallback> for Callback {
    /// An armed event callback is just a callback that already knows its
    /// parameter.
    fn from(callback: EventCallback) -> Callback {
        Callback::new(move |runtime| callback.execute(runtime))
    }
}
