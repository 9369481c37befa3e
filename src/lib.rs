//! A single-threaded cooperative event runtime with cancellable
//! callbacks and lightweight non-blocking I/O.
//!
//! # Goals
//!
//! * One loop servicing every work source: lifecycle events, timers,
//!   scheduled callbacks and fd readiness, in that order.
//! * Every asynchronous submission returns an [`Action`] with
//!   well-defined, idempotent cancellation.
//! * Cooperative and predictable: callbacks run to completion on the
//!   loop thread, in FIFO order per queue, and nothing blocks except the
//!   poll adapter's wait.
//!
//! # Usage
//!
//! Create a [`Runtime`], submit work, then call [`Runtime::start`]. The
//! loop returns once every queue is empty and no fd registrations
//! remain. Callbacks receive `&mut Runtime` and may submit more work or
//! cancel outstanding actions.
//!
//! # Termination and lifecycle
//!
//! `SIGINT` requests stop and `SIGHUP` requests reload; both may also be
//! requested programmatically with [`Runtime::stop`] and
//! [`Runtime::reload`]. Callbacks registered with
//! [`Runtime::register_interest`] run when the loop observes the
//! request. The runtime is single-threaded; none of its types are `Send`
//! or `Sync`.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use eddy::{Lifecycle, Runtime};
//!
//! let mut runtime = Runtime::new();
//!
//! // Lifecycle interests are drained when the matching request is
//! // observed by the loop.
//! let _interest = runtime.register_interest(Lifecycle::Reload, |_| {
//!     println!("reloading configuration");
//! });
//! runtime.reload();
//!
//! // Work is submitted as one-shot callbacks; every submission returns
//! // a cancellable action.
//! let timer = runtime.timeout(Duration::from_secs(60), |_| {
//!     unreachable!("cancelled before it could fire");
//! });
//! let _scheduled = runtime.schedule(move |runtime| {
//!     // Callbacks receive the runtime and may cancel other work.
//!     runtime.cancel(timer);
//! });
//!
//! runtime.start().unwrap();
//! ```

#![warn(anonymous_parameters,
        bare_trait_objects,
        missing_debug_implementations,
        missing_docs,
        trivial_casts,
        trivial_numeric_casts,
        unused_extern_crates,
        unused_import_braces,
        unused_qualifications,
        unused_results,
)]

// Disallow warnings when running tests.
#![cfg_attr(test, deny(warnings))]

// Disallow warnings in examples, we want to set a good example after all.
#![doc(test(attr(deny(warnings))))]

mod action;
mod callback;
mod event;
mod interest;
mod poll;
mod ready;
mod runtime;
mod signals;
mod sys;
mod timers;

#[cfg(unix)]
pub mod unix {
    //! Unix only extensions.

    pub use crate::sys::pipe::{new_pipe, Receiver, Sender};
}

pub use crate::action::Action;
pub use crate::event::Event;
pub use crate::interest::Lifecycle;
pub use crate::poll::Interest;
pub use crate::runtime::Runtime;
